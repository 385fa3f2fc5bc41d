use crate::logging;
use anyhow::{Context, bail};
use clap::Parser;
use repoman_catalog::auth::{KeyringStore, resolve_api_key, save_api_key};
use repoman_catalog::{Catalog, HttpCatalog, descriptors};
use repoman_core::cancel::CancelToken;
use repoman_core::config::{
    AppConfig, WorkspaceConfig, default_config_path, find_workspace_root,
};
use repoman_core::git_ops::RepoOps;
use repoman_core::manager::Manager;
use repoman_core::model::{RepoStatus, SyncOutcome};
use repoman_core::progress::ProgressEvent;
use std::path::{Path, PathBuf};
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, info};

mod args;
mod auth_cmd;
mod init_cmd;
mod shared;
mod status_cmd;
mod sync_cmd;

use args::*;

use auth_cmd::handle_auth;
use init_cmd::handle_init;
use status_cmd::handle_status;
use sync_cmd::handle_sync;

pub async fn run(offset: UtcOffset) -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    info!(command = cli.command.label(), "running command");

    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("load config {}", config_path.display()))?;

    match cli.command {
        Commands::Auth(args) => handle_auth(args, config, &config_path),
        Commands::Init(args) => handle_init(args, &config).await,
        Commands::Sync(args) => handle_sync(args, &config).await,
        Commands::Status(args) => handle_status(args, &config, offset).await,
    }
}
