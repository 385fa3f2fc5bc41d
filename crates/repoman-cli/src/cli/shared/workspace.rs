use super::*;

pub(in crate::cli) struct Workspace {
    pub(in crate::cli) root: PathBuf,
    pub(in crate::cli) config: WorkspaceConfig,
}

/// Workspace enclosing the current directory.
pub(in crate::cli) fn open_workspace() -> anyhow::Result<Workspace> {
    let cwd = std::env::current_dir().context("resolve current directory")?;
    let Some(root) = find_workspace_root(&cwd) else {
        bail!("no workspace found; run 'repoman init' first");
    };
    let config = WorkspaceConfig::load(&root)?;
    debug!(root = %root.display(), assignment = %config.assignment_id, "opened workspace");
    Ok(Workspace { root, config })
}

pub(in crate::cli) fn open_catalog(config: &AppConfig) -> anyhow::Result<HttpCatalog> {
    let api_key = resolve_api_key(&KeyringStore, config)?;
    HttpCatalog::new(config.base_url(), &api_key)
}

pub(in crate::cli) fn build_manager(config: &AppConfig, jobs: Option<usize>) -> Manager {
    let concurrency = jobs.unwrap_or_else(|| config.concurrency());
    let manager = Manager::new(concurrency, RepoOps::new(config.git.clone()));
    debug!(workers = manager.concurrency(), "batch manager ready");
    manager
}
