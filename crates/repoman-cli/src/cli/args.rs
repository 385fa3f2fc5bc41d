use super::*;

#[derive(Parser)]
#[command(
    name = "repoman",
    version,
    about = "Clone, update and inspect the student repositories of an assignment"
)]
pub(super) struct Cli {
    #[arg(long, short, global = true, help = "Log debug output to stderr")]
    pub(super) verbose: bool,
    #[arg(long, global = true, help = "Path to config.json")]
    pub(super) config: Option<PathBuf>,
    #[command(subcommand)]
    pub(super) command: Commands,
}

#[derive(clap::Subcommand)]
pub(super) enum Commands {
    #[command(about = "Store the API key for the course management service")]
    Auth(AuthArgs),
    #[command(about = "Bind the current directory to a course assignment")]
    Init(InitArgs),
    #[command(about = "Clone missing repositories and pull existing ones")]
    Sync(SyncArgs),
    #[command(about = "Show branch, local changes and divergence of every repository")]
    Status(StatusArgs),
}

impl Commands {
    pub(super) fn label(&self) -> &'static str {
        match self {
            Commands::Auth(_) => "auth",
            Commands::Init(_) => "init",
            Commands::Sync(_) => "sync",
            Commands::Status(_) => "status",
        }
    }
}

#[derive(Parser)]
pub(super) struct AuthArgs {
    #[arg(long)]
    pub(super) api_key: String,
    #[arg(long)]
    pub(super) base_url: Option<String>,
}

#[derive(Parser)]
pub(super) struct InitArgs {
    #[arg(long)]
    pub(super) course_id: String,
    #[arg(long)]
    pub(super) assignment_id: String,
    #[arg(long, help = "Overwrite or nest inside an existing workspace")]
    pub(super) force: bool,
}

#[derive(Parser)]
pub(super) struct SyncArgs {
    #[arg(long, help = "Use HTTPS remotes instead of SSH")]
    pub(super) http: bool,
    #[arg(long, short, help = "Number of repositories processed at once")]
    pub(super) jobs: Option<usize>,
}

#[derive(Parser)]
pub(super) struct StatusArgs {
    #[arg(long, help = "Skip fetching remotes before comparing")]
    pub(super) no_fetch: bool,
    #[arg(long, short, help = "Number of repositories processed at once")]
    pub(super) jobs: Option<usize>,
}
