use anyhow::Context;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://crm.unsatisfiable.net";
pub const DEFAULT_CONCURRENCY: usize = 5;
pub const WORKSPACE_FILE: &str = ".repoman.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitSettings {
    pub program: String,
    pub clone_timeout_secs: u64,
    pub pull_timeout_secs: u64,
    pub ssh_connect_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
            clone_timeout_secs: 300,
            pull_timeout_secs: 120,
            ssh_connect_timeout_secs: 10,
            poll_interval_ms: 25,
        }
    }
}

impl GitSettings {
    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_secs)
    }

    pub fn pull_timeout(&self) -> Duration {
        Duration::from_secs(self.pull_timeout_secs)
    }

    pub fn ssh_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.ssh_connect_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub git: GitSettings,
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path).context("read config")?;
        let config = serde_json::from_str(&data).context("parse config")?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("create config directory")?;
        }
        let data = serde_json::to_string_pretty(self).context("serialize config")?;
        write_private(path, &data).context("write config")?;
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn concurrency(&self) -> usize {
        match self.concurrency {
            Some(value) if value > 0 => value,
            _ => DEFAULT_CONCURRENCY,
        }
    }
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let project = ProjectDirs::from("net", "unsatisfiable", "repoman")
        .context("resolve project dirs")?;
    Ok(project.config_dir().join("config.json"))
}

/// Course/assignment binding stored at the root of a workspace directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    pub course_id: String,
    #[serde(default)]
    pub course_name: String,
    pub assignment_id: String,
    #[serde(default)]
    pub assignment_name: String,
}

impl WorkspaceConfig {
    pub fn load(root: &Path) -> anyhow::Result<Self> {
        let path = root.join(WORKSPACE_FILE);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("read workspace config {}", path.display()))?;
        serde_json::from_str(&data).context("parse workspace config")
    }

    pub fn save(&self, root: &Path) -> anyhow::Result<()> {
        let data = serde_json::to_string_pretty(self).context("serialize workspace config")?;
        write_private(&root.join(WORKSPACE_FILE), &data).context("write workspace config")
    }
}

/// Nearest directory at or above `start` holding a workspace file.
pub fn find_workspace_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(WORKSPACE_FILE).is_file())
        .map(Path::to_path_buf)
}

fn write_private(path: &Path, data: &str) -> std::io::Result<()> {
    fs::write(path, data)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}
