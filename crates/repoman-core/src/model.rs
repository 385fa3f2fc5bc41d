use crate::error::GitError;
use std::fmt;
use std::path::PathBuf;
use time::OffsetDateTime;

/// One unit of work for a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoDescriptor {
    pub name: String,
    pub remote_url: String,
    pub local_path: PathBuf,
    pub use_http: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalSummary {
    Clean,
    Modified(usize),
    Empty,
    Missing,
    Error(String),
}

impl fmt::Display for LocalSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalSummary::Clean => f.write_str("Clean"),
            LocalSummary::Modified(count) => write!(f, "{count} files modified"),
            LocalSummary::Empty => f.write_str("Empty repo."),
            LocalSummary::Missing => f.write_str("Missing"),
            LocalSummary::Error(message) => f.write_str(message),
        }
    }
}

/// Divergence of `HEAD` from its upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Synced,
    Ahead(u64),
    Behind(u64),
    Diverged { ahead: u64, behind: u64 },
    Unknown,
    /// No commits yet, so there is nothing to compare.
    NoHistory,
}

impl SyncState {
    pub fn from_counts(ahead: u64, behind: u64) -> Self {
        match (ahead, behind) {
            (0, 0) => SyncState::Synced,
            (0, behind) => SyncState::Behind(behind),
            (ahead, 0) => SyncState::Ahead(ahead),
            (ahead, behind) => SyncState::Diverged { ahead, behind },
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Synced => f.write_str("Synced"),
            SyncState::Ahead(ahead) => write!(f, "Ahead (+{ahead})"),
            SyncState::Behind(behind) => write!(f, "Behind (-{behind})"),
            SyncState::Diverged { ahead, behind } => write!(f, "Diverged (+{ahead}, -{behind})"),
            SyncState::Unknown => f.write_str("Unknown"),
            SyncState::NoHistory => f.write_str("-"),
        }
    }
}

#[derive(Debug)]
pub struct RepoStatus {
    pub name: String,
    pub branch: String,
    pub local: LocalSummary,
    pub sync_state: SyncState,
    /// Set when the pre-status fetch failed, so `sync_state` reflects old refs.
    pub stale: bool,
    pub last_commit: Option<OffsetDateTime>,
    pub error: Option<GitError>,
    pub fetch_error: Option<GitError>,
}

impl RepoStatus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            branch: String::new(),
            local: LocalSummary::Missing,
            sync_state: SyncState::Unknown,
            stale: false,
            last_commit: None,
            error: None,
            fetch_error: None,
        }
    }

    pub fn sync_label(&self) -> String {
        if self.stale {
            format!("{} (Stale)", self.sync_state)
        } else {
            self.sync_state.to_string()
        }
    }
}

/// Result of one sync item; `NotAttempted` marks items skipped after cancellation.
#[derive(Debug)]
pub enum SyncOutcome {
    Synced,
    Failed(GitError),
    NotAttempted,
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Synced)
    }

    pub fn error(&self) -> Option<&GitError> {
        match self {
            SyncOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<Option<Result<(), GitError>>> for SyncOutcome {
    fn from(slot: Option<Result<(), GitError>>) -> Self {
        match slot {
            Some(Ok(())) => SyncOutcome::Synced,
            Some(Err(err)) => SyncOutcome::Failed(err),
            None => SyncOutcome::NotAttempted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_state_labels() {
        assert_eq!(SyncState::from_counts(0, 0).to_string(), "Synced");
        assert_eq!(SyncState::from_counts(2, 0).to_string(), "Ahead (+2)");
        assert_eq!(SyncState::from_counts(0, 3).to_string(), "Behind (-3)");
        assert_eq!(SyncState::from_counts(1, 4).to_string(), "Diverged (+1, -4)");
        assert_eq!(SyncState::NoHistory.to_string(), "-");
    }

    #[test]
    fn stale_suffix_is_applied_to_label() {
        let mut status = RepoStatus::new("alice");
        status.sync_state = SyncState::Behind(1);
        assert_eq!(status.sync_label(), "Behind (-1)");
        status.stale = true;
        assert_eq!(status.sync_label(), "Behind (-1) (Stale)");
    }

    #[test]
    fn local_summary_labels() {
        assert_eq!(LocalSummary::Modified(3).to_string(), "3 files modified");
        assert_eq!(LocalSummary::Empty.to_string(), "Empty repo.");
        assert_eq!(LocalSummary::Missing.to_string(), "Missing");
    }
}
