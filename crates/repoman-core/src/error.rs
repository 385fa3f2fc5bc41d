use crate::command::RunError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Actionable guidance attached to a failed git invocation.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Hint {
    SshAuth,
    HttpAuth,
    Unreachable,
    HostKeyMismatch,
    RemoteNotFound,
}

impl Hint {
    pub fn message(&self) -> &'static str {
        match self {
            Hint::SshAuth => {
                "SSH authentication failed. Ensure your SSH key is added to ssh-agent (ssh-add) and your public key is registered with the remote server."
            }
            Hint::HttpAuth => {
                "HTTP authentication failed. Configure a Git credential helper or check your credentials."
            }
            Hint::Unreachable => {
                "Connection refused/timed out. The remote server may be down or unreachable."
            }
            Hint::HostKeyMismatch => {
                "SSH host key verification failed. This is a security issue - investigate before proceeding."
            }
            Hint::RemoteNotFound => {
                "Remote error - the repository may not exist or you may not have access."
            }
        }
    }
}

impl fmt::Display for Hint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Error)]
pub enum GitError {
    #[error("path {} exists but is not a directory", .path.display())]
    NotADirectory { path: PathBuf },
    #[error("path {} exists but is not a git repository", .path.display())]
    NotARepository { path: PathBuf },
    #[error("cannot inspect {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    InvalidUrl(String),
    #[error("repository is empty")]
    EmptyRepository,
    #[error("{operation} failed: {source}{}", hint_suffix(.hint))]
    Command {
        operation: &'static str,
        #[source]
        source: RunError,
        hint: Option<Hint>,
    },
    #[error("no upstream configured for branch {branch}")]
    NoUpstream { branch: String },
    #[error("failed to parse {what} from {output:?}")]
    Parse { what: &'static str, output: String },
}

impl GitError {
    pub fn hint(&self) -> Option<Hint> {
        match self {
            GitError::Command { hint, .. } => *hint,
            _ => None,
        }
    }

    /// Configuration errors describe local path state and are never worth retrying.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            GitError::NotADirectory { .. } | GitError::NotARepository { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            GitError::Command {
                source: RunError::Cancelled { .. } | RunError::TimedOut { .. },
                ..
            }
        )
    }

    /// Combined output of the failed command, when there was one.
    pub fn output(&self) -> Option<&str> {
        match self {
            GitError::Command { source, .. } => source.output(),
            _ => None,
        }
    }
}

fn hint_suffix(hint: &Option<Hint>) -> String {
    match hint {
        Some(hint) => format!("\n  hint: {hint}"),
        None => String::new(),
    }
}
