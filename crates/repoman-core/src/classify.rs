use crate::command::RunError;
use crate::error::{GitError, Hint};

const SSH_AUTH: &[&str] = &[
    "Permission denied, please try again",
    "Permission denied (publickey)",
    "publickey",
];
const HTTP_AUTH: &[&str] = &[
    "Authentication failed",
    "returned error: 401",
    "returned error: 403",
    "HTTP 401",
    "HTTP 403",
    "Logon failed",
];
const UNREACHABLE: &[&str] = &["Connection refused", "Connection timed out"];
const HOST_KEY: &[&str] = &["Host key verification failed"];
const REMOTE_MISSING: &[&str] = &["fatal: bad object", "fatal: remote error"];

/// Picks the first matching hint for a failed invocation. Cancelled and
/// timed-out runs are never classified.
pub fn classify(err: &RunError) -> Option<Hint> {
    let RunError::Exit { code, output } = err else {
        return None;
    };
    let has = |needles: &[&str]| needles.iter().any(|needle| output.contains(needle));

    if has(SSH_AUTH) || *code == Some(255) {
        Some(Hint::SshAuth)
    } else if has(HTTP_AUTH) {
        Some(Hint::HttpAuth)
    } else if has(UNREACHABLE) {
        Some(Hint::Unreachable)
    } else if has(HOST_KEY) {
        Some(Hint::HostKeyMismatch)
    } else if has(REMOTE_MISSING) {
        Some(Hint::RemoteNotFound)
    } else {
        None
    }
}

pub fn wrap(operation: &'static str, err: RunError) -> GitError {
    let hint = classify(&err);
    GitError::Command {
        operation,
        source: err,
        hint,
    }
}
