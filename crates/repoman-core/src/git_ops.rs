use crate::cancel::CancelToken;
use crate::classify::wrap;
use crate::command::{GitExecutor, HostKeyPolicy, RunError, SystemGit, args_in};
use crate::config::GitSettings;
use crate::error::GitError;
use crate::model::{LocalSummary, SyncState};
use crate::url::{to_http, to_ssh, validate_url};
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, instrument};

pub const UNKNOWN_BRANCH: &str = "Unknown";

/// Repository operations on top of a [`GitExecutor`].
///
/// Every call takes the caller's [`CancelToken`] and adds its own default
/// deadline beneath it: `clone_timeout` for clones, `pull_timeout` for
/// everything else.
#[derive(Clone)]
pub struct RepoOps {
    git: Arc<dyn GitExecutor>,
    settings: GitSettings,
}

impl RepoOps {
    pub fn new(settings: GitSettings) -> Self {
        let git = Arc::new(SystemGit::new(&settings));
        Self { git, settings }
    }

    pub fn with_executor(settings: GitSettings, git: Arc<dyn GitExecutor>) -> Self {
        Self { git, settings }
    }

    fn run_in(
        &self,
        path: &Path,
        cancel: &CancelToken,
        args: &[&str],
    ) -> Result<String, RunError> {
        let cancel = cancel.child_with_timeout(self.settings.pull_timeout());
        self.git
            .run(&cancel, HostKeyPolicy::Strict, &args_in(path, args))
    }

    /// Clones into `path` when it is absent, otherwise pulls the existing
    /// repository.
    #[instrument(skip(self, path, cancel), fields(path = %path.display()))]
    pub fn ensure_present_and_current(
        &self,
        url: &str,
        path: &Path,
        use_http: bool,
        cancel: &CancelToken,
    ) -> Result<(), GitError> {
        match fs::metadata(path) {
            Ok(meta) => {
                if !meta.is_dir() {
                    return Err(GitError::NotADirectory {
                        path: path.to_path_buf(),
                    });
                }
                if fs::metadata(path.join(".git")).is_err() {
                    return Err(GitError::NotARepository {
                        path: path.to_path_buf(),
                    });
                }
                self.pull(path, cancel)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                self.clone_repo(url, path, use_http, cancel)
            }
            Err(source) => Err(GitError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn clone_repo(
        &self,
        url: &str,
        path: &Path,
        use_http: bool,
        cancel: &CancelToken,
    ) -> Result<(), GitError> {
        let url = normalize(url, use_http);
        validate_url(&url).map_err(GitError::InvalidUrl)?;
        debug!(url = %url, "cloning");

        let args = [
            OsString::from("clone"),
            OsString::from("--"),
            OsString::from(&url),
            path.as_os_str().to_os_string(),
        ];
        let cancel = cancel.child_with_timeout(self.settings.clone_timeout());
        self.git
            .run(&cancel, HostKeyPolicy::AcceptNew, &args)
            .map(|_| ())
            .map_err(|err| wrap("git clone", err))
    }

    pub fn pull(&self, path: &Path, cancel: &CancelToken) -> Result<(), GitError> {
        match self.run_in(path, cancel, &["pull"]) {
            Ok(_) => Ok(()),
            Err(err) => {
                if let Ok(0) = self.commit_count(path, cancel) {
                    return Err(GitError::EmptyRepository);
                }
                Err(wrap("git pull", err))
            }
        }
    }

    pub fn fetch(&self, path: &Path, cancel: &CancelToken) -> Result<(), GitError> {
        self.run_in(path, cancel, &["fetch"])
            .map(|_| ())
            .map_err(|err| wrap("git fetch", err))
    }

    /// Current branch name, or [`UNKNOWN_BRANCH`]. Works before the first commit.
    pub fn branch(&self, path: &Path, cancel: &CancelToken) -> String {
        let lookups: [&[&str]; 2] = [
            &["symbolic-ref", "--short", "HEAD"],
            &["rev-parse", "--abbrev-ref", "HEAD"],
        ];
        lookups
            .iter()
            .find_map(|args| {
                self.run_in(path, cancel, args)
                    .ok()
                    .map(|out| out.trim().to_string())
                    .filter(|name| !name.is_empty())
            })
            .unwrap_or_else(|| UNKNOWN_BRANCH.to_string())
    }

    pub fn commit_count(&self, path: &Path, cancel: &CancelToken) -> Result<u64, GitError> {
        let out = self
            .run_in(path, cancel, &["rev-list", "--all", "--count"])
            .map_err(|err| wrap("git rev-list", err))?;
        out.trim().parse().map_err(|_| GitError::Parse {
            what: "commit count",
            output: out,
        })
    }

    pub fn status_summary(
        &self,
        path: &Path,
        cancel: &CancelToken,
    ) -> Result<LocalSummary, GitError> {
        if self.commit_count(path, cancel)? == 0 {
            return Ok(LocalSummary::Empty);
        }
        let out = self
            .run_in(path, cancel, &["status", "--short"])
            .map_err(|err| wrap("git status", err))?;
        let modified = out.lines().filter(|line| !line.trim().is_empty()).count();
        if modified == 0 {
            Ok(LocalSummary::Clean)
        } else {
            Ok(LocalSummary::Modified(modified))
        }
    }

    pub fn sync_state(&self, path: &Path, cancel: &CancelToken) -> Result<SyncState, GitError> {
        if self.commit_count(path, cancel)? == 0 {
            return Ok(SyncState::NoHistory);
        }
        let out = match self.run_in(
            path,
            cancel,
            &["rev-list", "--left-right", "--count", "HEAD...@{u}"],
        ) {
            Ok(out) => out,
            Err(err) => {
                if let Some(branch) = err.output().and_then(missing_upstream_branch) {
                    return Err(GitError::NoUpstream { branch });
                }
                return Err(wrap("git rev-list", err));
            }
        };
        parse_left_right(&out)
            .map(|(ahead, behind)| SyncState::from_counts(ahead, behind))
            .ok_or(GitError::Parse {
                what: "ahead/behind counts",
                output: out,
            })
    }

    /// Newest commit time across all refs; `None` for a repository without commits.
    pub fn last_commit_time(
        &self,
        path: &Path,
        cancel: &CancelToken,
    ) -> Result<Option<OffsetDateTime>, GitError> {
        let out = match self.run_in(path, cancel, &["log", "-1", "--format=%at", "--all"]) {
            Ok(out) => out,
            Err(err) => {
                if let Ok(0) = self.commit_count(path, cancel) {
                    return Ok(None);
                }
                return Err(wrap("git log", err));
            }
        };
        let raw = out.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse::<i64>()
            .ok()
            .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
            .map(Some)
            .ok_or_else(|| GitError::Parse {
                what: "commit time",
                output: out.clone(),
            })
    }
}

fn normalize(url: &str, use_http: bool) -> String {
    if use_http { to_http(url) } else { to_ssh(url) }
}

fn parse_left_right(out: &str) -> Option<(u64, u64)> {
    let mut fields = out.split_whitespace();
    let ahead = fields.next()?.parse().ok()?;
    let behind = fields.next()?.parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some((ahead, behind))
}

/// Branch named in git's `no upstream configured for branch 'x'` message.
fn missing_upstream_branch(output: &str) -> Option<String> {
    let line = output
        .lines()
        .find(|line| line.contains("no upstream configured"))?;
    let branch = line.split('\'').nth(1).unwrap_or("HEAD");
    Some(branch.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Hint;
    use crate::testing::{FakeGit, commit_file, run_git};
    use tempfile::TempDir;

    fn fast_settings() -> GitSettings {
        GitSettings {
            poll_interval_ms: 5,
            ..GitSettings::default()
        }
    }

    fn fake_ops(fake: &Arc<FakeGit>) -> RepoOps {
        RepoOps::with_executor(fast_settings(), fake.clone())
    }

    #[test]
    fn parses_left_right_counts() {
        assert_eq!(parse_left_right("3\t1\n"), Some((3, 1)));
        assert_eq!(parse_left_right("0 0"), Some((0, 0)));
        assert_eq!(parse_left_right("3"), None);
        assert_eq!(parse_left_right("a b"), None);
        assert_eq!(parse_left_right("1 2 3"), None);
    }

    #[test]
    fn extracts_branch_from_missing_upstream_message() {
        let output = "fatal: no upstream configured for branch 'feature'\n";
        assert_eq!(missing_upstream_branch(output).as_deref(), Some("feature"));
        assert_eq!(missing_upstream_branch("fatal: bad revision"), None);
    }

    #[test]
    fn existing_file_is_a_configuration_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("alice");
        fs::write(&path, "not a repo").unwrap();
        let fake = FakeGit::ok();
        let err = fake_ops(&fake)
            .ensure_present_and_current("git@h:a/alice.git", &path, false, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, GitError::NotADirectory { .. }));
        assert_eq!(fake.call_count(), 0);
    }

    #[test]
    fn directory_without_metadata_is_a_configuration_error() {
        let tmp = TempDir::new().unwrap();
        let fake = FakeGit::ok();
        let err = fake_ops(&fake)
            .ensure_present_and_current("git@h:a/r.git", tmp.path(), false, &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, GitError::NotARepository { .. }));
        assert!(err.is_configuration());
        assert_eq!(fake.call_count(), 0);
    }

    #[test]
    fn clone_normalizes_url_and_accepts_new_host_keys() {
        let tmp = TempDir::new().unwrap();
        let fake = FakeGit::ok();
        let ops = fake_ops(&fake);
        let dest = tmp.path().join("bob");

        ops.ensure_present_and_current(
            "https://github.com/course/bob",
            &dest,
            false,
            &CancelToken::new(),
        )
        .unwrap();
        ops.clone_repo("git@github.com:course/carol.git", &dest, true, &CancelToken::new())
            .unwrap();

        let calls = fake.calls();
        assert_eq!(calls[0][2], "git@github.com:course/bob.git");
        assert_eq!(calls[1][2], "https://github.com/course/carol");
        assert_eq!(
            fake.policies(),
            vec![HostKeyPolicy::AcceptNew, HostKeyPolicy::AcceptNew]
        );
    }

    #[test]
    fn clone_rejects_hazardous_urls_without_running_git() {
        let fake = FakeGit::ok();
        let err = fake_ops(&fake)
            .clone_repo(
                "--upload-pack=touch /tmp/x",
                Path::new("x"),
                false,
                &CancelToken::new(),
            )
            .unwrap_err();
        assert!(matches!(err, GitError::InvalidUrl(_)));
        assert_eq!(fake.call_count(), 0);
    }

    #[test]
    fn failed_clone_carries_hint() {
        let fake = FakeGit::new(|_| {
            Err(RunError::Exit {
                code: Some(128),
                output: "git@github.com: Permission denied (publickey).".to_string(),
            })
        });
        let err = fake_ops(&fake)
            .clone_repo("git@github.com:c/r.git", Path::new("r"), false, &CancelToken::new())
            .unwrap_err();
        assert_eq!(err.hint(), Some(Hint::SshAuth));
        assert!(err.to_string().starts_with("git clone failed"));
    }

    #[test]
    fn pull_on_empty_history_is_reported_plainly() {
        let fake = FakeGit::new(|args| match args[2].as_str() {
            "pull" => Err(RunError::Exit {
                code: Some(1),
                output: "fatal: couldn't find remote ref refs/heads/main".to_string(),
            }),
            "rev-list" => Ok("0\n".to_string()),
            other => panic!("unexpected git {other}"),
        });
        let err = fake_ops(&fake)
            .pull(Path::new("empty"), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, GitError::EmptyRepository));
        assert_eq!(err.to_string(), "repository is empty");
    }

    #[test]
    fn pull_and_fetch_use_strict_host_keys() {
        let fake = FakeGit::ok();
        let ops = fake_ops(&fake);
        ops.pull(Path::new("a"), &CancelToken::new()).unwrap();
        ops.fetch(Path::new("a"), &CancelToken::new()).unwrap();
        assert_eq!(
            fake.policies(),
            vec![HostKeyPolicy::Strict, HostKeyPolicy::Strict]
        );
    }

    #[test]
    fn branch_falls_back_then_gives_up() {
        let detached = FakeGit::new(|args| match args[2].as_str() {
            "symbolic-ref" => Err(RunError::Exit {
                code: Some(128),
                output: "fatal: ref HEAD is not a symbolic ref".to_string(),
            }),
            _ => Ok("HEAD\n".to_string()),
        });
        assert_eq!(
            fake_ops(&detached).branch(Path::new("a"), &CancelToken::new()),
            "HEAD"
        );

        let broken = FakeGit::new(|_| {
            Err(RunError::Exit {
                code: Some(128),
                output: "fatal: not a git repository".to_string(),
            })
        });
        assert_eq!(
            fake_ops(&broken).branch(Path::new("a"), &CancelToken::new()),
            UNKNOWN_BRANCH
        );
    }

    #[test]
    fn malformed_commit_count_is_an_error() {
        let fake = FakeGit::new(|_| Ok("lots\n".to_string()));
        let err = fake_ops(&fake)
            .commit_count(Path::new("a"), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, GitError::Parse { .. }));
    }

    #[test]
    fn missing_upstream_is_distinct_from_query_failure() {
        let fake = FakeGit::new(|args| match args[3].as_str() {
            "--all" => Ok("4\n".to_string()),
            _ => Err(RunError::Exit {
                code: Some(128),
                output: "fatal: no upstream configured for branch 'main'\n".to_string(),
            }),
        });
        let err = fake_ops(&fake)
            .sync_state(Path::new("a"), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, GitError::NoUpstream { ref branch } if branch == "main"));
    }

    #[test]
    fn sync_state_and_summary_parse_plumbing_output() {
        let fake = FakeGit::new(|args| match (args[2].as_str(), args[3].as_str()) {
            ("rev-list", "--all") => Ok("12\n".to_string()),
            ("rev-list", "--left-right") => Ok("2\t5\n".to_string()),
            ("status", _) => Ok(" M src/main.rs\n?? notes.txt\n".to_string()),
            other => panic!("unexpected git {other:?}"),
        });
        let ops = fake_ops(&fake);
        let cancel = CancelToken::new();
        assert_eq!(
            ops.sync_state(Path::new("a"), &cancel).unwrap(),
            SyncState::Diverged { ahead: 2, behind: 5 }
        );
        assert_eq!(
            ops.status_summary(Path::new("a"), &cancel).unwrap(),
            LocalSummary::Modified(2)
        );
    }

    #[test]
    fn sync_then_pull_tracks_upstream() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let repo = git2::Repository::init(&src).unwrap();
        commit_file(&repo, "test.txt", "hello", &[]);

        let ops = RepoOps::new(fast_settings());
        let dest = tmp.path().join("dest");
        let url = src.to_string_lossy().into_owned();
        let cancel = CancelToken::new();

        ops.ensure_present_and_current(&url, &dest, false, &cancel)
            .unwrap();
        assert!(dest.join("test.txt").exists());

        let head = repo.head().unwrap().peel_to_commit().unwrap();
        commit_file(&repo, "test2.txt", "world", &[&head]);
        ops.ensure_present_and_current(&url, &dest, false, &cancel)
            .unwrap();
        assert!(dest.join("test2.txt").exists());

        assert_eq!(ops.commit_count(&dest, &cancel).unwrap(), 2);
        assert_eq!(ops.sync_state(&dest, &cancel).unwrap(), SyncState::Synced);
        assert_eq!(
            ops.status_summary(&dest, &cancel).unwrap(),
            LocalSummary::Clean
        );
        assert!(ops.last_commit_time(&dest, &cancel).unwrap().is_some());

        fs::write(dest.join("test.txt"), "changed").unwrap();
        assert_eq!(
            ops.status_summary(&dest, &cancel).unwrap(),
            LocalSummary::Modified(1)
        );
    }

    #[test]
    fn local_commit_shows_ahead() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let repo = git2::Repository::init(&src).unwrap();
        commit_file(&repo, "a.txt", "a", &[]);

        let ops = RepoOps::new(fast_settings());
        let dest = tmp.path().join("dest");
        let cancel = CancelToken::new();
        ops.clone_repo(&src.to_string_lossy(), &dest, false, &cancel)
            .unwrap();

        let clone = git2::Repository::open(&dest).unwrap();
        let head = clone.head().unwrap().peel_to_commit().unwrap();
        commit_file(&clone, "b.txt", "b", &[&head]);
        assert_eq!(ops.sync_state(&dest, &cancel).unwrap(), SyncState::Ahead(1));
    }

    #[test]
    fn empty_remote_clones_and_reports_no_history() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("empty");
        git2::Repository::init(&src).unwrap();

        let ops = RepoOps::new(fast_settings());
        let dest = tmp.path().join("dest");
        let cancel = CancelToken::new();
        ops.ensure_present_and_current(&src.to_string_lossy(), &dest, false, &cancel)
            .unwrap();

        assert_eq!(ops.commit_count(&dest, &cancel).unwrap(), 0);
        assert_eq!(
            ops.status_summary(&dest, &cancel).unwrap(),
            LocalSummary::Empty
        );
        assert_eq!(
            ops.sync_state(&dest, &cancel).unwrap(),
            SyncState::NoHistory
        );
        assert_eq!(ops.last_commit_time(&dest, &cancel).unwrap(), None);
        assert_ne!(ops.branch(&dest, &cancel), UNKNOWN_BRANCH);

        let err = ops
            .ensure_present_and_current(&src.to_string_lossy(), &dest, false, &cancel)
            .unwrap_err();
        assert!(matches!(err, GitError::EmptyRepository));
    }

    #[test]
    fn branch_matches_checked_out_branch() {
        let tmp = TempDir::new().unwrap();
        let repo = git2::Repository::init(tmp.path()).unwrap();
        let first = commit_file(&repo, "a.txt", "a", &[]);
        let commit = repo.find_commit(first).unwrap();
        repo.branch("feature", &commit, false).unwrap();
        run_git(tmp.path(), &["checkout", "-q", "feature"]);

        let ops = RepoOps::new(fast_settings());
        assert_eq!(ops.branch(tmp.path(), &CancelToken::new()), "feature");
    }
}
