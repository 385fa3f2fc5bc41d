use crate::cancel::CancelToken;
use crate::command::{GitExecutor, HostKeyPolicy, RunError};
use git2::{Commit, Oid, Repository, Signature};
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = dyn Fn(&[String]) -> Result<String, RunError> + Send + Sync;

/// Scripted executor that records every invocation and the peak number of
/// concurrent calls.
pub(crate) struct FakeGit {
    respond: Box<Responder>,
    delay: Duration,
    calls: Mutex<Vec<(HostKeyPolicy, Vec<String>)>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeGit {
    pub(crate) fn new<F>(respond: F) -> Arc<Self>
    where
        F: Fn(&[String]) -> Result<String, RunError> + Send + Sync + 'static,
    {
        Self::with_delay(Duration::ZERO, respond)
    }

    pub(crate) fn ok() -> Arc<Self> {
        Self::new(|_| Ok(String::new()))
    }

    pub(crate) fn with_delay<F>(delay: Duration, respond: F) -> Arc<Self>
    where
        F: Fn(&[String]) -> Result<String, RunError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            respond: Box::new(respond),
            delay,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, args)| args.clone())
            .collect()
    }

    pub(crate) fn policies(&self) -> Vec<HostKeyPolicy> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(policy, _)| *policy)
            .collect()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl GitExecutor for FakeGit {
    fn run(
        &self,
        cancel: &CancelToken,
        policy: HostKeyPolicy,
        args: &[OsString],
    ) -> Result<String, RunError> {
        if cancel.is_cancelled() {
            return Err(RunError::Cancelled {
                output: String::new(),
            });
        }
        let args: Vec<String> = args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        self.calls.lock().unwrap().push((policy, args.clone()));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let result = (self.respond)(&args);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

pub(crate) fn commit_file(
    repo: &Repository,
    name: &str,
    contents: &str,
    parents: &[&Commit<'_>],
) -> Oid {
    let workdir = repo.workdir().unwrap();
    std::fs::write(workdir.join(name), contents).unwrap();
    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let sig = Signature::now("tester", "tester@example.com").unwrap();
    repo.commit(Some("HEAD"), &sig, &sig, "commit", &tree, parents)
        .unwrap()
}

pub(crate) fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}
