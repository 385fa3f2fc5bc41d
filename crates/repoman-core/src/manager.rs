use crate::cancel::CancelToken;
use crate::config::DEFAULT_CONCURRENCY;
use crate::error::GitError;
use crate::git_ops::RepoOps;
use crate::model::{LocalSummary, RepoDescriptor, RepoStatus, SyncOutcome, SyncState};
use crate::progress::{ProgressEvent, ProgressObserver};
use std::collections::VecDeque;
use std::fs;
use std::io::ErrorKind;
use std::sync::{Mutex, mpsc};
use std::thread;
use tracing::debug;

/// Bounded worker pool running repository operations over a batch.
pub struct Manager {
    concurrency: usize,
    ops: RepoOps,
}

impl Manager {
    /// A zero `concurrency` falls back to [`DEFAULT_CONCURRENCY`].
    pub fn new(concurrency: usize, ops: RepoOps) -> Self {
        let concurrency = if concurrency == 0 {
            DEFAULT_CONCURRENCY
        } else {
            concurrency
        };
        Self { concurrency, ops }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn sync_all(
        &self,
        repos: &[RepoDescriptor],
        cancel: &CancelToken,
        progress: Option<&dyn ProgressObserver>,
    ) -> Vec<SyncOutcome> {
        let slots = self.run_batch(
            repos,
            cancel,
            progress,
            |cancel, repo| {
                self.ops.ensure_present_and_current(
                    &repo.remote_url,
                    &repo.local_path,
                    repo.use_http,
                    cancel,
                )
            },
            Result::is_ok,
        );
        slots.into_iter().map(SyncOutcome::from).collect()
    }

    /// `None` marks a repository never reached because `cancel` fired first.
    pub fn status_all(
        &self,
        repos: &[RepoDescriptor],
        fetch: bool,
        cancel: &CancelToken,
        progress: Option<&dyn ProgressObserver>,
    ) -> Vec<Option<RepoStatus>> {
        self.run_batch(
            repos,
            cancel,
            progress,
            |cancel, repo| collect_status(&self.ops, repo, fetch, cancel),
            |status| status.error.is_none(),
        )
    }

    /// Drains a closed queue of `(index, item)` pairs with a fixed set of
    /// workers. Each result lands at its input index; progress is reported
    /// from the collecting thread so observer calls never overlap.
    fn run_batch<R, W, S>(
        &self,
        repos: &[RepoDescriptor],
        cancel: &CancelToken,
        progress: Option<&dyn ProgressObserver>,
        work: W,
        succeeded: S,
    ) -> Vec<Option<R>>
    where
        R: Send,
        W: Fn(&CancelToken, &RepoDescriptor) -> R + Sync,
        S: Fn(&R) -> bool,
    {
        let mut results: Vec<Option<R>> = repos.iter().map(|_| None).collect();
        if repos.is_empty() {
            return results;
        }

        let queue: Mutex<VecDeque<(usize, &RepoDescriptor)>> =
            Mutex::new(repos.iter().enumerate().collect());
        let workers = self.concurrency.min(repos.len());
        debug!(workers, total = repos.len(), "starting batch");

        thread::scope(|scope| {
            let (tx, rx) = mpsc::channel::<(usize, R)>();
            for _ in 0..workers {
                let tx = tx.clone();
                let queue = &queue;
                let work = &work;
                scope.spawn(move || {
                    loop {
                        if cancel.is_cancelled() {
                            break;
                        }
                        let next = queue.lock().ok().and_then(|mut guard| guard.pop_front());
                        let Some((index, repo)) = next else {
                            break;
                        };
                        let result = work(cancel, repo);
                        if tx.send((index, result)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            let mut completed = 0;
            while let Ok((index, result)) = rx.recv() {
                completed += 1;
                if let Some(progress) = progress {
                    progress.on_complete(ProgressEvent {
                        index,
                        name: repos[index].name.clone(),
                        completed,
                        total: repos.len(),
                        success: succeeded(&result),
                    });
                }
                results[index] = Some(result);
            }
        });

        results
    }
}

fn collect_status(
    ops: &RepoOps,
    repo: &RepoDescriptor,
    fetch: bool,
    cancel: &CancelToken,
) -> RepoStatus {
    let mut status = RepoStatus::new(repo.name.clone());
    let path = repo.local_path.as_path();

    if matches!(fs::metadata(path), Err(err) if err.kind() == ErrorKind::NotFound) {
        status.local = LocalSummary::Missing;
        status.sync_state = SyncState::NoHistory;
        return status;
    }

    if fetch {
        status.fetch_error = ops.fetch(path, cancel).err();
    }

    status.branch = ops.branch(path, cancel);
    match ops.status_summary(path, cancel) {
        Ok(summary) => status.local = summary,
        Err(err) => {
            status.local = LocalSummary::Error(err.to_string());
            status.error = Some(err);
        }
    }

    match ops.sync_state(path, cancel) {
        Ok(state) => {
            status.sync_state = state;
            status.stale = status.fetch_error.is_some();
        }
        Err(err) => {
            status.sync_state = SyncState::Unknown;
            keep_first(&mut status.error, err);
        }
    }

    match ops.last_commit_time(path, cancel) {
        Ok(time) => status.last_commit = time,
        Err(err) => keep_first(&mut status.error, err),
    }

    status
}

fn keep_first(slot: &mut Option<GitError>, err: GitError) {
    if slot.is_none() {
        *slot = Some(err);
    }
}
