use super::*;

/// Runs blocking batch work off the async runtime. Ctrl-C trips the token
/// handed to `work`; items already running finish or are killed by the runner.
pub(in crate::cli) async fn run_cancellable<T, F>(work: F) -> anyhow::Result<(T, bool)>
where
    T: Send + 'static,
    F: FnOnce(CancelToken) -> T + Send + 'static,
{
    let cancel = CancelToken::new();
    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Interrupted; stopping running git commands.");
                cancel.cancel();
            }
        }
    });
    let worker = tokio::task::spawn_blocking({
        let cancel = cancel.clone();
        move || work(cancel)
    });
    let result = worker.await.context("batch worker panicked");
    watcher.abort();
    Ok((result?, cancel.is_cancelled()))
}
