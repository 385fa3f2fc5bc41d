use super::shared::{build_manager, open_catalog, open_workspace, progress_line, run_cancellable, tally};
use super::*;

pub(super) async fn handle_sync(args: SyncArgs, config: &AppConfig) -> anyhow::Result<()> {
    let catalog = open_catalog(config)?;
    let workspace = open_workspace()?;
    let repos = catalog
        .assignment_repos(&workspace.config.assignment_id)
        .await
        .context("fetch repositories")?;
    if repos.is_empty() {
        println!("No student repositories found for this assignment.");
        return Ok(());
    }

    println!(
        "Syncing {} repositories for {} - {}",
        repos.len(),
        workspace.config.course_name,
        workspace.config.assignment_name
    );
    let items = descriptors(&repos, &workspace.root, args.http)?;
    let names: Vec<String> = items.iter().map(|item| item.name.clone()).collect();
    let manager = build_manager(config, args.jobs);
    let (outcomes, interrupted) = run_cancellable(move |cancel| {
        let report = |event: ProgressEvent| println!("{}", progress_line(&event));
        manager.sync_all(&items, &cancel, Some(&report))
    })
    .await?;

    for (name, outcome) in names.iter().zip(&outcomes) {
        if let Some(err) = outcome.error() {
            eprintln!("Error syncing {name}: {err}");
        }
    }
    let (synced, failed, skipped) = tally(&outcomes);
    println!(
        "Sync complete. {synced}/{} repositories synced successfully.",
        outcomes.len()
    );
    if interrupted {
        bail!("interrupted; {skipped} repositories were not attempted");
    }
    if failed > 0 {
        bail!("{failed} repositories failed to sync");
    }
    Ok(())
}
