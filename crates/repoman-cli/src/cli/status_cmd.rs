use super::shared::{build_manager, open_catalog, open_workspace, run_cancellable, status_rows};
use super::*;

pub(super) async fn handle_status(
    args: StatusArgs,
    config: &AppConfig,
    offset: UtcOffset,
) -> anyhow::Result<()> {
    let catalog = open_catalog(config)?;
    let workspace = open_workspace()?;
    let repos = catalog
        .assignment_repos(&workspace.config.assignment_id)
        .await
        .context("fetch repositories")?;

    println!(
        "Status for {} - {}",
        workspace.config.course_name, workspace.config.assignment_name
    );
    if std::env::current_dir().ok().as_deref() != Some(workspace.root.as_path()) {
        println!("Workspace: {}", workspace.root.display());
    }

    let items = descriptors(&repos, &workspace.root, false)?;
    let names: Vec<String> = items.iter().map(|item| item.name.clone()).collect();
    let manager = build_manager(config, args.jobs);
    let fetch = !args.no_fetch;
    let (statuses, interrupted) =
        run_cancellable(move |cancel| manager.status_all(&items, fetch, &cancel, None)).await?;

    let now = OffsetDateTime::now_utc().to_offset(offset);
    for row in status_rows(&names, &statuses, now) {
        println!("{row}");
    }
    for status in statuses.iter().flatten() {
        if let Some(err) = &status.error {
            eprintln!("{}: {err}", status.name);
        }
        if let Some(err) = &status.fetch_error {
            eprintln!("{}: {err}", status.name);
        }
    }
    if interrupted {
        bail!("interrupted; some repositories were not checked");
    }
    Ok(())
}
