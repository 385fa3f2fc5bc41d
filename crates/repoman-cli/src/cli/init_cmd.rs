use super::shared::open_catalog;
use super::*;

pub(super) async fn handle_init(args: InitArgs, config: &AppConfig) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("resolve current directory")?;
    if let Some(existing) = find_workspace_root(&cwd)
        && !args.force
    {
        if existing == cwd {
            bail!("current directory is already a repoman workspace; pass --force to overwrite");
        }
        bail!(
            "found existing workspace at {}; pass --force to create a nested one",
            existing.display()
        );
    }

    let catalog = open_catalog(config)?;
    let workspace = resolve_workspace(&catalog, &args.course_id, &args.assignment_id).await?;
    workspace.save(&cwd)?;
    println!(
        "Current directory initialized for {} - {}",
        workspace.course_name, workspace.assignment_name
    );
    Ok(())
}

/// Looks up the display names for the chosen course and assignment.
pub(super) async fn resolve_workspace<C: Catalog>(
    catalog: &C,
    course_id: &str,
    assignment_id: &str,
) -> anyhow::Result<WorkspaceConfig> {
    let courses = catalog.courses().await.context("fetch courses")?;
    let Some(course) = courses.into_iter().find(|course| course.id == course_id) else {
        bail!("course {course_id} not found");
    };
    let assignments = catalog
        .assignments(&course.id)
        .await
        .context("fetch assignments")?;
    let Some(assignment) = assignments
        .into_iter()
        .find(|assignment| assignment.id == assignment_id)
    else {
        bail!("assignment {assignment_id} not found in course {}", course.name);
    };
    Ok(WorkspaceConfig {
        course_id: course.id,
        course_name: course.name,
        assignment_id: assignment.id,
        assignment_name: assignment.name,
    })
}
