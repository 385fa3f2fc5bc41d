use super::*;

pub(in crate::cli) fn progress_line(event: &ProgressEvent) -> String {
    let verdict = if event.success { "ok" } else { "failed" };
    format!(
        "[{}/{}] {} {}",
        event.completed, event.total, event.name, verdict
    )
}

/// `today 14:05`, `yesterday 09:30` or `2024-02-01 17:45` in the offset of `now`.
pub(in crate::cli) fn format_commit_time(commit: Option<OffsetDateTime>, now: OffsetDateTime) -> String {
    let Some(commit) = commit else {
        return "-".to_string();
    };
    let local = commit.to_offset(now.offset());
    let day = local.date();
    let label = if day == now.date() {
        "today     ".to_string()
    } else if now.date().previous_day() == Some(day) {
        "yesterday ".to_string()
    } else {
        format!(
            "{:04}-{:02}-{:02}",
            day.year(),
            u8::from(day.month()),
            day.day()
        )
    };
    format!("{label} {:02}:{:02}", local.hour(), local.minute())
}

const STATUS_HEADER: [&str; 5] = ["REPO", "BRANCH", "LAST COMMIT", "LOCAL", "SYNC"];

/// Header plus one aligned row per repository; slots left empty by an
/// interrupt say so.
pub(in crate::cli) fn status_rows(
    names: &[String],
    statuses: &[Option<RepoStatus>],
    now: OffsetDateTime,
) -> Vec<String> {
    let header = STATUS_HEADER.map(str::to_string);
    let cells: Vec<[String; 5]> = std::iter::once(header)
        .chain(names.iter().zip(statuses).map(|(name, status)| match status {
            Some(status) => [
                name.clone(),
                if status.branch.is_empty() {
                    "-".to_string()
                } else {
                    status.branch.clone()
                },
                format_commit_time(status.last_commit, now),
                status.local.to_string(),
                status.sync_label(),
            ],
            None => [
                name.clone(),
                "-".to_string(),
                "-".to_string(),
                "not checked".to_string(),
                "-".to_string(),
            ],
        }))
        .collect();

    let mut widths = [0usize; 4];
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    cells
        .iter()
        .map(|row| {
            format!(
                "{:<w0$}  {:<w1$}  {:<w2$}  {:<w3$}  {}",
                row[0],
                row[1],
                row[2],
                row[3],
                row[4],
                w0 = widths[0],
                w1 = widths[1],
                w2 = widths[2],
                w3 = widths[3],
            )
        })
        .collect()
}

/// Counts of synced, failed and skipped items.
pub(in crate::cli) fn tally(outcomes: &[SyncOutcome]) -> (usize, usize, usize) {
    outcomes
        .iter()
        .fold((0, 0, 0), |(ok, failed, skipped), outcome| match outcome {
            SyncOutcome::Synced => (ok + 1, failed, skipped),
            SyncOutcome::Failed(_) => (ok, failed + 1, skipped),
            SyncOutcome::NotAttempted => (ok, failed, skipped + 1),
        })
}
