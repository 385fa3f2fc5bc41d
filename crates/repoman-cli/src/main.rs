use time::UtcOffset;

mod cli;
mod logging;

fn main() -> anyhow::Result<()> {
    // The local offset can only be read soundly before other threads exist.
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(cli::run(offset))
}
