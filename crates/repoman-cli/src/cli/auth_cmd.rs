use super::*;

pub(super) fn handle_auth(
    args: AuthArgs,
    mut config: AppConfig,
    config_path: &Path,
) -> anyhow::Result<()> {
    let outcome = save_api_key(
        &KeyringStore,
        &mut config,
        config_path,
        &args.api_key,
        args.base_url.as_deref(),
    )
    .context("save API key")?;

    println!("Authentication configured.");
    if outcome.keyring_used {
        println!("API key: saved in the system keyring.");
    } else {
        println!(
            "API key: saved in {} because the system keyring was unavailable.",
            outcome.config_path.display()
        );
    }
    if outcome.file_written {
        println!(
            "Base URL: {} (saved in {})",
            config.base_url(),
            outcome.config_path.display()
        );
    } else {
        println!("Base URL: {} (default)", config.base_url());
    }
    Ok(())
}
