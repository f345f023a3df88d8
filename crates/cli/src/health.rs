// `econfab health` - check the cleaning service

use std::time::Duration;

use econfab_cleaner::CleanerClient;
use econfab_config::Settings;

use crate::exit_codes::EXIT_ASSEMBLY;
use crate::CliError;

pub async fn cmd_health(cleaner_url: Option<String>) -> Result<(), CliError> {
    let settings = Settings::load();
    let endpoint = cleaner_url.as_deref().unwrap_or(&settings.cleaner_endpoint);
    let client = CleanerClient::new(endpoint, Duration::from_secs(settings.cleaner_timeout_secs))
        .map_err(|e| CliError::config(e.to_string()))?;

    let report = client.health().await.map_err(|e| {
        CliError::new(EXIT_ASSEMBLY, format!("{}: {}", client.endpoint(), e))
            .with_hint("start the cleaning service or pass --cleaner-url")
    })?;

    println!("endpoint: {}", client.endpoint());
    println!("status:   {}", report.status);
    println!("ai:       {}", if report.openai_configured { "configured" } else { "not configured" });

    if report.is_healthy() {
        Ok(())
    } else {
        Err(CliError::new(EXIT_ASSEMBLY, format!("cleaning service reports status '{}'", report.status)))
    }
}
