// `econfab config` - show the effective settings, optionally writing defaults

use econfab_config::Settings;

use crate::CliError;

pub fn cmd_config(init: bool) -> Result<(), CliError> {
    let path = Settings::config_path();

    if init {
        if path.exists() {
            eprintln!("settings file already exists: {}", path.display());
        } else {
            Settings::default().save_to(&path).map_err(|e| CliError::io(e.to_string()))?;
            eprintln!("wrote defaults to {}", path.display());
        }
    }

    let settings = Settings::load_from(&path);
    let text = serde_json::to_string_pretty(&settings).map_err(|e| CliError::io(e.to_string()))?;
    eprintln!("settings: {}", path.display());
    println!("{}", text);
    Ok(())
}
