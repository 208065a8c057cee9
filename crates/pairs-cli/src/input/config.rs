use log::info;
use pairs_core::EngineConfig;
use std::fs::File;

use super::file::{has_extension, resolve_path};

/// Engine configuration from a JSON or YAML file, or the defaults.
///
/// Missing sections and fields fall back to their defaults.
pub fn load_config(path: Option<&str>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let canonical = resolve_path(path)?;
    let file = File::open(&canonical)
        .map_err(|e| format!("failed to open config {}: {}", canonical.display(), e))?;

    let config: EngineConfig = if has_extension(path, &["yaml", "yml"]) {
        serde_yaml::from_reader(file)
            .map_err(|e| format!("failed to parse config {}: {}", canonical.display(), e))?
    } else {
        serde_json::from_reader(file)
            .map_err(|e| format!("failed to parse config {}: {}", canonical.display(), e))?
    };
    config.validate()?;
    info!("loaded engine config from {}", canonical.display());
    Ok(config)
}
