//! Process-wide mapper settings

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Behaviour switches shared by every document type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Run the schema before every save
    pub validate_on_save: bool,
    /// Screen query filters for operators that execute JavaScript
    pub validate_queries: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            validate_on_save: true,
            validate_queries: true,
        }
    }
}

static CONFIG: Lazy<RwLock<MapperConfig>> = Lazy::new(|| RwLock::new(MapperConfig::default()));

/// Current settings
pub fn get_config() -> MapperConfig {
    *CONFIG.read()
}

/// Replace the settings
pub fn set_config(config: MapperConfig) {
    warn_if_relaxed(&config);
    *CONFIG.write() = config;
}

/// Update the settings in place
///
/// ```
/// use docmap_mongodb::{configure, get_config};
///
/// configure(|config| config.validate_queries = true);
/// assert!(get_config().validate_queries);
/// ```
pub fn configure<F>(update: F)
where
    F: FnOnce(&mut MapperConfig),
{
    let mut config = CONFIG.write();
    update(&mut *config);
    warn_if_relaxed(&*config);
}

fn warn_if_relaxed(config: &MapperConfig) {
    if !config.validate_on_save {
        tracing::warn!("validation on save is disabled; invalid documents can be persisted");
    }
    if !config.validate_queries {
        tracing::warn!("query validation is disabled; filters are passed through unchecked");
    }
}
