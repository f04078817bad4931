use serde::Deserialize;
use std::collections::HashMap;
use crate::config::settings::SettingsConfig;

pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    #[serde(default)]
    pub settings: SettingsConfig,
    pub source: SourceConfig,
}

/// ================================
/// Token endpoint
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub url: String,
    pub timeout_ms: Option<u64>,
    pub headers: Option<HashMap<String, String>>,
}
