//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Validates validity window, retry, logging and endpoint invariants

use tracing::{error, info};

use crate::config::settings::{RetryConfig, SettingsConfig};
use crate::config::sources::{ServiceConfig, SourceConfig};

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub fn validate_service_config(cfg: &ServiceConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);
    validate_source(&cfg.source, &mut errors);

    if errors.is_empty() {
        info!("config valid");
        Ok(())
    } else {
        error!("configuration validation errors ({}):", errors.len());
        for e in &errors {
            error!(" - {}", e);
        }
        Err(errors)
    }
}

/// SETTINGS VALIDATION
fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if let Some(retry) = &settings.retry {
        validate_retry("settings.retry", retry, errors);
    }

    if settings.default_validity_seconds == Some(0) {
        errors.push("settings.default_validity_seconds must be > 0".to_string());
    }

    // logging level
    if let Some(logging) = &settings.logging {
        let valid = ["trace", "debug", "info", "warn", "error"];
        if !valid.contains(&logging.level.to_lowercase().as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' invalid; allowed: {:?}",
                logging.level, valid
            ));
        }
    }
}

fn validate_retry(path: &str, retry: &RetryConfig, errors: &mut Vec<String>) {
    if let Some(attempts) = retry.attempts {
        if attempts == 0 {
            errors.push(format!("{}.attempts must be > 0", path));
        }
    }
    if let (Some(base), Some(max)) = (retry.base_delay_ms, retry.max_delay_ms) {
        if max < base {
            errors.push(format!(
                "{}.max_delay_ms ({}) must be >= base_delay_ms ({})",
                path, max, base
            ));
        }
    }
}

/// TOKEN ENDPOINT
fn validate_source(source: &SourceConfig, errors: &mut Vec<String>) {
    if !(source.url.starts_with("http://") || source.url.starts_with("https://")) {
        errors.push(format!(
            "source.url '{}' must be an http:// or https:// URL",
            source.url
        ));
    }
    if source.timeout_ms == Some(0) {
        errors.push("source.timeout_ms must be > 0".to_string());
    }
    if let Some(headers) = &source.headers {
        for name in headers.keys() {
            if name.trim().is_empty() {
                errors.push("source.headers contains an empty header name".to_string());
            }
        }
    }
}
