//! Configuration validation

use std::collections::HashSet;
use std::net::SocketAddr;

use tracing::debug;

use crate::error::ConfigError;

use super::defaults::HEALTH_ROUTE;
use super::types::Config;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    debug!("validating configuration");
    validate_server(config)?;
    validate_download(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
}

fn validate_server(config: &Config) -> Result<(), ConfigError> {
    let server = &config.server;

    if server.bind.parse::<SocketAddr>().is_err() {
        return Err(invalid(
            "server.bind",
            format!("'{}' is not a host:port address", server.bind),
        ));
    }

    if server.routes.is_empty() {
        return Err(invalid("server.routes", "at least one route is required"));
    }

    let mut seen = HashSet::new();
    for route in &server.routes {
        if !route.starts_with('/') {
            return Err(invalid(
                "server.routes",
                format!("'{}' must start with '/'", route),
            ));
        }
        if route == HEALTH_ROUTE {
            return Err(invalid(
                "server.routes",
                format!("'{}' is reserved for the health check", HEALTH_ROUTE),
            ));
        }
        if !seen.insert(route.as_str()) {
            return Err(invalid(
                "server.routes",
                format!("'{}' is listed more than once", route),
            ));
        }
    }

    if server.accepted_query_params.is_empty()
        || server.accepted_query_params.iter().any(|p| p.trim().is_empty())
    {
        return Err(invalid(
            "server.accepted_query_params",
            "must list at least one non-empty parameter name",
        ));
    }

    if let Some(offset) = server.utc_offset_hours {
        if !(-23..=23).contains(&offset) {
            return Err(invalid(
                "server.utc_offset_hours",
                "must be between -23 and 23",
            ));
        }
    }

    Ok(())
}

fn validate_download(config: &Config) -> Result<(), ConfigError> {
    if config.download.timeout_secs == 0 {
        return Err(invalid("download.timeout_secs", "must be greater than zero"));
    }
    if config.download.connect_timeout_secs == 0 {
        return Err(invalid(
            "download.connect_timeout_secs",
            "must be greater than zero",
        ));
    }
    Ok(())
}
