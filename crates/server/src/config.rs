use std::time::Duration;

use httpd_core::connection::ConnectionConfig;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {source}")]
    Parse {
        #[from]
        source: toml::de::Error,
    },
}

/// Settings of a [`crate::Server`], loadable from TOML.
///
/// Every field is optional in the TOML source and falls back to its default.
///
/// ```
/// use httpd_server::ServerConfig;
///
/// let config = ServerConfig::from_toml_str(r#"
///     port = 8080
///     idle_timeout_ms = 5000
///     dump_request_head = true
/// "#).unwrap();
///
/// assert_eq!(config.host, "127.0.0.1");
/// assert_eq!(config.port, 8080);
/// assert_eq!(config.connection_config().idle_timeout.as_millis(), 5000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Host to listen on; also the primary host of the server identity.
    pub host: String,
    /// Port to listen on, 0 picks a free one.
    pub port: u16,
    pub server_name: String,
    pub max_head_size: usize,
    pub max_body_size: u64,
    pub stream_threshold: u64,
    pub stream_unit: usize,
    pub idle_timeout_ms: u64,
    pub dump_request_head: bool,
    pub dump_request_body: bool,
    pub dump_response_head: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let connection = ConnectionConfig::default();
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            server_name: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            max_head_size: connection.max_head_size,
            max_body_size: connection.max_body_size,
            stream_threshold: connection.stream_threshold,
            stream_unit: connection.stream_unit,
            idle_timeout_ms: u64::try_from(connection.idle_timeout.as_millis()).unwrap_or(u64::MAX),
            dump_request_head: false,
            dump_request_body: false,
            dump_response_head: false,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(str)?)
    }

    /// The part of the configuration each connection needs.
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            server_name: self.server_name.clone(),
            max_head_size: self.max_head_size,
            max_body_size: self.max_body_size,
            stream_threshold: self.stream_threshold,
            stream_unit: self.stream_unit,
            idle_timeout: Duration::from_millis(self.idle_timeout_ms),
            dump_request_head: self.dump_request_head,
            dump_request_body: self.dump_request_body,
            dump_response_head: self.dump_response_head,
            ..ConnectionConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn empty_source_gives_defaults() {
        let config = ServerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ServerConfig::default());

        let connection = config.connection_config();
        assert_eq!(connection.idle_timeout, Duration::from_secs(30));
        assert_eq!(connection.stream_threshold, 1024 * 1024);
        assert_eq!(connection.stream_unit, 64 * 1024);
        assert!(connection.server_name.starts_with("httpd-server/"));
    }

    #[test]
    fn reads_every_field() {
        let config = ServerConfig::from_toml_str(indoc! {r#"
            host = "localhost"
            port = 4444
            server_name = "pocket"
            max_head_size = 1024
            max_body_size = 2048
            stream_threshold = 10
            stream_unit = 2
            idle_timeout_ms = 250
            dump_request_head = true
            dump_request_body = true
            dump_response_head = true
        "#})
        .unwrap();

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 4444);

        let connection = config.connection_config();
        assert_eq!(connection.server_name, "pocket");
        assert_eq!(connection.max_head_size, 1024);
        assert_eq!(connection.max_body_size, 2048);
        assert_eq!(connection.stream_threshold, 10);
        assert_eq!(connection.stream_unit, 2);
        assert_eq!(connection.idle_timeout, Duration::from_millis(250));
        assert!(connection.dump_request_head && connection.dump_request_body && connection.dump_response_head);
    }

    #[test]
    fn rejects_unknown_and_mistyped_fields() {
        assert!(matches!(ServerConfig::from_toml_str("prot = 80"), Err(ConfigError::Parse { .. })));
        assert!(matches!(ServerConfig::from_toml_str("port = \"80\""), Err(ConfigError::Parse { .. })));
        assert!(matches!(ServerConfig::from_toml_str("port = 70000"), Err(ConfigError::Parse { .. })));
    }
}
