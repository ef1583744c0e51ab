//! Application configuration loaded from environment variables.

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3001`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `CLIENT_ORIGIN`: browser origin allowed by CORS (default: any origin)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub client_origin: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            client_origin: std::env::var("CLIENT_ORIGIN")
                .ok()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            log_level: "info".to_string(),
            client_origin: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    const VARS: [&str; 4] = ["HOST", "PORT", "RUST_LOG", "CLIENT_ORIGIN"];

    fn clear_env() {
        for var in VARS {
            // SAFETY: env-mutating tests are serialized with #[serial].
            unsafe { std::env::remove_var(var) };
        }
    }

    fn set_env(var: &str, value: &str) {
        // SAFETY: env-mutating tests are serialized with #[serial].
        unsafe { std::env::set_var(var, value) };
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3001);
        assert_eq!(config.log_level, "info");
        assert!(config.client_origin.is_none());
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    #[serial]
    fn test_from_env_without_vars_uses_defaults() {
        clear_env();
        assert_eq!(Config::from_env(), Config::default());
    }

    #[test]
    #[serial]
    fn test_from_env_reads_vars() {
        clear_env();
        set_env("HOST", "127.0.0.1");
        set_env("PORT", "4000");
        set_env("RUST_LOG", "debug");
        set_env("CLIENT_ORIGIN", "http://localhost:5173");

        let config = Config::from_env();
        clear_env();

        assert_eq!(config.addr(), "127.0.0.1:4000");
        assert_eq!(config.log_level, "debug");
        assert_eq!(
            config.client_origin.as_deref(),
            Some("http://localhost:5173")
        );
    }

    #[test]
    #[serial]
    fn test_invalid_port_and_blank_origin_fall_back() {
        clear_env();
        set_env("PORT", "not-a-port");
        set_env("CLIENT_ORIGIN", "  ");

        let config = Config::from_env();
        clear_env();

        assert_eq!(config.port, 3001);
        assert!(config.client_origin.is_none());
    }
}
