//! Default configuration values

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "appscope.toml";

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "appscope.yaml";

/// Default listen address
pub const DEFAULT_BIND: &str = "0.0.0.0:9100";

/// Default route aliases for the parse handler
pub const DEFAULT_ROUTES: &[&str] = &["/parser", "/handler"];

/// Default query parameter names for the download URL
pub const DEFAULT_QUERY_PARAMS: &[&str] = &["download_url", "url"];

/// Health route, always served
pub const HEALTH_ROUTE: &str = "/health";

/// Default download timeout
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Default connect timeout
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_TOML,
        DEFAULT_CONFIG_YAML,
        ".appscope.toml",
        ".appscope.yaml",
    ]
}
