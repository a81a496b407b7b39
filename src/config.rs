//! Command-line arguments and client configuration.
//!
//! Everything the client needs comes from the command line. There is no
//! config file and the environment is only consulted for `RUST_LOG`.
//!
//! [`Cli`] is the raw clap definition; [`load_config`] validates and
//! normalizes the connection settings into a [`ClientConfig`] which is handed
//! to [`ControlClient::new`](crate::client::ControlClient::new).

use std::time::Duration;

use clap::Parser;

pub const DEFAULT_SERVER: &str = "http://localhost:26538";
pub const DEFAULT_API: &str = "/api/v1";
pub const DEFAULT_USER: &str = "youtube-music-control";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// CLI arguments parsed by `clap`.
#[derive(Parser, Debug)]
#[command(
    name = "youtube-music-control",
    version,
    allow_negative_numbers = true,
    about = "Remote control client for th-ch/youtube-music"
)]
pub struct Cli {
    /// Server base URL
    #[arg(long, short = 's', default_value = DEFAULT_SERVER)]
    pub server: String,

    /// API path
    #[arg(long, default_value = DEFAULT_API)]
    pub api: String,

    /// Username for authentication
    #[arg(long, short = 'u', default_value = DEFAULT_USER)]
    pub user: String,

    /// Use PATCH method
    #[arg(long, conflicts_with = "delete")]
    pub patch: bool,

    /// Use DELETE method
    #[arg(long)]
    pub delete: bool,

    /// List available API endpoints
    #[arg(long, short = 'l')]
    pub list: bool,

    /// Print request details
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Log filter for diagnostics on stderr (overridden by RUST_LOG)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// API endpoint to call
    pub endpoint: Option<String>,

    /// Request data: JSON or a single value
    pub data: Option<String>,
}

/// Validated connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL without trailing slash, e.g. `http://localhost:26538`.
    pub server: String,
    /// API prefix with a leading slash and no trailing slash, e.g. `/api/v1`.
    /// Empty when the API lives at the server root.
    pub api: String,
    pub timeout: Duration,
}

/// Validate and normalize the connection flags.
pub fn load_config(cli: &Cli) -> Result<ClientConfig, String> {
    let server = cli.server.trim().trim_end_matches('/');
    if server.is_empty() {
        return Err("--server is empty".into());
    }
    reqwest::Url::parse(server).map_err(|e| format!("Invalid server URL '{server}': {e}"))?;

    if cli.timeout == 0 {
        return Err("--timeout must be at least 1 second".into());
    }

    Ok(ClientConfig {
        server: server.to_string(),
        api: normalize_api(&cli.api),
        timeout: Duration::from_secs(cli.timeout),
    })
}

fn normalize_api(api: &str) -> String {
    let trimmed = api.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["youtube-music-control"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("valid arguments")
    }

    #[test]
    fn defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.server, DEFAULT_SERVER);
        assert_eq!(cli.api, DEFAULT_API);
        assert_eq!(cli.user, DEFAULT_USER);
        assert!(cli.endpoint.is_none());
        assert!(cli.data.is_none());

        let config = load_config(&cli).unwrap();
        assert_eq!(config.server, "http://localhost:26538");
        assert_eq!(config.api, "/api/v1");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn positional_endpoint_and_data() {
        let cli = parse(&["volume", "75"]);
        assert_eq!(cli.endpoint.as_deref(), Some("volume"));
        assert_eq!(cli.data.as_deref(), Some("75"));
    }

    #[test]
    fn negative_number_as_data() {
        let cli = parse(&["seek-by", "-10"]);
        assert_eq!(cli.data.as_deref(), Some("-10"));
    }

    #[test]
    fn short_flags() {
        let cli = parse(&["-s", "http://host:1", "-u", "me", "-l", "-v"]);
        assert_eq!(cli.server, "http://host:1");
        assert_eq!(cli.user, "me");
        assert!(cli.list);
        assert!(cli.verbose);
    }

    #[test]
    fn patch_and_delete_conflict() {
        let err = Cli::try_parse_from(["youtube-music-control", "--patch", "--delete", "x"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn trailing_slashes_stripped() {
        let cli = parse(&["--server", "http://localhost:26538/", "--api", "/api/v1/"]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.server, "http://localhost:26538");
        assert_eq!(config.api, "/api/v1");
    }

    #[test]
    fn api_gets_leading_slash() {
        assert_eq!(normalize_api("api/v1"), "/api/v1");
        assert_eq!(normalize_api("/"), "");
        assert_eq!(normalize_api(""), "");
    }

    #[test]
    fn invalid_server_rejected() {
        let cli = parse(&["--server", "not a url"]);
        assert!(load_config(&cli).unwrap_err().contains("Invalid server URL"));
    }

    #[test]
    fn zero_timeout_rejected() {
        let cli = parse(&["--timeout", "0"]);
        assert!(load_config(&cli).is_err());
    }
}
