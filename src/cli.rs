//! Command Line Interface (CLI) arguments.

use clap::Parser;
use url::Url;

/// Travel insights command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// The IP address on which the server should listen
    #[arg(long, default_value = "0.0.0.0", env = "TRAVEL_INSIGHTS_HOST")]
    pub host: String,
    /// The port to which the server should bind
    #[arg(long, default_value_t = 8080, env = "TRAVEL_INSIGHTS_PORT")]
    pub port: u16,
    /// Flag indicating whether HTTPS should be used
    #[arg(long, default_value_t = false, env = "TRAVEL_INSIGHTS_HTTPS")]
    pub https: bool,
    /// Path to the certificate file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/travel-insights/certs/cert.pem",
        env = "TRAVEL_INSIGHTS_CERT_FILE"
    )]
    pub cert_file: String,
    /// Path to the key file to be used for HTTPS encryption
    #[arg(
        long,
        default_value = "~/.config/travel-insights/certs/key.pem",
        env = "TRAVEL_INSIGHTS_KEY_FILE"
    )]
    pub key_file: String,
    /// Maximum time in seconds to wait for requests to complete upon receiving `ctrl+c` signal.
    #[arg(long, default_value_t = 60, env = "TRAVEL_INSIGHTS_SHUTDOWN_TIMEOUT")]
    pub graceful_shutdown_timeout: u64,
    /// Base URL of the travel data repository
    #[arg(
        long,
        default_value = "https://demo.travel-intelligence.com/api/",
        env = "TRAVEL_INSIGHTS_REPOSITORY_URL"
    )]
    pub repository_url: Url,
    /// Maximum time in seconds to wait for a repository fetch
    #[arg(long, default_value_t = 30, env = "TRAVEL_INSIGHTS_FETCH_TIMEOUT")]
    pub fetch_timeout: u64,
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CommandLineArgs::parse_from(["travel-insights"]);
        assert_eq!(8080, args.port);
        assert!(!args.https);
        assert_eq!(30, args.fetch_timeout);
        assert_eq!(
            "https://demo.travel-intelligence.com/api/",
            args.repository_url.as_str()
        );
    }

    #[test]
    fn test_invalid_repository_url() {
        let result = CommandLineArgs::try_parse_from([
            "travel-insights",
            "--repository-url",
            "not a url",
        ]);
        assert!(result.is_err());
    }
}
