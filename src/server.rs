//! Web server

use crate::cli;
use crate::error::InsightsError;

use std::path::PathBuf;
use std::{net::SocketAddr, str::FromStr, time::Duration};

use axum::ServiceExt;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use expanduser::expanduser;
use tokio::signal;

fn server_config(reason: String) -> InsightsError {
    InsightsError::ServerConfig { reason }
}

/// Expand `~` in a TLS file path and check the file exists.
fn tls_file(path: &str, description: &str) -> Result<PathBuf, InsightsError> {
    let expanded = expanduser(path).map_err(|_| {
        server_config(format!(
            "failed to expand ~ in {description} path '{path}', please provide an absolute path instead"
        ))
    })?;
    if !expanded.exists() {
        return Err(server_config(format!(
            "{description} expected at '{}' but not found",
            expanded.display()
        )));
    }
    expanded.canonicalize().map_err(|error| {
        server_config(format!(
            "failed to determine absolute path to {description}: {error}"
        ))
    })
}

/// Serve the travel insights service
///
/// # Arguments
///
/// * `args`: Command line arguments
/// * `service`: The [crate::app::Service] to serve
pub async fn serve(
    args: &cli::CommandLineArgs,
    service: crate::app::Service,
) -> Result<(), InsightsError> {
    let addr = SocketAddr::from_str(&format!("{}:{}", args.host, args.port)).map_err(|error| {
        server_config(format!(
            "invalid host name, IP address or port number: {error}"
        ))
    })?;

    // Catch ctrl+c and try to shutdown gracefully
    let handle = Handle::new();
    tokio::spawn(shutdown_signal(
        handle.clone(),
        args.graceful_shutdown_timeout,
    ));

    tracing::info!(%addr, https = args.https, "listening");
    let served = if args.https {
        let cert_file = tls_file(&args.cert_file, "TLS certificate file")?;
        let key_file = tls_file(&args.key_file, "TLS key file")?;
        let tls_config = RustlsConfig::from_pem_file(cert_file, key_file)
            .await
            .map_err(|error| {
                server_config(format!("failed to load TLS certificate files: {error}"))
            })?;
        // run HTTPS server with hyper
        axum_server::bind_rustls(addr, tls_config)
            .handle(handle)
            .serve(service.into_make_service())
            .await
    } else {
        // run HTTP server with hyper
        axum_server::bind(addr)
            .handle(handle)
            .serve(service.into_make_service())
            .await
    };
    served.map_err(|error| server_config(format!("server failed: {error}")))
}

/// Graceful shutdown handler
///
/// Installs signal handlers to catch Ctrl-C or SIGTERM and trigger a graceful shutdown.
async fn shutdown_signal(handle: Handle, timeout: u64) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!(%error, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("signal received, starting graceful shutdown");
    // Force shutdown if graceful shutdown takes longer than the timeout
    handle.graceful_shutdown(Some(Duration::from_secs(timeout)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tls_file_missing() {
        let error = tls_file("/nonexistent/travel-insights/cert.pem", "TLS certificate file")
            .unwrap_err();
        assert_eq!(
            "invalid server configuration: TLS certificate file expected at \
             '/nonexistent/travel-insights/cert.pem' but not found",
            error.to_string()
        );
    }
}
