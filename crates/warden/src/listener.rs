//! TCP or Unix-socket listener for the HTTP server.

use axum::Router;
use std::fmt;
use std::future::Future;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tokio::net::{TcpListener, UnixListener};
use tracing::{info, warn};

use warden_common::WardenError;

const UNIX_PREFIX: &str = "unix:";

/// Where to accept connections
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenAddr {
    /// `host:port`
    Tcp(String),
    /// `unix:/path/to.sock`
    Unix(PathBuf),
}

impl ListenAddr {
    pub fn parse(addr: &str) -> Result<Self, WardenError> {
        if let Some(path) = addr.strip_prefix(UNIX_PREFIX) {
            if path.is_empty() {
                return Err(WardenError::Config(format!("empty socket path in {addr:?}")));
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }

        match addr.rsplit_once(':') {
            Some((_, port)) if port.parse::<u16>().is_ok() => Ok(Self::Tcp(addr.to_string())),
            _ => Err(WardenError::Config(format!(
                "listen address {addr:?} is neither host:port nor unix:/path"
            ))),
        }
    }
}

impl fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(addr) => f.write_str(addr),
            Self::Unix(path) => write!(f, "{UNIX_PREFIX}{}", path.display()),
        }
    }
}

/// A bound listener, ready to serve
#[derive(Debug)]
pub enum Bound {
    Tcp(TcpListener),
    Unix { listener: UnixListener, path: PathBuf },
}

impl Bound {
    pub async fn bind(addr: &ListenAddr) -> Result<Self, WardenError> {
        match addr {
            ListenAddr::Tcp(addr) => Ok(Self::Tcp(TcpListener::bind(addr).await?)),
            ListenAddr::Unix(path) => {
                let listener = bind_unix(path)?;
                Ok(Self::Unix {
                    listener,
                    path: path.clone(),
                })
            }
        }
    }

    /// Serve `app` until `shutdown` resolves, then release the socket file
    pub async fn serve<F>(self, app: Router, shutdown: F) -> Result<(), WardenError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self {
            Self::Tcp(listener) => {
                axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown)
                    .await?;
            }
            Self::Unix { listener, path } => {
                let served = axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown)
                    .await;
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %e, "Failed to remove socket file");
                }
                served?;
            }
        }
        Ok(())
    }
}

fn bind_unix(path: &Path) -> Result<UnixListener, WardenError> {
    // Left behind by an unclean exit
    if path.exists() {
        info!(path = %path.display(), "Removing stale socket file");
        std::fs::remove_file(path)?;
    }

    let listener = UnixListener::bind(path)?;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o777))?;
    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    #[test]
    fn test_parse() {
        assert_eq!(
            ListenAddr::parse("unix:/run/warden.sock").unwrap(),
            ListenAddr::Unix(PathBuf::from("/run/warden.sock"))
        );
        assert_eq!(
            ListenAddr::parse("127.0.0.1:8080").unwrap(),
            ListenAddr::Tcp("127.0.0.1:8080".to_string())
        );
        assert_eq!(
            ListenAddr::parse("[::1]:8080").unwrap(),
            ListenAddr::Tcp("[::1]:8080".to_string())
        );

        assert!(ListenAddr::parse("unix:").is_err());
        assert!(ListenAddr::parse("localhost").is_err());
        assert!(ListenAddr::parse("localhost:http").is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for addr in ["unix:/tmp/a.sock", "0.0.0.0:9000"] {
            assert_eq!(ListenAddr::parse(addr).unwrap().to_string(), addr);
        }
    }

    #[tokio::test]
    async fn test_unix_socket_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warden.sock");
        std::fs::write(&path, b"stale").unwrap();

        let bound = Bound::bind(&ListenAddr::Unix(path.clone())).await.unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o777);

        let app = Router::new().route("/", get(|| async { "ok" }));
        bound.serve(app, async {}).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_tcp_bind() {
        let bound = Bound::bind(&ListenAddr::Tcp("127.0.0.1:0".to_string()))
            .await
            .unwrap();
        assert!(matches!(bound, Bound::Tcp(_)));
    }
}
