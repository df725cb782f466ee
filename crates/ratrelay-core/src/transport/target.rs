//! Where the stream client connects to.

use std::fmt;

use url::Url;

use crate::error::{TransportError, TransportResult};

/// Resolved websocket endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    host: String,
    port: u16,
    secure: bool,
    path: String,
}

impl Target {
    /// Builds a target from the configured URL and port.
    ///
    /// `wss://` selects TLS, `ws://` or a bare host selects a plain socket.
    /// An explicit `port` wins over one embedded in the URL; with neither,
    /// the scheme default applies.
    pub fn from_url(raw: &str, port: Option<u16>) -> TransportResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TransportError::InvalidTarget("empty URL".into()));
        }
        let with_scheme = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("ws://{raw}")
        };

        let url = Url::parse(&with_scheme)
            .map_err(|e| TransportError::InvalidTarget(format!("{raw}: {e}")))?;
        let secure = match url.scheme() {
            "wss" => true,
            "ws" => false,
            other => {
                return Err(TransportError::InvalidTarget(format!(
                    "unsupported scheme '{other}' in {raw}"
                )));
            }
        };
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| TransportError::InvalidTarget(format!("{raw}: missing host")))?
            .to_string();
        let port = port
            .or_else(|| url.port())
            .unwrap_or(if secure { 443 } else { 80 });
        let path = match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        };

        Ok(Self {
            host,
            port,
            secure,
            path,
        })
    }

    /// Host name, scheme stripped. Used for certificate validation.
    pub fn server_name(&self) -> &str {
        &self.host
    }

    /// Port to connect to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether the connection uses TLS.
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Request path, including any query.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Full websocket URL.
    pub fn url(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.secure { "wss" } else { "ws" };
        write!(f, "{scheme}://{}:{}{}", self.host, self.port, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_scheme_selects_tls() {
        let target = Target::from_url("wss://api.fuelrats.com", Some(443)).unwrap();
        assert!(target.is_secure());
        assert_eq!(target.server_name(), "api.fuelrats.com");
        assert_eq!(target.url(), "wss://api.fuelrats.com:443/");
    }

    #[test]
    fn test_bare_host_is_plain() {
        let target = Target::from_url("localhost", Some(8080)).unwrap();
        assert!(!target.is_secure());
        assert_eq!(target.server_name(), "localhost");
        assert_eq!(target.port(), 8080);
    }

    #[test]
    fn test_port_falls_back_to_url_then_scheme() {
        assert_eq!(Target::from_url("ws://h:9000/x", None).unwrap().port(), 9000);
        assert_eq!(Target::from_url("wss://h", None).unwrap().port(), 443);
        assert_eq!(Target::from_url("ws://h", None).unwrap().port(), 80);
        assert_eq!(Target::from_url("ws://h:9000", Some(1)).unwrap().port(), 1);
    }

    #[test]
    fn test_path_and_query_kept() {
        let target = Target::from_url("ws://h/stream?v=2", None).unwrap();
        assert_eq!(target.path(), "/stream?v=2");
    }

    #[test]
    fn test_rejects_bad_targets() {
        assert!(Target::from_url("", None).is_err());
        assert!(Target::from_url("http://h", None).is_err());
        assert!(Target::from_url("ws://", None).is_err());
    }
}
