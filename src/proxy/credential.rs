use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::fmt;

/// One proxy endpoint with optional basic-auth credentials
///
/// Parsed from `host:port` or `host:port:user:pass`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyCredential {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl ProxyCredential {
    /// Parses a configuration-style proxy string
    ///
    /// Two fields give an unauthenticated proxy, four fields add user and
    /// password. Any other field count, an empty host, or a non-numeric port
    /// is rejected with a warning and `None`.
    pub fn parse(entry: &str) -> Option<Self> {
        let entry = entry.trim();
        let parts: Vec<&str> = entry.split(':').collect();

        let (host, port, user, password) = match parts.as_slice() {
            [host, port] => (*host, *port, None, None),
            [host, port, user, password] => (
                *host,
                *port,
                Some(user.to_string()),
                Some(password.to_string()),
            ),
            _ => {
                tracing::warn!(
                    "Dropping proxy entry with {} fields (expected 2 or 4): {}",
                    parts.len(),
                    entry
                );
                return None;
            }
        };

        if host.is_empty() {
            tracing::warn!("Dropping proxy entry with empty host: {}", entry);
            return None;
        }

        let port = match port.parse::<u16>() {
            Ok(port) => port,
            Err(_) => {
                tracing::warn!("Dropping proxy entry with invalid port: {}", entry);
                return None;
            }
        };

        Some(Self {
            host: host.to_string(),
            port,
            user,
            password,
        })
    }

    /// Proxy URL handed to the HTTP client
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// `Basic <base64(user:pass)>`, only when both user and password are non-empty
    pub fn authorization(&self) -> Option<String> {
        match (self.user.as_deref(), self.password.as_deref()) {
            (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
                let encoded = STANDARD.encode(format!("{}:{}", user, password));
                Some(format!("Basic {}", encoded))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ProxyCredential {
    // Never print the password.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
