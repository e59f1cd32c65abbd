//! Remote-framebuffer endpoint addresses.
//!
//! Two forms are accepted:
//!
//! | Text                      | Meaning                           |
//! |---------------------------|-----------------------------------|
//! | `unix:/tmp/umw-vnc.sock`  | Unix domain socket at that path   |
//! | `localhost:5900`          | TCP host and port                 |
//! | `[::1]:5900`              | TCP, bracketed IPv6 literal       |

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid endpoint address {0:?}; expected `unix:<path>` or `<host>:<port>`")]
pub struct AddressError(pub String);

/// Where the remote-framebuffer endpoint listens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RemoteAddress {
    Tcp { host: String, port: u16 },
    Unix(PathBuf),
}

impl FromStr for RemoteAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AddressError(s.to_string());

        if let Some(path) = s.strip_prefix("unix:") {
            if path.is_empty() {
                return Err(invalid());
            }
            return Ok(RemoteAddress::Unix(PathBuf::from(path)));
        }

        let (host, port) = s.rsplit_once(':').ok_or_else(invalid)?;
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if host.is_empty() {
            return Err(invalid());
        }
        let port = port.parse::<u16>().map_err(|_| invalid())?;
        Ok(RemoteAddress::Tcp {
            host: host.to_string(),
            port,
        })
    }
}

impl TryFrom<String> for RemoteAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RemoteAddress> for String {
    fn from(address: RemoteAddress) -> Self {
        address.to_string()
    }
}

impl fmt::Display for RemoteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteAddress::Unix(path) => write!(f, "unix:{}", path.display()),
            RemoteAddress::Tcp { host, port } if host.contains(':') => {
                write!(f, "[{host}]:{port}")
            }
            RemoteAddress::Tcp { host, port } => write!(f, "{host}:{port}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_unix_socket() {
        let addr: RemoteAddress = "unix:/tmp/umw-vnc.sock".parse().unwrap();
        assert_eq!(addr, RemoteAddress::Unix(PathBuf::from("/tmp/umw-vnc.sock")));
    }

    #[test]
    fn test_parse_tcp_host_port() {
        let addr: RemoteAddress = "localhost:5900".parse().unwrap();
        assert_eq!(
            addr,
            RemoteAddress::Tcp {
                host: "localhost".to_string(),
                port: 5900
            }
        );
    }

    #[test]
    fn test_parse_bracketed_ipv6() {
        let addr: RemoteAddress = "[::1]:5901".parse().unwrap();
        assert_eq!(
            addr,
            RemoteAddress::Tcp {
                host: "::1".to_string(),
                port: 5901
            }
        );
        assert_eq!(addr.to_string(), "[::1]:5901");
    }

    #[test]
    fn test_rejects_malformed_addresses() {
        for bad in ["", "unix:", "localhost", ":5900", "host:notaport", "host:70000"] {
            assert!(bad.parse::<RemoteAddress>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_display_matches_parse_input() {
        for text in ["unix:/run/vm.sock", "10.0.0.5:5900"] {
            let addr: RemoteAddress = text.parse().unwrap();
            assert_eq!(addr.to_string(), text);
        }
    }
}
