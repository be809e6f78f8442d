//! Host string parsing.
//!
//! Remote operations target a host expressed as `[user@]host[:port]`. The
//! parsed form keeps the user and port optional so configuration defaults can
//! fill the gaps when the SSH command line is assembled.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised when a host string cannot be parsed.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum HostParseError {
    /// Raised when the host component is empty.
    #[error("host string '{value}' does not name a host")]
    MissingHost {
        /// Raw input that failed to parse.
        value: String,
    },
    /// Raised when an `@` is present but no user precedes it.
    #[error("host string '{value}' has an empty user before '@'")]
    EmptyUser {
        /// Raw input that failed to parse.
        value: String,
    },
    /// Raised when the port is not a number between 1 and 65535.
    #[error("host string '{value}' has invalid port '{port}'")]
    InvalidPort {
        /// Raw input that failed to parse.
        value: String,
        /// Port component as written.
        port: String,
    },
}

/// Parsed `[user@]host[:port]` target.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct HostString {
    /// Login user, when given explicitly.
    pub user: Option<String>,
    /// Hostname or address.
    pub host: String,
    /// SSH port, when given explicitly.
    pub port: Option<u16>,
}

impl HostString {
    /// Builds a host string for `host` without user or port overrides.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            user: None,
            host: host.into(),
            port: None,
        }
    }

    /// Returns a copy with `user` applied when no user was given explicitly.
    #[must_use]
    pub fn with_default_user(mut self, user: Option<&str>) -> Self {
        if self.user.is_none() {
            self.user = user.map(str::to_owned);
        }
        self
    }

    /// Returns the explicit port or `default`.
    #[must_use]
    pub fn port_or(&self, default: u16) -> u16 {
        self.port.unwrap_or(default)
    }

    /// Destination argument understood by `ssh`.
    #[must_use]
    pub fn destination(&self) -> String {
        self.user.as_ref().map_or_else(
            || self.host.clone(),
            |user| format!("{user}@{}", self.host),
        )
    }
}

impl FromStr for HostString {
    type Err = HostParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let (user, rest) = match trimmed.rsplit_once('@') {
            Some((user, _)) if user.is_empty() => {
                return Err(HostParseError::EmptyUser {
                    value: value.to_owned(),
                });
            }
            Some((user, rest)) => (Some(user.to_owned()), rest),
            None => (None, trimmed),
        };

        let (host, port) = split_port(value, rest)?;
        if host.is_empty() {
            return Err(HostParseError::MissingHost {
                value: value.to_owned(),
            });
        }

        Ok(Self {
            user,
            host: host.to_owned(),
            port,
        })
    }
}

fn split_port<'a>(value: &str, rest: &'a str) -> Result<(&'a str, Option<u16>), HostParseError> {
    // Bracketed IPv6 literals carry colons of their own.
    if let Some(inner) = rest.strip_prefix('[') {
        let Some((host, tail)) = inner.split_once(']') else {
            return Err(HostParseError::MissingHost {
                value: value.to_owned(),
            });
        };
        return match tail.strip_prefix(':') {
            Some(port) => Ok((host, Some(parse_port(value, port)?))),
            None if tail.is_empty() => Ok((host, None)),
            None => Err(HostParseError::MissingHost {
                value: value.to_owned(),
            }),
        };
    }

    match rest.split_once(':') {
        Some((host, port)) => Ok((host, Some(parse_port(value, port)?))),
        None => Ok((rest, None)),
    }
}

fn parse_port(value: &str, port: &str) -> Result<u16, HostParseError> {
    match port.parse::<u16>() {
        Ok(parsed) if parsed != 0 => Ok(parsed),
        _ => Err(HostParseError::InvalidPort {
            value: value.to_owned(),
            port: port.to_owned(),
        }),
    }
}

impl fmt::Display for HostString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref user) = self.user {
            write!(f, "{user}@")?;
        }
        if self.host.contains(':') {
            write!(f, "[{}]", self.host)?;
        } else {
            f.write_str(&self.host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}
