//! Backend address parsing and URL composition.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use url::Url;

/// Transport scheme used to reach the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Scheme {
    /// Plain HTTP, the normal case for a loopback backend.
    Http,
    /// HTTP over TLS.
    Https,
}

impl Scheme {
    const fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

/// Location of the backend HTTP service.
///
/// Parsed from URLs such as `http://127.0.0.1:5000`. Only the scheme, host and
/// port are kept; request paths are appended with [`BackendEndpoint::url_for`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct BackendEndpoint {
    scheme: Scheme,
    host: String,
    port: u16,
}

impl BackendEndpoint {
    /// Builds a plain HTTP endpoint.
    #[must_use]
    pub fn http(host: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: Scheme::Http,
            host: host.into(),
            port,
        }
    }

    /// Transport scheme.
    #[must_use]
    pub const fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Host name or address.
    #[must_use]
    pub fn host(&self) -> &str {
        self.host.as_str()
    }

    /// TCP port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Full URL for `path` on this backend.
    ///
    /// A missing leading slash is added, so `health` and `/health` resolve to
    /// the same URL.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        let separator = if path.starts_with('/') { "" } else { "/" };
        format!("{self}{separator}{path}")
    }
}

impl fmt::Display for BackendEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(formatter, "{}://[{}]:{}", self.scheme, self.host, self.port)
        } else {
            write!(formatter, "{}://{}:{}", self.scheme, self.host, self.port)
        }
    }
}

impl FromStr for BackendEndpoint {
    type Err = EndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input.trim())?;
        let scheme = Scheme::from_str(url.scheme())
            .map_err(|_| EndpointParseError::UnsupportedScheme(url.scheme().to_owned()))?;
        if !matches!(url.path(), "" | "/") {
            return Err(EndpointParseError::UnexpectedPath(input.to_owned()));
        }
        let host = url
            .host_str()
            .ok_or_else(|| EndpointParseError::MissingHost(input.to_owned()))?
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_owned();
        let port = url.port().unwrap_or_else(|| scheme.default_port());
        Ok(Self { scheme, host, port })
    }
}

impl TryFrom<String> for BackendEndpoint {
    type Error = EndpointParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BackendEndpoint> for String {
    fn from(endpoint: BackendEndpoint) -> Self {
        endpoint.to_string()
    }
}

/// Errors encountered while parsing a [`BackendEndpoint`] from text.
#[derive(Debug, Error)]
pub enum EndpointParseError {
    /// Scheme was neither `http` nor `https`.
    #[error("unsupported backend scheme '{0}'")]
    UnsupportedScheme(String),
    /// Host name was missing.
    #[error("missing backend host in '{0}'")]
    MissingHost(String),
    /// The URL carried a path; endpoints are appended per request.
    #[error("backend address '{0}' must not include a path")]
    UnexpectedPath(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}
