//! The set of `(scheme, host, port)` locations a server answers for.
//!
//! Requests are only accepted when the location they name is registered here. One location is
//! the primary one; it stands in for requests that do not name a host at all (HTTP/1.0).
//!
//! The table is read on every request and written rarely, so it lives behind an [`ArcSwap`]
//! and every mutation publishes a fresh copy.

use std::collections::HashMap;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::protocol::IdentityError;
use crate::utils::ensure;

/// `hostname` or `IPv4address` from RFC 2396.
static HOST_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)*[a-z](?:[a-z0-9-]*[a-z0-9])?|\d+\.\d+\.\d+\.\d+)$")
        .expect("host regex is valid")
});

const LOOPBACK: &str = "127.0.0.1";

/// Returns true if `host` is a syntactically valid host name or dotted IPv4 address.
pub fn is_valid_host(host: &str) -> bool {
    HOST_REGEX.is_match(host)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

impl Display for Scheme {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("http") {
            Ok(Scheme::Http)
        } else if s.eq_ignore_ascii_case("https") {
            Ok(Scheme::Https)
        } else {
            Err(IdentityError::InvalidScheme { scheme: s.to_string() })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
}

impl Location {
    fn new(scheme: Scheme, host: &str, port: u16) -> Self {
        Self { scheme, host: host.to_string(), port }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Plain state behind [`ServerIdentity`].
#[derive(Debug, Clone, Default)]
struct Locations {
    entries: HashMap<(String, u16), Scheme>,
    primary: Option<Location>,
    /// Port the server is bound to; unset while stopped or tearing down.
    default_port: Option<u16>,
    bind_host: Option<String>,
}

impl Locations {
    fn add(&mut self, scheme: Scheme, host: &str, port: u16) {
        self.entries.insert((host.to_string(), port), scheme);
    }

    fn has(&self, scheme: Scheme, host: &str, port: u16) -> bool {
        self.entries.get(&(host.to_string(), port)) == Some(&scheme)
    }

    fn remove(&mut self, scheme: Scheme, host: &str, port: u16) -> bool {
        if !self.has(scheme, host, port) {
            return false;
        }
        self.entries.remove(&(host.to_string(), port));

        let was_primary = self.primary.as_ref().is_some_and(|p| p.scheme == scheme && p.host == host && p.port == port);
        if was_primary {
            self.primary = None;
            // fall back to the location the server is bound to
            if let (Some(default_port), Some(bind_host)) = (self.default_port, self.bind_host.clone()) {
                debug!(host = %bind_host, port = default_port, "primary location removed, promoting bind location");
                self.set_primary(Scheme::Http, &bind_host, default_port);
            }
        }
        true
    }

    fn set_primary(&mut self, scheme: Scheme, host: &str, port: u16) {
        self.add(scheme, host, port);
        self.primary = Some(Location::new(scheme, host, port));
    }
}

#[derive(Debug, Default)]
pub struct ServerIdentity {
    state: ArcSwap<Locations>,
}

impl ServerIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, scheme: Scheme, host: &str, port: u16) -> Result<(), IdentityError> {
        let host = validate_host(host)?;
        self.update(|locations| locations.add(scheme, &host, port));
        Ok(())
    }

    /// Removes a location, returning whether it was registered.
    ///
    /// Removing the primary location promotes the location the server is bound to, unless
    /// the server is not running.
    pub fn remove(&self, scheme: Scheme, host: &str, port: u16) -> Result<bool, IdentityError> {
        let host = validate_host(host)?;
        Ok(self.update(|locations| locations.remove(scheme, &host, port)))
    }

    pub fn has(&self, scheme: Scheme, host: &str, port: u16) -> Result<bool, IdentityError> {
        let host = validate_host(host)?;
        Ok(self.state.load().has(scheme, &host, port))
    }

    /// Returns the scheme registered for `host:port`, if any.
    pub fn get_scheme(&self, host: &str, port: u16) -> Result<Option<Scheme>, IdentityError> {
        let host = validate_host(host)?;
        Ok(self.state.load().entries.get(&(host, port)).copied())
    }

    /// Registers a location and makes it the primary one.
    pub fn set_primary(&self, scheme: Scheme, host: &str, port: u16) -> Result<(), IdentityError> {
        let host = validate_host(host)?;
        self.update(|locations| locations.set_primary(scheme, &host, port));
        Ok(())
    }

    pub fn primary(&self) -> Option<Location> {
        self.state.load().primary.clone()
    }

    /// Registers the location a freshly started server is bound to.
    ///
    /// The bind location becomes primary unless one was set beforehand, and `127.0.0.1` on the
    /// same port is always accepted.
    pub fn initialize(&self, host: &str, port: u16) -> Result<(), IdentityError> {
        let host = validate_host(host)?;
        self.update(|locations| {
            locations.bind_host = Some(host.clone());
            if locations.primary.is_some() {
                locations.add(Scheme::Http, &host, port);
            } else {
                locations.set_primary(Scheme::Http, &host, port);
            }
            locations.default_port = Some(port);
            if host != LOOPBACK {
                locations.add(Scheme::Http, LOOPBACK, port);
            }
        });
        Ok(())
    }

    /// Drops the locations registered by [`ServerIdentity::initialize`].
    ///
    /// Locations added by hand survive, so the identity is ready for the next start.
    pub fn teardown(&self) {
        self.update(|locations| {
            let (Some(port), Some(host)) = (locations.default_port.take(), locations.bind_host.take()) else {
                return;
            };
            if host != LOOPBACK {
                locations.remove(Scheme::Http, LOOPBACK, port);
            }
            locations.remove(Scheme::Http, &host, port);
        });
    }

    fn update<R>(&self, mut f: impl FnMut(&mut Locations) -> R) -> R {
        loop {
            let current = self.state.load_full();
            let mut next = Locations::clone(&current);
            let result = f(&mut next);

            let previous = self.state.compare_and_swap(&current, Arc::new(next));
            if Arc::ptr_eq(&*previous, &current) {
                return result;
            }
        }
    }
}

fn validate_host(host: &str) -> Result<String, IdentityError> {
    ensure!(is_valid_host(host), IdentityError::InvalidHost { host: host.to_string() });
    Ok(host.to_ascii_lowercase())
}
