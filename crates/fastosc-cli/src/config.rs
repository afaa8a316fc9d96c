//! Configuration file support
//!
//! ```toml
//! [dispatcher]
//! name = "studio"
//! base_address = "/live"
//! wildcard = "prefix"
//!
//! [server]
//! bind_addr = "0.0.0.0:11000"
//!
//! [router]
//! namespace = "/app"
//!
//! [params]
//! volume = 0.8
//! ```

use anyhow::{Context, Result};
use fastosc_router::DispatcherConfig;
use fastosc_transport::UdpServerConfig;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dispatcher: DispatcherConfig,
    pub server: UdpServerConfig,
    pub router: RouterSection,
    /// Initial parameter values
    pub params: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RouterSection {
    pub namespace: String,
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            namespace: "/app".to_string(),
        }
    }
}

impl Config {
    /// Load from a file, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::parse(&text).with_context(|| format!("Invalid config file {}", path.display()))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Apply command-line overrides
    pub fn with_overrides(
        mut self,
        bind: Option<String>,
        port: Option<u16>,
        base: Option<String>,
        namespace: Option<String>,
    ) -> Self {
        if bind.is_some() || port.is_some() {
            let (current_host, current_port) = split_host_port(&self.server.bind_addr);
            let host = bind.unwrap_or(current_host);
            let port = port.unwrap_or(current_port);
            self.server.bind_addr = format!("{}:{}", host, port);
        }
        if let Some(base) = base {
            self.dispatcher.base_address = base;
        }
        if let Some(namespace) = namespace {
            self.router.namespace = namespace;
        }
        self
    }
}

fn split_host_port(addr: &str) -> (String, u16) {
    match addr.rsplit_once(':') {
        Some((host, port)) => (
            host.to_string(),
            port.parse().unwrap_or(fastosc_core::DEFAULT_PORT),
        ),
        None => (addr.to_string(), fastosc_core::DEFAULT_PORT),
    }
}
