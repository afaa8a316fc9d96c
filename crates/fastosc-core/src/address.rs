//! Address normalization and wildcard patterns
//!
//! Addresses are slash-delimited paths:
//! ```text
//! /live/song/get/tempo
//! /live/track/start_listen/volume
//! ```
//!
//! Inbound addresses may contain `*`, which stands for a run of one or
//! more non-slash characters:
//! ```text
//! /live/song/get/*   ->  ^/live/song/get/[^/]+
//! ```

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Ensure exactly one leading separator is present. Idempotent.
pub fn normalize(address: &str) -> String {
    if address.starts_with('/') {
        address.to_string()
    } else {
        format!("/{}", address)
    }
}

/// Normalize an address used as a prefix (base address, namespace).
///
/// The root prefix (`""` or `"/"`) becomes empty so that joining it adds
/// nothing; trailing separators are dropped.
pub fn prefix(address: &str) -> String {
    let trimmed = address.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        normalize(trimmed)
    }
}

/// Join a prefix and an address
pub fn join(base: &str, address: &str) -> String {
    format!("{}{}", prefix(base), normalize(address))
}

/// Whether an address contains a wildcard
pub fn is_pattern(address: &str) -> bool {
    address.contains('*')
}

/// How a wildcard pattern is anchored against registered addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WildcardMatch {
    /// Anchored at the start only: `/a/*` also matches `/a/b/c`
    #[default]
    Prefix,
    /// The whole address must match
    Full,
}

/// A compiled wildcard pattern
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    source: String,
    mode: WildcardMatch,
    regex: regex_lite::Regex,
}

impl WildcardPattern {
    pub fn compile(pattern: &str, mode: WildcardMatch) -> Result<Self> {
        let body = pattern
            .split('*')
            .map(regex_lite::escape)
            .collect::<Vec<_>>()
            .join("[^/]+");
        let regex_str = match mode {
            WildcardMatch::Prefix => format!("^{}", body),
            WildcardMatch::Full => format!("^{}$", body),
        };
        let regex = regex_lite::Regex::new(&regex_str).map_err(|e| Error::InvalidPattern(e.to_string()))?;

        Ok(Self {
            source: pattern.to_string(),
            mode,
            regex,
        })
    }

    pub fn matches(&self, address: &str) -> bool {
        self.regex.is_match(address)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn mode(&self) -> WildcardMatch {
        self.mode
    }
}
