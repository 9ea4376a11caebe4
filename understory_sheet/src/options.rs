// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sheet configuration and the marker attribute contract.

use alloc::format;
use alloc::string::{String, ToString};
use core::fmt;
use core::str::FromStr;

/// Default name of the attribute that marks style containers owned by a sheet.
///
/// Its value is the whitespace-separated list of rule names injected into the
/// container.
pub const DEFAULT_ATTR: &str = "data-styled";

/// Value written to the marker attribute of a freshly created, still empty container.
pub const ACTIVE_VALUE: &str = "active";

/// Prefix of the comment markers that open each group block in serialized CSS.
pub const GROUP_MARKER_PREFIX: &str = "sc-component-id";

/// Version written to the version attribute of every container.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// How rules reach a live style container.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum InsertMode {
    /// Rules are inserted one at a time through the container's rule API.
    #[default]
    Cssom,
    /// The container's text content is rewritten to hold every rule.
    Text,
}

impl InsertMode {
    /// Returns the attribute value for this mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cssom => "cssom",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for InsertMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`InsertMode`] attribute value.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown insertion mode `{0}`")]
pub struct UnknownInsertMode(pub String);

impl FromStr for InsertMode {
    type Err = UnknownInsertMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "cssom" => Ok(Self::Cssom),
            "text" => Ok(Self::Text),
            other => Err(UnknownInsertMode(other.to_string())),
        }
    }
}

/// Configuration for a [`Sheet`](crate::Sheet).
///
/// ```rust
/// use understory_sheet::SheetOptions;
///
/// let options = SheetOptions::server().with_nonce("abc123");
/// assert!(options.is_server);
/// assert_eq!(options.version_attr(), "data-styled-version");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SheetOptions {
    /// Store rules in memory and never touch a live container.
    pub is_server: bool,
    /// Prefer the per-rule insertion fast path when the container supports it.
    pub use_cssom: bool,
    /// Name of the marker attribute.
    pub attr: String,
    /// Optional CSP nonce copied onto created containers and style tags.
    pub nonce: Option<String>,
}

impl Default for SheetOptions {
    fn default() -> Self {
        Self {
            is_server: false,
            use_cssom: true,
            attr: DEFAULT_ATTR.to_string(),
            nonce: None,
        }
    }
}

impl SheetOptions {
    /// Options for a server-rendering sheet.
    #[must_use]
    pub fn server() -> Self {
        Self {
            is_server: true,
            ..Self::default()
        }
    }

    /// Reads overrides from the process environment.
    ///
    /// `SC_ATTR` replaces the marker attribute name. `SC_DISABLE_SPEEDY` set to
    /// `true` or `1` turns off the per-rule insertion fast path.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`SheetOptions::from_env`], with a custom variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();
        if let Some(attr) = lookup("SC_ATTR").filter(|a| !a.trim().is_empty()) {
            options.attr = attr.trim().to_string();
        }
        if let Some(flag) = lookup("SC_DISABLE_SPEEDY") {
            let flag = flag.trim();
            if flag.eq_ignore_ascii_case("true") || flag == "1" {
                options.use_cssom = false;
            }
        }
        options
    }

    /// Sets [`SheetOptions::is_server`].
    #[must_use]
    pub fn with_server(mut self, is_server: bool) -> Self {
        self.is_server = is_server;
        self
    }

    /// Sets [`SheetOptions::use_cssom`].
    #[must_use]
    pub fn with_cssom(mut self, use_cssom: bool) -> Self {
        self.use_cssom = use_cssom;
        self
    }

    /// Sets [`SheetOptions::attr`].
    #[must_use]
    pub fn with_attr(mut self, attr: impl Into<String>) -> Self {
        self.attr = attr.into();
        self
    }

    /// Sets [`SheetOptions::nonce`].
    #[must_use]
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Name of the attribute recording the producing crate version.
    #[must_use]
    pub fn version_attr(&self) -> String {
        format!("{}-version", self.attr)
    }

    /// Name of the attribute recording the [`InsertMode`].
    #[must_use]
    pub fn mode_attr(&self) -> String {
        format!("{}-mode", self.attr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_overrides_attr_and_speedy() {
        let options = SheetOptions::from_lookup(|key| match key {
            "SC_ATTR" => Some("data-app-css".into()),
            "SC_DISABLE_SPEEDY" => Some("TRUE".into()),
            _ => None,
        });
        assert_eq!(options.attr, "data-app-css");
        assert!(!options.use_cssom);
        assert_eq!(options.mode_attr(), "data-app-css-mode");
    }

    #[test]
    fn blank_attr_is_ignored() {
        let options = SheetOptions::from_lookup(|key| (key == "SC_ATTR").then(|| "  ".into()));
        assert_eq!(options.attr, DEFAULT_ATTR);
        assert!(options.use_cssom);
    }

    #[test]
    fn insert_mode_parses_attribute_values() {
        assert_eq!("text".parse::<InsertMode>(), Ok(InsertMode::Text));
        assert_eq!(" cssom ".parse::<InsertMode>(), Ok(InsertMode::Cssom));
        assert!("speedy".parse::<InsertMode>().is_err());
    }
}
