//! Middleware configuration.
//!
//! Loadable from JSON (`useHeaders`, `headerNames`); unknown keys are
//! ignored and missing keys take their defaults. The id factory can only be
//! set in code.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use http::HeaderName;
use reqctx_core::{REQUEST_ID_KEY, SESSION_ID_KEY, ids};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::headers::HeaderSource;

/// Synthesizes an identifier for a request whose header is missing.
pub type RequestIdFactory = Arc<dyn Fn(&dyn HeaderSource) -> String + Send + Sync>;

#[derive(Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MiddlewareConfig {
    /// Populate the store from request headers instead of leaving it empty
    pub use_headers: bool,
    /// Store key → header field name
    pub header_names: BTreeMap<String, String>,
    /// Called once per store key whose header is absent
    #[serde(skip, default = "default_request_id_factory")]
    pub request_id_factory: RequestIdFactory,
}

fn default_request_id_factory() -> RequestIdFactory {
    Arc::new(|_: &dyn HeaderSource| ids::uuid_v4())
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        let header_names = [
            (REQUEST_ID_KEY.to_string(), "X-Request-Id".to_string()),
            (SESSION_ID_KEY.to_string(), "X-Session-Id".to_string()),
        ]
        .into_iter()
        .collect();

        Self {
            use_headers: false,
            header_names,
            request_id_factory: default_request_id_factory(),
        }
    }
}

impl MiddlewareConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Check that every configured header is a legal HTTP field name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, header) in &self.header_names {
            if HeaderName::from_bytes(header.as_bytes()).is_err() {
                return Err(ConfigError::InvalidHeaderName {
                    key: key.clone(),
                    header: header.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn with_headers(mut self, use_headers: bool) -> Self {
        self.use_headers = use_headers;
        self
    }

    /// Replace the whole key → header mapping.
    pub fn with_header_names<I, K, V>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.header_names = names
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn with_header_name(mut self, key: impl Into<String>, header: impl Into<String>) -> Self {
        self.header_names.insert(key.into(), header.into());
        self
    }

    pub fn with_request_id_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&dyn HeaderSource) -> String + Send + Sync + 'static,
    {
        self.request_id_factory = Arc::new(factory);
        self
    }
}

impl fmt::Debug for MiddlewareConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareConfig")
            .field("use_headers", &self.use_headers)
            .field("header_names", &self.header_names)
            .finish_non_exhaustive()
    }
}
