//! Declarative transfer configuration.
//!
//! A [`TransferConfig`] captures the common options of a transfer as plain
//! data, so it can be built in code, loaded from JSON, and applied to any
//! number of handles.
//!
//! # Example
//! ```ignore
//! use curlnet::config::TransferConfig;
//!
//! let config = TransferConfig::builder("https://example.com/")
//!     .user_agent("curlnet/0.1")
//!     .timeout_ms(5_000)
//!     .header("Accept: application/json")
//!     .build()?;
//! config.apply(&mut handle)?;
//! ```

use crate::base::neterror::NetError;
use crate::easy::handle::TransferHandle;
use crate::easy::headerlist::HeaderList;
use crate::sys;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Options applied to a handle before a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Absolute URL to transfer.
    pub url: String,

    /// `User-Agent` header value.
    pub user_agent: Option<String>,

    /// Whole-transfer timeout in milliseconds.
    pub timeout_ms: Option<u64>,

    /// Connection phase timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,

    /// Follow `Location` redirects.
    pub follow_redirects: bool,

    /// Redirect limit when following redirects.
    pub max_redirects: Option<u32>,

    /// Engine debug output on stderr.
    pub verbose: bool,

    /// Verify the peer certificate and host name.
    pub verify_peer: bool,

    /// CA bundle replacing the resolved default.
    pub ca_bundle: Option<PathBuf>,

    /// Hosts that bypass any proxy, e.g. `"*"` or `"localhost,127.0.0.1"`.
    pub no_proxy: Option<String>,

    /// Extra request header lines, e.g. `"Accept: */*"`.
    pub headers: Vec<String>,

    /// Correlation tag reported on completion.
    pub tag: Option<u64>,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user_agent: None,
            timeout_ms: None,
            connect_timeout_ms: None,
            follow_redirects: false,
            max_redirects: None,
            verbose: false,
            verify_peer: true,
            ca_bundle: None,
            no_proxy: None,
            headers: Vec::new(),
            tag: None,
        }
    }
}

impl TransferConfig {
    pub fn builder(url: impl Into<String>) -> TransferConfigBuilder {
        TransferConfigBuilder::new(url)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, NetError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| NetError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, NetError> {
        serde_json::to_string_pretty(self).map_err(|e| NetError::InvalidConfig(e.to_string()))
    }

    /// Check the URL and header lines.
    pub fn validate(&self) -> Result<(), NetError> {
        let url = Url::parse(&self.url).map_err(|_| NetError::InvalidUrl)?;
        if url.cannot_be_a_base() {
            return Err(NetError::InvalidUrl);
        }
        if let Some(line) = self.headers.iter().find(|line| !line.contains(':')) {
            return Err(NetError::InvalidConfig(format!("malformed header line {:?}", line)));
        }
        if self.max_redirects.is_some() && !self.follow_redirects {
            return Err(NetError::InvalidConfig(
                "max_redirects requires follow_redirects".to_string(),
            ));
        }
        Ok(())
    }

    /// Set every configured option on `handle`.
    pub fn apply(&self, handle: &mut TransferHandle) -> Result<(), NetError> {
        handle.set_url(&self.url)?;
        if let Some(agent) = &self.user_agent {
            handle.set_string(sys::CURLOPT_USERAGENT, agent)?;
        }
        if let Some(ms) = self.timeout_ms {
            handle.set_long(sys::CURLOPT_TIMEOUT_MS, clamp_ms(ms))?;
        }
        if let Some(ms) = self.connect_timeout_ms {
            handle.set_long(sys::CURLOPT_CONNECTTIMEOUT_MS, clamp_ms(ms))?;
        }
        handle.set_long(sys::CURLOPT_FOLLOWLOCATION, i64::from(self.follow_redirects))?;
        if let Some(max) = self.max_redirects {
            handle.set_long(sys::CURLOPT_MAXREDIRS, i64::from(max))?;
        }
        handle.set_long(sys::CURLOPT_VERBOSE, i64::from(self.verbose))?;
        if !self.verify_peer {
            handle.set_long(sys::CURLOPT_SSL_VERIFYPEER, 0)?;
            handle.set_long(sys::CURLOPT_SSL_VERIFYHOST, 0)?;
        }
        if let Some(path) = &self.ca_bundle {
            let path = path.to_str().ok_or(NetError::InvalidPath)?;
            handle.set_string(sys::CURLOPT_CAINFO, path)?;
        }
        if let Some(hosts) = &self.no_proxy {
            handle.set_string(sys::CURLOPT_NOPROXY, hosts)?;
        }
        if !self.headers.is_empty() {
            let mut list = HeaderList::from_lines(&self.headers)?;
            handle.set_headers(&mut list)?;
        }
        if let Some(tag) = self.tag {
            handle.set_tag(tag)?;
        }
        tracing::trace!(url = %self.url, headers = self.headers.len(), "transfer config applied");
        Ok(())
    }
}

fn clamp_ms(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX)
}

/// Builder for [`TransferConfig`].
#[must_use]
#[derive(Debug, Clone)]
pub struct TransferConfigBuilder {
    config: TransferConfig,
}

impl TransferConfigBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            config: TransferConfig {
                url: url.into(),
                ..TransferConfig::default()
            },
        }
    }

    pub fn user_agent(mut self, agent: &str) -> Self {
        self.config.user_agent = Some(agent.to_string());
        self
    }

    pub fn timeout_ms(mut self, ms: u64) -> Self {
        self.config.timeout_ms = Some(ms);
        self
    }

    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = Some(ms);
        self
    }

    pub fn follow_redirects(mut self, max: Option<u32>) -> Self {
        self.config.follow_redirects = true;
        self.config.max_redirects = max;
        self
    }

    pub fn verbose(mut self, enabled: bool) -> Self {
        self.config.verbose = enabled;
        self
    }

    pub fn verify_peer(mut self, enabled: bool) -> Self {
        self.config.verify_peer = enabled;
        self
    }

    pub fn ca_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ca_bundle = Some(path.into());
        self
    }

    pub fn no_proxy(mut self, hosts: &str) -> Self {
        self.config.no_proxy = Some(hosts.to_string());
        self
    }

    pub fn header(mut self, line: &str) -> Self {
        self.config.headers.push(line.to_string());
        self
    }

    pub fn tag(mut self, tag: u64) -> Self {
        self.config.tag = Some(tag);
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<TransferConfig, NetError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = TransferConfig::builder("http://127.0.0.1:8080/").build().unwrap();
        assert!(config.verify_peer);
        assert!(!config.follow_redirects);
        assert!(config.headers.is_empty());
    }

    #[test]
    fn test_invalid_url_rejected() {
        let err = TransferConfig::builder("not a url").build().unwrap_err();
        assert_eq!(err, NetError::InvalidUrl);
        let err = TransferConfig::builder("mailto:someone@example.com").build().unwrap_err();
        assert_eq!(err, NetError::InvalidUrl);
    }

    #[test]
    fn test_malformed_header_rejected() {
        let err = TransferConfig::builder("http://127.0.0.1/")
            .header("no colon here")
            .build()
            .unwrap_err();
        assert!(matches!(err, NetError::InvalidConfig(_)));
    }

    #[test]
    fn test_json_round_trip() {
        let config = TransferConfig::builder("https://example.com/api")
            .user_agent("curlnet-test")
            .timeout_ms(2_500)
            .follow_redirects(Some(5))
            .header("Accept: application/json")
            .tag(42)
            .build()
            .unwrap();
        let json = config.to_json().unwrap();
        assert_eq!(TransferConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            TransferConfig::from_json(r#"{"url": "http://localhost/", "verbose": true}"#).unwrap();
        assert!(config.verbose);
        assert!(config.verify_peer);
        assert!(config.user_agent.is_none());

        let err = TransferConfig::from_json(r#"{"url": 5}"#).unwrap_err();
        assert!(matches!(err, NetError::InvalidConfig(_)));
    }

    #[test]
    fn test_apply_installs_owned_options() {
        let config = TransferConfig::builder("http://127.0.0.1:9/")
            .user_agent("curlnet-test")
            .no_proxy("*")
            .header("X-One: 1")
            .header("X-Two: 2")
            .tag(7)
            .build()
            .unwrap();
        let mut handle = TransferHandle::new().unwrap();
        config.apply(&mut handle).unwrap();

        let options = handle.options();
        assert_eq!(
            options.string(sys::CURLOPT_USERAGENT).unwrap().to_bytes(),
            b"curlnet-test"
        );
        assert_eq!(
            options.list_lines(sys::CURLOPT_HTTPHEADER),
            Some(vec!["X-One: 1".to_string(), "X-Two: 2".to_string()])
        );
        assert_eq!(handle.tag(), Some(7));
    }
}
