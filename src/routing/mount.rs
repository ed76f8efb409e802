//! Mount points and upstream URL construction.
//!
//! # Design Decisions
//! - Prefix matching respects segment boundaries (`/api` does not match `/api-proxy`)
//! - Path matching is case-sensitive
//! - Query pairs are appended in arrival order; repeated keys are kept

use url::Url;

use crate::config::MountConfig;

/// A compiled mount point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    prefix: String,
    api_base: String,
}

impl Mount {
    pub fn new(prefix: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            api_base: api_base.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Returns true if `path` is the prefix itself or lies beneath it.
    pub fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Remove the mount prefix from `path`.
    ///
    /// A path outside the mount is returned unchanged.
    pub fn strip<'a>(&self, path: &'a str) -> &'a str {
        path.strip_prefix(self.prefix.as_str()).unwrap_or(path)
    }

    /// Build `<origin><api_base><sub_path>` and append every query pair.
    ///
    /// The joined string is parsed as a WHATWG URL, so dot segments are
    /// resolved: `/../x` under an `/api` base reaches `/x` on the origin.
    /// The origin itself can never change.
    pub fn upstream_url(
        &self,
        origin: &str,
        sub_path: &str,
        query: &[(String, String)],
    ) -> Result<Url, url::ParseError> {
        let target = format!(
            "{}{}{}",
            origin.trim_end_matches('/'),
            self.api_base,
            sub_path
        );
        let mut url = Url::parse(&target)?;

        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }
}

impl From<&MountConfig> for Mount {
    fn from(config: &MountConfig) -> Self {
        Self::new(config.prefix.clone(), config.api_base.clone())
    }
}
