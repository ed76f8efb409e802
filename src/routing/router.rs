//! Mount table: selects the mount that owns a request path.

use crate::config::MountConfig;
use crate::routing::mount::Mount;

/// Compiled, immutable set of mounts.
#[derive(Debug, Clone, Default)]
pub struct MountTable {
    /// Sorted by prefix length, longest first.
    mounts: Vec<Mount>,
}

impl MountTable {
    /// Compile a mount table from configuration.
    pub fn from_config(configs: &[MountConfig]) -> Self {
        let mut mounts: Vec<Mount> = configs.iter().map(Mount::from).collect();
        mounts.sort_by(|a, b| b.prefix().len().cmp(&a.prefix().len()));
        Self { mounts }
    }

    /// Find the mount that owns `path`. Longest prefix wins.
    pub fn match_path(&self, path: &str) -> Option<&Mount> {
        self.mounts.iter().find(|mount| mount.matches(path))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount(prefix: &str, api_base: &str) -> MountConfig {
        MountConfig {
            prefix: prefix.into(),
            api_base: api_base.into(),
        }
    }

    #[test]
    fn test_longest_prefix_wins() {
        let table = MountTable::from_config(&[mount("/fn", "/api"), mount("/fn/legacy", "")]);

        let m = table.match_path("/fn/legacy/search").unwrap();
        assert_eq!(m.prefix(), "/fn/legacy");

        let m = table.match_path("/fn/search").unwrap();
        assert_eq!(m.prefix(), "/fn");
    }

    #[test]
    fn test_default_netlify_mounts() {
        let config = crate::config::ProxyConfig::default();
        let table = MountTable::from_config(&config.mounts);
        assert_eq!(table.len(), 2);

        let m = table
            .match_path("/.netlify/functions/api-proxy/api/search")
            .unwrap();
        assert_eq!(m.api_base(), "");

        let m = table.match_path("/.netlify/functions/api/search").unwrap();
        assert_eq!(m.api_base(), "/api");
    }

    #[test]
    fn test_no_match() {
        let table = MountTable::from_config(&[mount("/fn", "/api")]);
        assert!(table.match_path("/").is_none());
        assert!(table.match_path("/function").is_none());
        assert!(MountTable::default().is_empty());
    }
}
