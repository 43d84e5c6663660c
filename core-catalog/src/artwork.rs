//! Content-style artwork URI mapping.
//!
//! Remote artwork is republished under a host-owned `content://` authority so
//! that notification and lock-screen surfaces load it through the host's
//! cache. The resolver remembers every mapping it hands out; the serving side
//! calls [`ContentArtworkResolver::original_uri`] to find what to fetch.
//!
//! ```
//! use bridge_traits::ArtworkResolver;
//! use core_catalog::artwork::ContentArtworkResolver;
//!
//! let resolver = ContentArtworkResolver::new("com.example.mplayer");
//! let mapped = resolver.map_uri("https://cdn.example.com/art/cover.jpg");
//!
//! assert_eq!(mapped, "content://com.example.mplayer/cdn.example.com:art:cover.jpg");
//! assert_eq!(
//!     resolver.original_uri(&mapped).as_deref(),
//!     Some("https://cdn.example.com/art/cover.jpg")
//! );
//! ```

use bridge_traits::ArtworkResolver;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::trace;
use url::Url;

pub const CONTENT_SCHEME: &str = "content";

#[derive(Debug)]
pub struct ContentArtworkResolver {
    authority: String,
    mappings: RwLock<HashMap<String, String>>,
}

impl ContentArtworkResolver {
    pub fn new(authority: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            mappings: RwLock::new(HashMap::new()),
        }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Original URI behind a previously mapped content URI.
    pub fn original_uri(&self, content_uri: &str) -> Option<String> {
        self.mappings.read().get(content_uri).cloned()
    }

    pub fn mapping_count(&self) -> usize {
        self.mappings.read().len()
    }

    fn content_uri_for(&self, uri: &Url) -> Option<String> {
        let host = uri.host_str()?;
        let path = uri.path().trim_start_matches('/');
        if path.is_empty() {
            return None;
        }

        Some(format!(
            "{}://{}/{}:{}",
            CONTENT_SCHEME,
            self.authority,
            host,
            path.replace('/', ":")
        ))
    }
}

impl ArtworkResolver for ContentArtworkResolver {
    /// Maps network URIs; anything without a host and path passes through.
    fn map_uri(&self, uri: &str) -> String {
        let Some(content_uri) = Url::parse(uri)
            .ok()
            .filter(|parsed| parsed.scheme() != CONTENT_SCHEME)
            .and_then(|parsed| self.content_uri_for(&parsed))
        else {
            return uri.to_string();
        };

        trace!(content_uri = %content_uri, "Mapped artwork URI");
        self.mappings
            .write()
            .insert(content_uri.clone(), uri.to_string());
        content_uri
    }
}
