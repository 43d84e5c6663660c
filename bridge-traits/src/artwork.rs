//! Artwork resolution abstraction.
//!
//! Catalog descriptors point at artwork over HTTP. Hosts usually want to serve
//! artwork from their own cache or content provider, so the catalog loader maps
//! every image URI through an [`ArtworkResolver`] and keeps the original URI
//! under [`ORIGINAL_ARTWORK_URI_KEY`] in the item's extras.

/// Extras key holding the artwork URI as declared by the catalog.
pub const ORIGINAL_ARTWORK_URI_KEY: &str = "mplayer.catalog.JSON_ARTWORK_URI";

/// Maps a source-declared image URI to the URI playback surfaces should use.
pub trait ArtworkResolver: Send + Sync {
    fn map_uri(&self, uri: &str) -> String;
}

/// Resolver that returns the declared URI unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughArtworkResolver;

impl ArtworkResolver for PassthroughArtworkResolver {
    fn map_uri(&self, uri: &str) -> String {
        uri.to_string()
    }
}
