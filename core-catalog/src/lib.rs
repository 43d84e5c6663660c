//! # Catalog
//!
//! Turns a remote JSON descriptor into the canonical [`MediaItem`] catalog
//! that playback engines browse.
//!
//! - [`JsonSource`](json_source::JsonSource) fetches, normalizes and
//!   atomically publishes the catalog
//! - [`MusicSource`](source::MusicSource) exposes load state, readiness and
//!   case-insensitive search
//! - [`ContentArtworkResolver`](artwork::ContentArtworkResolver) maps artwork
//!   to host-servable URIs
//! - [`BrowseTree`](browse::BrowseTree) answers root/children/item lookups
//!
//! [`MediaItem`]: bridge_traits::MediaItem

pub mod artwork;
pub mod browse;
pub mod error;
pub mod json_source;
pub mod models;
pub mod source;

pub use artwork::ContentArtworkResolver;
pub use browse::BrowseTree;
pub use error::{CatalogError, Result};
pub use json_source::JsonSource;
pub use source::{MusicSource, SearchFocus, SourceState};
