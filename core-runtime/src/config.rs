//! # Core Configuration Module
//!
//! Provides configuration management for the player core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! holding every bridge and setting the core needs. Validation is fail-fast:
//! a missing engine connector or a malformed catalog URI is reported by
//! `build()`, never discovered later at runtime.
//!
//! ## Required
//!
//! - `catalog_uri` - absolute URI of the JSON catalog descriptor
//! - `session_token` - identity of the playback engine to connect to
//! - `SessionConnector` - host bridge that opens the engine connection
//!
//! ## Optional (with defaults)
//!
//! - `HttpClient` - catalog fetches (desktop default: reqwest)
//! - `ArtworkResolver` - artwork URI mapping (default: pass-through)
//! - `browse_page_size` - children page size (default: 100)
//! - `event_buffer_size` - engine event queue depth (default: 64)
//! - `event_bus_capacity` - lifecycle event buffer (default: 100)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use bridge_traits::SessionToken;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .catalog_uri("https://storage.example.com/music/catalog.json")
//!     .session_token(SessionToken::new("music-service"))
//!     .session_connector(Arc::new(MyConnector))
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::CoreConfig;
//!
//! // Missing session connector and token
//! let config = CoreConfig::builder()
//!     .catalog_uri("https://example.com/catalog.json")
//!     .build()
//!     .expect("Should fail - missing required bridges");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    ArtworkResolver, HttpClient, PassthroughArtworkResolver, SessionConnector, SessionToken,
};
use std::sync::Arc;
use url::Url;

/// Default number of children requested per browse page.
pub const DEFAULT_BROWSE_PAGE_SIZE: u32 = 100;

/// Upper bound for `browse_page_size`.
pub const MAX_BROWSE_PAGE_SIZE: u32 = 1000;

/// Default depth of the engine-event queue feeding the listener task.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 64;

/// Core configuration for the player core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Parsed, absolute URI of the catalog descriptor.
    pub catalog_uri: Url,

    /// Engine identity handed to the connector.
    pub session_token: SessionToken,

    /// Opens the engine connection (required).
    pub session_connector: Arc<dyn SessionConnector>,

    /// HTTP client for catalog fetches.
    pub http_client: Arc<dyn HttpClient>,

    /// Maps catalog artwork URIs to host-servable URIs.
    pub artwork_resolver: Arc<dyn ArtworkResolver>,

    pub browse_page_size: u32,

    pub event_buffer_size: usize,

    pub event_bus_capacity: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("catalog_uri", &self.catalog_uri.as_str())
            .field("session_token", &self.session_token)
            .field("session_connector", &"SessionConnector { ... }")
            .field("http_client", &"HttpClient { ... }")
            .field("artwork_resolver", &"ArtworkResolver { ... }")
            .field("browse_page_size", &self.browse_page_size)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("event_bus_capacity", &self.event_bus_capacity)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates numeric settings.
    ///
    /// This checks:
    /// - Browse page size is within 1..=1000
    /// - Event queue depth is non-zero
    /// - Event bus capacity is non-zero
    pub fn validate(&self) -> Result<()> {
        if self.browse_page_size == 0 || self.browse_page_size > MAX_BROWSE_PAGE_SIZE {
            return Err(Error::Config(format!(
                "Browse page size must be between 1 and {}",
                MAX_BROWSE_PAGE_SIZE
            )));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if self.event_bus_capacity == 0 {
            return Err(Error::Config(
                "Event bus capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parses a catalog URI, requiring an absolute URI with a non-empty path.
pub fn parse_catalog_uri(raw: &str) -> Result<Url> {
    let uri = Url::parse(raw).map_err(|e| Error::InvalidUri {
        uri: raw.to_string(),
        message: e.to_string(),
    })?;

    if uri.cannot_be_a_base() {
        return Err(Error::InvalidUri {
            uri: raw.to_string(),
            message: "catalog URI must be hierarchical".to_string(),
        });
    }

    Ok(uri)
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new().map_err(|e| Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: format!("Failed to create the default reqwest client: {}", e),
    })?;
    let client: Arc<dyn HttpClient> = Arc::new(client);
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to fetch the catalog. \
                 Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
                 Mobile/embedded: inject the platform HTTP stack."
            .to_string(),
    })
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    catalog_uri: Option<String>,
    session_token: Option<SessionToken>,
    session_connector: Option<Arc<dyn SessionConnector>>,
    http_client: Option<Arc<dyn HttpClient>>,
    artwork_resolver: Option<Arc<dyn ArtworkResolver>>,
    browse_page_size: Option<u32>,
    event_buffer_size: Option<usize>,
    event_bus_capacity: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the catalog descriptor URI.
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder()
    ///     .catalog_uri("https://example.com/music/catalog.json");
    /// ```
    pub fn catalog_uri(mut self, uri: impl Into<String>) -> Self {
        self.catalog_uri = Some(uri.into());
        self
    }

    /// Sets the identity of the playback engine.
    pub fn session_token(mut self, token: SessionToken) -> Self {
        self.session_token = Some(token);
        self
    }

    /// Sets the engine connector (required).
    pub fn session_connector(mut self, connector: Arc<dyn SessionConnector>) -> Self {
        self.session_connector = Some(connector);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the reqwest-based client is used when the
    /// `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn artwork_resolver(mut self, resolver: Arc<dyn ArtworkResolver>) -> Self {
        self.artwork_resolver = Some(resolver);
        self
    }

    /// Sets the page size used when browsing children.
    ///
    /// Default: 100
    pub fn browse_page_size(mut self, size: u32) -> Self {
        self.browse_page_size = Some(size);
        self
    }

    /// Sets the depth of the engine event queue.
    ///
    /// Default: 64
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the lifecycle event bus capacity.
    ///
    /// Default: 100
    pub fn event_bus_capacity(mut self, capacity: usize) -> Self {
        self.event_bus_capacity = Some(capacity);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Returns an error if a required field or bridge is missing, the catalog
    /// URI does not parse, or a numeric setting is out of range.
    pub fn build(self) -> Result<CoreConfig> {
        let raw_uri = self.catalog_uri.ok_or_else(|| {
            Error::Config("Catalog URI is required. Use .catalog_uri() to set it.".to_string())
        })?;
        let catalog_uri = parse_catalog_uri(&raw_uri)?;

        let session_token = self.session_token.ok_or_else(|| {
            Error::Config(
                "Session token is required. Use .session_token() to identify the engine."
                    .to_string(),
            )
        })?;

        let session_connector = self.session_connector.ok_or_else(|| Error::CapabilityMissing {
            capability: "SessionConnector".to_string(),
            message: "SessionConnector implementation is required to reach the playback engine. \
                     Inject the host's engine bridge via .session_connector()."
                .to_string(),
        })?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let artwork_resolver = self
            .artwork_resolver
            .unwrap_or_else(|| Arc::new(PassthroughArtworkResolver));

        let config = CoreConfig {
            catalog_uri,
            session_token,
            session_connector,
            http_client,
            artwork_resolver,
            browse_page_size: self.browse_page_size.unwrap_or(DEFAULT_BROWSE_PAGE_SIZE),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            event_bus_capacity: self
                .event_bus_capacity
                .unwrap_or(crate::events::DEFAULT_EVENT_BUS_CAPACITY),
        };

        config.validate()?;

        Ok(config)
    }
}
