//! Tile service access.
//!
//! This module covers everything between a tile index and the encoded bytes
//! of that tile: the HTTP client seam, single-tile fetching with retry and
//! payload validation, and the catalog of available services.

mod fetcher;
mod http;
mod services;
mod types;

pub use fetcher::{
    tile_url, FetchConfig, TileFetcher, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BASE_DELAY_MS,
    DEFAULT_TIMEOUT_SECS,
};
pub use http::{AsyncHttpClient, AsyncReqwestClient, DEFAULT_USER_AGENT};
pub use services::{
    select_service, ServiceCatalog, ServiceConfig, ServiceConfigError, ServiceEntry,
    BUILTIN_CATALOG, CATALOG_KEY,
};
pub use types::ProviderError;

#[cfg(test)]
pub(crate) use http::tests::MockHttpClient;
