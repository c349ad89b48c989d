//! Location services.
//!
//! [`LocationServiceManager`] wraps the device location subsystem and three
//! injected providers (directions, reverse geocoding, place search). Every
//! request is dispatched onto an [`Executor`] and completes through a
//! one-shot callback.
//!
//! # Guarantees
//!
//! - Reverse-geocode answers are cached by quantized coordinate; a cache hit
//!   never reaches the provider.
//! - At most one place search is in flight. Starting a new one cancels the
//!   previous search, whose callback is then never invoked.
//! - Provider failures are delivered to the callback; nothing is retried.

mod cache;
mod executor;
mod manager;
mod provider;
mod types;

pub use cache::{CacheStats, LocationCache};
pub use executor::{Executor, InlineExecutor, TokioExecutor};
pub use manager::{
    LocationConfig, LocationEvent, LocationServiceManager, DEFAULT_LOCATION_EVENT_CAPACITY,
};
pub use provider::{
    BoxFuture, DirectionsProvider, GeocodingProvider, LocationSource, PlaceSearchProvider,
    ProviderError, UnavailableProvider,
};
pub use types::{
    AuthorizationStatus, CoordinateRegion, CoordinateSpan, DirectionsRequest, Heading,
    LocationFix, MapItem, PlaceDescription, Route, RouteStep, SearchRequest, SearchResponse,
    TransportType, DEFAULT_SEARCH_SPAN_DEG,
};
