//! Provider abstractions for location services.
//!
//! Networking is out of scope for the core; the application injects
//! implementations of these traits. Futures returned by providers are
//! cancelled by dropping them.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use super::types::{
    AuthorizationStatus, DirectionsRequest, PlaceDescription, Route, SearchRequest,
    SearchResponse,
};
use crate::geo::GeoCoordinate;

/// Boxed future returned by provider traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors reported by providers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Transport-level failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The provider has nothing for this request.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request was rejected as malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The provider is not available (offline, throttled, unsupported).
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// Computes routes between two coordinates.
pub trait DirectionsProvider: Send + Sync {
    /// Candidate routes, best first. Empty when no route exists.
    fn compute_routes(&self, request: DirectionsRequest)
        -> BoxFuture<'_, Result<Vec<Route>, ProviderError>>;
}

/// Resolves coordinates to place descriptions.
pub trait GeocodingProvider: Send + Sync {
    /// Candidate places, best first.
    fn reverse_geocode(
        &self,
        coordinate: GeoCoordinate,
    ) -> BoxFuture<'_, Result<Vec<PlaceDescription>, ProviderError>>;
}

/// Free-text place search.
pub trait PlaceSearchProvider: Send + Sync {
    fn search(&self, request: SearchRequest) -> BoxFuture<'_, Result<SearchResponse, ProviderError>>;
}

/// Device location subsystem.
pub trait LocationSource: Send + Sync {
    /// Current permission state.
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Ask the user for permission. The answer arrives later through
    /// `LocationServiceManager::on_authorization_changed`.
    fn request_authorization(&self);

    /// Start location and heading updates.
    fn start_updates(&self);

    /// Stop location and heading updates.
    fn stop_updates(&self);
}

/// Provider that has no backend. Every request fails with
/// [`ProviderError::Unavailable`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableProvider;

impl UnavailableProvider {
    fn fail<T: Send + 'static>(what: &'static str) -> BoxFuture<'static, Result<T, ProviderError>> {
        Box::pin(async move { Err(ProviderError::Unavailable(format!("no {} backend", what))) })
    }
}

impl DirectionsProvider for UnavailableProvider {
    fn compute_routes(
        &self,
        _request: DirectionsRequest,
    ) -> BoxFuture<'_, Result<Vec<Route>, ProviderError>> {
        Self::fail("directions")
    }
}

impl GeocodingProvider for UnavailableProvider {
    fn reverse_geocode(
        &self,
        _coordinate: GeoCoordinate,
    ) -> BoxFuture<'_, Result<Vec<PlaceDescription>, ProviderError>> {
        Self::fail("geocoding")
    }
}

impl PlaceSearchProvider for UnavailableProvider {
    fn search(&self, _request: SearchRequest) -> BoxFuture<'_, Result<SearchResponse, ProviderError>> {
        Self::fail("search")
    }
}
