//! Location service manager.
//!
//! Owns authorization handling, the latest fix and heading, the
//! reverse-geocode cache and the single in-flight place search.
//!
//! # Request Dispatch
//!
//! ```text
//! request_directions ──► executor ──► provider ──► callback(first route)
//! request_place ──► cache hit? ──yes──► callback (caller's thread)
//!                      │no
//!                      └──► executor ──► provider ──► cache ──► callback
//! search_places ──► cancel previous ──► executor ──► select(cancel, provider)
//!                                                    └──► callback if still current
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::cache::LocationCache;
use super::executor::Executor;
use super::provider::{
    DirectionsProvider, GeocodingProvider, LocationSource, PlaceSearchProvider, ProviderError,
    UnavailableProvider,
};
use super::types::{
    AuthorizationStatus, CoordinateRegion, CoordinateSpan, DirectionsRequest, Heading,
    LocationFix, PlaceDescription, Route, SearchRequest, SearchResponse, TransportType,
    DEFAULT_SEARCH_SPAN_DEG,
};
use crate::geo::{GeoCoordinate, DEFAULT_KEY_PRECISION};

/// Default capacity of the location event channel.
pub const DEFAULT_LOCATION_EVENT_CAPACITY: usize = 64;

/// Location manager settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationConfig {
    /// Decimal places kept in reverse-geocode cache keys.
    pub cache_precision: u8,
    /// Search region span around the user's location, in degrees.
    pub search_span_deg: f64,
    /// Capacity of the event channel.
    pub event_capacity: usize,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            cache_precision: DEFAULT_KEY_PRECISION,
            search_span_deg: DEFAULT_SEARCH_SPAN_DEG,
            event_capacity: DEFAULT_LOCATION_EVENT_CAPACITY,
        }
    }
}

/// Notifications published by the manager.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    /// New fixes arrived, oldest first.
    LocationsUpdated(Vec<LocationFix>),
    /// A valid compass reading arrived.
    HeadingUpdated(Heading),
    /// The location subsystem reported an error.
    Failed(String),
    /// Updates cannot run with this permission state.
    NoAuthorization(AuthorizationStatus),
}

struct SearchHandle {
    id: u64,
    token: CancellationToken,
}

/// Location services with injected providers and executor.
pub struct LocationServiceManager {
    source: Arc<dyn LocationSource>,
    directions: Arc<dyn DirectionsProvider>,
    geocoder: Arc<dyn GeocodingProvider>,
    places: Arc<dyn PlaceSearchProvider>,
    executor: Arc<dyn Executor>,
    cache: Arc<LocationCache>,
    current_search: Arc<Mutex<Option<SearchHandle>>>,
    search_seq: AtomicU64,
    last_fix: RwLock<Option<LocationFix>>,
    last_heading: RwLock<Option<Heading>>,
    last_authorization: Mutex<Option<AuthorizationStatus>>,
    events: broadcast::Sender<LocationEvent>,
    config: LocationConfig,
}

impl std::fmt::Debug for LocationServiceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationServiceManager")
            .field("cache", &self.cache.stats())
            .field("searching", &self.is_searching())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LocationServiceManager {
    /// Create a manager. Providers default to [`UnavailableProvider`] until
    /// set with the `with_*` builders.
    pub fn new(
        source: Arc<dyn LocationSource>,
        executor: Arc<dyn Executor>,
        config: LocationConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            source,
            directions: Arc::new(UnavailableProvider),
            geocoder: Arc::new(UnavailableProvider),
            places: Arc::new(UnavailableProvider),
            executor,
            cache: Arc::new(LocationCache::new(config.cache_precision)),
            current_search: Arc::new(Mutex::new(None)),
            search_seq: AtomicU64::new(0),
            last_fix: RwLock::new(None),
            last_heading: RwLock::new(None),
            last_authorization: Mutex::new(None),
            events,
            config,
        }
    }

    pub fn with_directions(mut self, provider: Arc<dyn DirectionsProvider>) -> Self {
        self.directions = provider;
        self
    }

    pub fn with_geocoder(mut self, provider: Arc<dyn GeocodingProvider>) -> Self {
        self.geocoder = provider;
        self
    }

    pub fn with_place_search(mut self, provider: Arc<dyn PlaceSearchProvider>) -> Self {
        self.places = provider;
        self
    }

    /// Subscribe to location events.
    pub fn subscribe(&self) -> broadcast::Receiver<LocationEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: LocationEvent) {
        let _ = self.events.send(event);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Authorization and updates
    // ─────────────────────────────────────────────────────────────────────────

    /// Start updates if permitted, ask for permission if undecided, report
    /// otherwise.
    pub fn launch_updating(&self) {
        let status = self.source.authorization_status();
        *self.last_authorization.lock() = Some(status);

        match status {
            AuthorizationStatus::Authorized => {
                tracing::info!("Starting location and heading updates");
                self.source.start_updates();
            }
            AuthorizationStatus::NotDetermined => {
                tracing::info!("Requesting location authorization");
                self.source.request_authorization();
            }
            AuthorizationStatus::Denied | AuthorizationStatus::Restricted => {
                tracing::warn!(%status, "Location updates not authorized");
                self.publish(LocationEvent::NoAuthorization(status));
            }
        }
    }

    /// Permission state changed.
    ///
    /// `NoAuthorization` is published once per change into a denied or
    /// restricted state.
    pub fn on_authorization_changed(&self, status: AuthorizationStatus) {
        let previous = self.last_authorization.lock().replace(status);

        if status.is_authorized() {
            tracing::info!("Location authorized, starting updates");
            self.source.start_updates();
            return;
        }

        self.source.stop_updates();
        let changed = previous != Some(status);
        if changed
            && matches!(
                status,
                AuthorizationStatus::Denied | AuthorizationStatus::Restricted
            )
        {
            tracing::warn!(%status, "Location authorization revoked");
            self.publish(LocationEvent::NoAuthorization(status));
        }
    }

    /// New fixes from the location subsystem. Empty batches are ignored.
    pub fn on_locations(&self, fixes: &[LocationFix]) {
        let Some(latest) = fixes.last() else {
            return;
        };
        *self.last_fix.write() = Some(*latest);
        tracing::trace!(coordinate = %latest.coordinate, count = fixes.len(), "Location update");
        self.publish(LocationEvent::LocationsUpdated(fixes.to_vec()));
    }

    /// New compass reading. Readings with negative accuracy are dropped.
    pub fn on_heading(&self, heading: Heading) {
        if !heading.is_valid() {
            tracing::trace!(accuracy = heading.accuracy, "Dropping invalid heading");
            return;
        }
        *self.last_heading.write() = Some(heading);
        self.publish(LocationEvent::HeadingUpdated(heading));
    }

    /// Error from the location subsystem.
    pub fn on_error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(error = %message, "Location subsystem error");
        self.publish(LocationEvent::Failed(message));
    }

    /// Most recent fix.
    pub fn current_location(&self) -> Option<LocationFix> {
        *self.last_fix.read()
    }

    /// Coordinate of the most recent fix.
    pub fn current_coordinate(&self) -> Option<GeoCoordinate> {
        self.current_location().map(|fix| fix.coordinate)
    }

    /// Most recent valid heading.
    pub fn current_heading(&self) -> Option<Heading> {
        *self.last_heading.read()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Requests
    // ─────────────────────────────────────────────────────────────────────────

    /// Compute directions; the callback gets the provider's first route.
    pub fn request_directions<F>(
        &self,
        source: GeoCoordinate,
        destination: GeoCoordinate,
        transport: TransportType,
        callback: F,
    ) where
        F: FnOnce(Result<Option<Route>, ProviderError>) + Send + 'static,
    {
        let provider = Arc::clone(&self.directions);
        let request = DirectionsRequest {
            source,
            destination,
            transport,
        };
        tracing::debug!(from = %source, to = %destination, %transport, "Requesting directions");

        self.executor.spawn(Box::pin(async move {
            let result = provider
                .compute_routes(request)
                .await
                .map(|routes| routes.into_iter().next());
            if let Err(e) = &result {
                tracing::debug!(error = %e, "Directions request failed");
            }
            callback(result);
        }));
    }

    /// Reverse-geocode a coordinate.
    ///
    /// A cache hit calls back immediately on the caller's thread without
    /// touching the provider. Otherwise the first place the provider returns
    /// is cached before the callback runs. An out-of-range or non-finite
    /// coordinate is rejected with [`ProviderError::InvalidRequest`].
    pub fn request_place<F>(&self, coordinate: GeoCoordinate, callback: F)
    where
        F: FnOnce(Result<Option<PlaceDescription>, ProviderError>) + Send + 'static,
    {
        if !coordinate.is_valid() {
            tracing::debug!(%coordinate, "Rejecting reverse geocode for invalid coordinate");
            callback(Err(ProviderError::InvalidRequest(format!(
                "invalid coordinate {}",
                coordinate
            ))));
            return;
        }

        if let Some(place) = self.cache.get(&coordinate) {
            tracing::trace!(%coordinate, "Reverse geocode cache hit");
            callback(Ok(Some(place)));
            return;
        }

        let provider = Arc::clone(&self.geocoder);
        let cache = Arc::clone(&self.cache);
        tracing::debug!(%coordinate, "Reverse geocode cache miss");

        self.executor.spawn(Box::pin(async move {
            let result = provider
                .reverse_geocode(coordinate)
                .await
                .map(|places| places.into_iter().next());
            if let Ok(Some(place)) = &result {
                cache.insert(&coordinate, place.clone());
            }
            callback(result);
        }));
    }

    /// Search for places matching `query`, biased towards `near`.
    ///
    /// Starting a search cancels the one in flight; a cancelled search never
    /// calls back.
    pub fn search_places<F>(&self, query: impl Into<String>, near: Option<GeoCoordinate>, callback: F)
    where
        F: FnOnce(Result<SearchResponse, ProviderError>) + Send + 'static,
    {
        let span = CoordinateSpan::square(self.config.search_span_deg);
        let request = SearchRequest {
            query: query.into(),
            region: near.map(|center| CoordinateRegion::new(center, span)),
        };

        let id = self.search_seq.fetch_add(1, Ordering::Relaxed) + 1;
        let token = CancellationToken::new();
        {
            let mut current = self.current_search.lock();
            let previous = current.replace(SearchHandle {
                id,
                token: token.clone(),
            });
            if let Some(previous) = previous {
                tracing::debug!(cancelled = previous.id, replaced_by = id, "Cancelling place search");
                previous.token.cancel();
            }
        }

        let provider = Arc::clone(&self.places);
        let slot = Arc::clone(&self.current_search);
        tracing::debug!(search = id, query = %request.query, "Starting place search");

        self.executor.spawn(Box::pin(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                result = provider.search(request) => Some(result),
            };

            let still_current = {
                let mut current = slot.lock();
                match current.as_ref() {
                    Some(handle) if handle.id == id => {
                        *current = None;
                        true
                    }
                    _ => false,
                }
            };

            match outcome {
                Some(result) if still_current => callback(result),
                _ => tracing::trace!(search = id, "Place search cancelled"),
            }
        }));
    }

    /// Cancel the in-flight search. Returns whether one was running.
    pub fn cancel_search(&self) -> bool {
        match self.current_search.lock().take() {
            Some(handle) => {
                tracing::debug!(search = handle.id, "Place search cancelled by caller");
                handle.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a search is in flight.
    pub fn is_searching(&self) -> bool {
        self.current_search.lock().is_some()
    }

    /// Reverse-geocode cache.
    pub fn cache(&self) -> &LocationCache {
        &self.cache
    }

    pub fn config(&self) -> &LocationConfig {
        &self.config
    }
}
