use crate::types::{GeoPoint, NotificationRequest, PermissionStatus, Place, PlaceCategory, Result, TriviaItem};
use async_trait::async_trait;

/// Source of the device position
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn request_permission(&self) -> Result<PermissionStatus>;

    async fn current_position(&self) -> Result<GeoPoint>;
}

/// Nearby points of interest lookup
#[async_trait]
pub trait PlacesLookup: Send + Sync {
    /// Places of `category` within `radius_m` metres of `at`. An empty result is not an error.
    async fn nearby(&self, at: GeoPoint, radius_m: u32, category: PlaceCategory) -> Result<Vec<Place>>;
}

/// Provider of the trivia catalog
#[async_trait]
pub trait TriviaSource: Send + Sync {
    async fn catalog(&self) -> Result<Vec<TriviaItem>>;
}

/// Local notification sink
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn request_permission(&self) -> Result<PermissionStatus>;

    /// Show `request` immediately.
    async fn dispatch(&self, request: &NotificationRequest) -> Result<()>;
}
