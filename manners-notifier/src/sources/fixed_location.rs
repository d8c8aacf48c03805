use crate::traits::LocationProvider;
use crate::types::{GeoPoint, NotifierError, PermissionStatus, Result};
use async_trait::async_trait;
use tracing::warn;

/// Position taken from configuration. With no coordinates configured the
/// provider behaves like a device where location access was refused.
pub struct FixedLocation {
    position: Option<GeoPoint>,
}

impl FixedLocation {
    pub fn new(position: Option<GeoPoint>) -> Self {
        Self { position }
    }
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn request_permission(&self) -> Result<PermissionStatus> {
        if self.position.is_some() {
            Ok(PermissionStatus::Granted)
        } else {
            warn!("No position configured, set LATITUDE and LONGITUDE or pass --lat/--lng");
            Ok(PermissionStatus::Denied)
        }
    }

    async fn current_position(&self) -> Result<GeoPoint> {
        self.position.ok_or_else(|| NotifierError::PermissionDenied {
            what: "Location".to_string(),
        })
    }
}
