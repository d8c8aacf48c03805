use crate::traits::PlacesLookup;
use crate::types::{GeoPoint, NotifierError, Place, PlaceCategory, PlacesConfig, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct NearbyResponse {
    status: String,
    #[serde(default)]
    results: Vec<RawPlace>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPlace {
    place_id: String,
    name: String,
    #[serde(default)]
    vicinity: String,
    geometry: RawGeometry,
}

#[derive(Debug, Deserialize)]
struct RawGeometry {
    location: GeoPoint,
}

impl RawPlace {
    fn into_place(self, category: PlaceCategory) -> Place {
        Place {
            id: self.place_id,
            name: self.name,
            vicinity: self.vicinity,
            coordinates: self.geometry.location,
            category,
        }
    }
}

/// Nearby search against a Google Places compatible endpoint.
pub struct PlacesClient {
    client: Client,
    config: PlacesConfig,
}

impl PlacesClient {
    pub fn new(config: PlacesConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn radius_m(&self) -> u32 {
        self.config.radius_m
    }

    pub async fn search(&self, at: GeoPoint, radius_m: u32, category: PlaceCategory) -> Result<Vec<Place>> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| NotifierError::Config("GOOGLE_MAPS_API_KEY is not set".to_string()))?;

        let mut url = self.config.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("location", &at.to_string())
            .append_pair("radius", &radius_m.to_string())
            .append_pair("type", category.search_type())
            .append_pair("key", api_key);

        debug!("Searching {} within {}m of {}", category.search_type(), radius_m, at);
        let response: NearbyResponse = self.client.get(url).send().await?.json().await?;

        match response.status.as_str() {
            "OK" => {
                let places: Vec<Place> = response
                    .results
                    .into_iter()
                    .map(|raw| raw.into_place(category))
                    .collect();
                info!("Found {} {} places near {}", places.len(), category, at);
                Ok(places)
            }
            "ZERO_RESULTS" => {
                debug!("No {} places near {}", category, at);
                Ok(Vec::new())
            }
            other => {
                warn!(
                    "Places API returned {}: {}",
                    other,
                    response.error_message.as_deref().unwrap_or("no message")
                );
                Err(NotifierError::PlacesStatus {
                    status: other.to_string(),
                })
            }
        }
    }
}

#[async_trait]
impl PlacesLookup for PlacesClient {
    async fn nearby(&self, at: GeoPoint, radius_m: u32, category: PlaceCategory) -> Result<Vec<Place>> {
        self.search(at, radius_m, category).await
    }
}
