use crate::types::{
    normalize_base_url, ApiConfig, GeoPoint, NotifierError, PlaceCategory, PlacesConfig, PollConfig, Result,
    SelectionMode, SelectorConfig, StarvationPolicy,
};
use std::env;
use std::str::FromStr;
use url::Url;

pub const DEFAULT_SESSION_DB: &str = "sqlite://manners-session.db";

/// Everything the binary needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub places: PlacesConfig,
    pub poll: PollConfig,
    pub selector: SelectorConfig,
    pub location: Option<GeoPoint>,
    pub session_db: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            places: PlacesConfig::default(),
            poll: PollConfig::default(),
            selector: SelectorConfig::default(),
            location: None,
            session_db: DEFAULT_SESSION_DB.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolve configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = AppConfig::default();

        if let Some(base) = get("API_BASE_URL") {
            config.api.base_url = normalize_base_url(&base)?;
        } else if get("API_HOST").is_some() || get("API_PORT").is_some() {
            let host = get("API_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
            let port: u16 = parse_var("API_PORT", get("API_PORT"))?.unwrap_or(8008);
            config.api.base_url = normalize_base_url(&format!("http://{}:{}", host, port))?;
        }
        if let Some(timeout) = parse_var("API_TIMEOUT_SECS", get("API_TIMEOUT_SECS"))? {
            config.api.timeout_seconds = timeout;
        }

        config.places.api_key = get("GOOGLE_MAPS_API_KEY");
        if let Some(endpoint) = get("PLACES_ENDPOINT") {
            config.places.endpoint = Url::parse(&endpoint)?;
        }
        if let Some(radius) = parse_var("PLACES_RADIUS_M", get("PLACES_RADIUS_M"))? {
            config.places.radius_m = radius;
        }

        if let Some(interval) = parse_var("POLL_INTERVAL_SECS", get("POLL_INTERVAL_SECS"))? {
            config.poll.interval_seconds = interval;
        }
        config.poll.rng_seed = parse_var("RNG_SEED", get("RNG_SEED"))?;

        if let Some(mode) = get("SELECTION_MODE") {
            config.selector.mode = parse_mode(&mode)?;
        }
        if let Some(policy) = get("STARVATION_POLICY") {
            config.selector.starvation = parse_starvation(&policy)?;
        }
        if let Some(categories) = get("CATEGORIES") {
            config.selector.categories = parse_categories(&categories)?;
        }

        let lat: Option<f64> = parse_var("LATITUDE", get("LATITUDE"))?;
        let lng: Option<f64> = parse_var("LONGITUDE", get("LONGITUDE"))?;
        config.location = match (lat, lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            (None, None) => None,
            _ => {
                return Err(NotifierError::Config(
                    "LATITUDE and LONGITUDE must be set together".to_string(),
                ))
            }
        };

        if let Some(db) = get("SESSION_DB") {
            config.session_db = db;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll.interval_seconds == 0 {
            return Err(NotifierError::Config("poll interval must be at least one second".to_string()));
        }
        if self.places.radius_m == 0 {
            return Err(NotifierError::Config("places radius must be positive".to_string()));
        }
        if self.selector.categories.is_empty() {
            return Err(NotifierError::Config("at least one category must be tracked".to_string()));
        }
        if let Some(point) = self.location {
            if !(-90.0..=90.0).contains(&point.lat) || !(-180.0..=180.0).contains(&point.lng) {
                return Err(NotifierError::Config(format!("coordinates out of range: {}", point)));
            }
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, value: Option<String>) -> Result<Option<T>> {
    match value {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| NotifierError::Config(format!("{} has an invalid value: {}", key, raw))),
    }
}

pub fn parse_mode(value: &str) -> Result<SelectionMode> {
    match value.to_ascii_lowercase().as_str() {
        "rotation" | "rotate" => Ok(SelectionMode::Rotation),
        "random" => Ok(SelectionMode::Random),
        other => Err(NotifierError::Config(format!("unknown selection mode: {}", other))),
    }
}

pub fn parse_starvation(value: &str) -> Result<StarvationPolicy> {
    match value.to_ascii_lowercase().as_str() {
        "fallback" | "fallback_to_any" => Ok(StarvationPolicy::FallbackToAny),
        "skip" | "skip_tick" => Ok(StarvationPolicy::SkipTick),
        other => Err(NotifierError::Config(format!("unknown starvation policy: {}", other))),
    }
}

/// Parse a comma separated category list, keeping the first occurrence of each.
pub fn parse_categories(value: &str) -> Result<Vec<PlaceCategory>> {
    let mut categories = Vec::new();
    for raw in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let category = PlaceCategory::parse(raw)
            .ok_or_else(|| NotifierError::Config(format!("unknown category: {}", raw)))?;
        if !categories.contains(&category) {
            categories.push(category);
        }
    }
    Ok(categories)
}
