use serde::{Deserialize, Serialize};
use url::Url;
// Shared wire and domain types live in the interfaces crate
pub use interfaces::defs::{
    GeoPoint, NotificationData, NotificationRequest, PermissionStatus, Place, PlaceCategory, TriviaItem, UserLevel,
    UserOut, UserVote, Vote, VotePayload, VoteStats,
};

pub const DEFAULT_PLACES_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/place/nearbysearch/json";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub user_agent: String,
    pub timeout_seconds: u64,
}

impl ApiConfig {
    /// Build a config for `base_url`, making sure relative joins land under it.
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let mut config = Self::default();
        config.base_url = normalize_base_url(base_url)?;
        Ok(config)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://127.0.0.1:8008/").expect("static default url"),
            user_agent: "Manners-Notifier/1.0".to_string(),
            timeout_seconds: 30,
        }
    }
}

pub(crate) fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[derive(Debug, Clone)]
pub struct PlacesConfig {
    pub endpoint: Url,
    pub api_key: Option<String>,
    pub radius_m: u32,
    pub timeout_seconds: u64,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_PLACES_ENDPOINT).expect("static default url"),
            api_key: None,
            radius_m: 2000,
            timeout_seconds: 15,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval_seconds: u64,
    pub rng_seed: Option<u64>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 120,
            rng_seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Walk the category list in order, one step per matched tick.
    Rotation,
    /// Pick any category present in the current places.
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StarvationPolicy {
    FallbackToAny,
    SkipTick,
}

#[derive(Debug, Clone)]
pub struct SelectorConfig {
    pub categories: Vec<PlaceCategory>,
    pub mode: SelectionMode,
    pub starvation: StarvationPolicy,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            categories: PlaceCategory::ALL.to_vec(),
            mode: SelectionMode::Rotation,
            starvation: StarvationPolicy::FallbackToAny,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Network,
    Permission,
    Config,
    Session,
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {detail}")]
    Api { status: u16, detail: String },

    #[error("Places API error: {status}")]
    PlacesStatus { status: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{what} permission denied")]
    PermissionDenied { what: String },

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session store error: {0}")]
    Session(#[from] anyhow::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

impl NotifierError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NotifierError::Validation(_) => ErrorKind::Validation,
            NotifierError::Http(_) | NotifierError::Api { .. } | NotifierError::PlacesStatus { .. } => {
                ErrorKind::Network
            }
            NotifierError::PermissionDenied { .. } => ErrorKind::Permission,
            NotifierError::InvalidUrl(_) | NotifierError::Config(_) => ErrorKind::Config,
            NotifierError::NotLoggedIn | NotifierError::Session(_) => ErrorKind::Session,
            NotifierError::Serialization(_) | NotifierError::General(_) => ErrorKind::Internal,
        }
    }

    /// Message suitable for showing to the user. Network failures are kept generic.
    pub fn user_message(&self) -> String {
        match self {
            NotifierError::Validation(message) => message.clone(),
            NotifierError::Api { detail, .. } => detail.clone(),
            NotifierError::Http(_) | NotifierError::PlacesStatus { .. } => {
                "Could not reach the server. Please try again later.".to_string()
            }
            NotifierError::PermissionDenied { what } => {
                format!("{} permission is required. Allow it in your settings.", what)
            }
            NotifierError::NotLoggedIn => "Please log in first.".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NotifierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = ApiConfig::with_base_url("http://10.0.0.2:8008/api").unwrap();
        assert_eq!(config.base_url.as_str(), "http://10.0.0.2:8008/api/");
        assert_eq!(config.base_url.join("vote/").unwrap().as_str(), "http://10.0.0.2:8008/api/vote/");
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(NotifierError::Validation("x".into()).kind(), ErrorKind::Validation);
        assert_eq!(NotifierError::Api { status: 500, detail: "boom".into() }.kind(), ErrorKind::Network);
        assert_eq!(NotifierError::PermissionDenied { what: "Location".into() }.kind(), ErrorKind::Permission);
    }

    #[test]
    fn test_api_detail_is_shown_to_user() {
        let err = NotifierError::Api { status: 401, detail: "Invalid credentials".into() };
        assert_eq!(err.user_message(), "Invalid credentials");
    }
}
