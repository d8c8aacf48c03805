pub mod types;
pub mod config;
pub mod traits;
pub mod api_client;
pub mod validation;
pub mod level;
pub mod selector;
pub mod poller;
pub mod sources;

pub use types::*;
pub use config::AppConfig;
pub use api_client::ApiClient;
pub use validation::Credentials;
pub use level::LevelProgress;
pub use selector::{NotificationSelector, RotationState, Selection};
pub use poller::{PermissionKind, PollPhase, Poller, TickOutcome};
pub use sources::{CachedCatalog, FixedLocation, LogDispatcher, PlacesClient};
pub use interfaces::SessionStore;
