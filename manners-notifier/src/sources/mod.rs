pub mod fixed_location;
pub mod log_dispatcher;
pub mod places_api;
pub mod trivia_cache;

pub use fixed_location::FixedLocation;
pub use log_dispatcher::LogDispatcher;
pub use places_api::PlacesClient;
pub use trivia_cache::CachedCatalog;
