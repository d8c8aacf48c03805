#![allow(dead_code)]

use async_trait::async_trait;
use manners_notifier::traits::{LocationProvider, NotificationDispatcher, PlacesLookup, TriviaSource};
use manners_notifier::{
    GeoPoint, NotificationRequest, NotifierError, PermissionStatus, Place, PlaceCategory, Result, TriviaItem,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

pub const TOKYO_STATION: GeoPoint = GeoPoint { lat: 35.681236, lng: 139.767125 };

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn place(id: &str, category: PlaceCategory) -> Place {
    Place {
        id: id.to_string(),
        name: format!("{} {}", category, id),
        vicinity: "1-9-1 Marunouchi".to_string(),
        coordinates: TOKYO_STATION,
        category,
    }
}

pub fn trivia(id: i64, title: &str, tags: &[&str]) -> TriviaItem {
    TriviaItem {
        id,
        title: title.to_string(),
        content: format!("{} (details)", title),
        categories: tags.iter().map(|tag| tag.to_string()).collect(),
        difficulty_level: 1,
    }
}

/// One trivia item per category, tagged with the category label.
pub fn full_catalog() -> Vec<TriviaItem> {
    vec![
        trivia(1, "Let passengers off first", &["station"]),
        trivia(2, "Separate your rubbish", &["convenience_store"]),
        trivia(3, "Keep dogs on a lead", &["park"]),
    ]
}

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_server(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub struct StaticLocation {
    pub permission: PermissionStatus,
    pub position: Option<GeoPoint>,
}

impl StaticLocation {
    pub fn granted() -> Self {
        Self {
            permission: PermissionStatus::Granted,
            position: Some(TOKYO_STATION),
        }
    }

    pub fn denied() -> Self {
        Self {
            permission: PermissionStatus::Denied,
            position: Some(TOKYO_STATION),
        }
    }

    /// Permission granted, but access is refused once a position is requested.
    pub fn revoked_on_read() -> Self {
        Self {
            permission: PermissionStatus::Granted,
            position: None,
        }
    }
}

#[async_trait]
impl LocationProvider for StaticLocation {
    async fn request_permission(&self) -> Result<PermissionStatus> {
        Ok(self.permission)
    }

    async fn current_position(&self) -> Result<GeoPoint> {
        self.position.ok_or_else(|| NotifierError::PermissionDenied {
            what: "Location".to_string(),
        })
    }
}

#[derive(Default)]
pub struct StaticPlaces {
    pub by_category: HashMap<PlaceCategory, Vec<Place>>,
    pub fail: bool,
    pub calls: AtomicUsize,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
    gate_used: AtomicBool,
}

impl StaticPlaces {
    pub fn new(places: Vec<Place>) -> Self {
        let mut by_category: HashMap<PlaceCategory, Vec<Place>> = HashMap::new();
        for place in places {
            by_category.entry(place.category).or_default().push(place);
        }
        Self {
            by_category,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// The first lookup signals `entered` and then waits for `release`.
    pub fn gated(mut self, entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        self.gate = Some((entered, release));
        self
    }
}

#[async_trait]
impl PlacesLookup for StaticPlaces {
    async fn nearby(&self, _at: GeoPoint, _radius_m: u32, category: PlaceCategory) -> Result<Vec<Place>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((entered, release)) = &self.gate {
            if !self.gate_used.swap(true, Ordering::SeqCst) {
                entered.notify_one();
                release.notified().await;
            }
        }
        if self.fail {
            return Err(NotifierError::PlacesStatus {
                status: "REQUEST_DENIED".to_string(),
            });
        }
        Ok(self.by_category.get(&category).cloned().unwrap_or_default())
    }
}

pub struct StaticCatalog {
    pub items: Vec<TriviaItem>,
    pub calls: AtomicUsize,
    pub failures_left: AtomicUsize,
}

impl StaticCatalog {
    pub fn new(items: Vec<TriviaItem>) -> Self {
        Self {
            items,
            calls: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(0),
        }
    }

    pub fn failing_first(items: Vec<TriviaItem>, failures: usize) -> Self {
        Self {
            items,
            calls: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(failures),
        }
    }
}

#[async_trait]
impl TriviaSource for StaticCatalog {
    async fn catalog(&self) -> Result<Vec<TriviaItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(NotifierError::Api {
                status: 503,
                detail: "catalog unavailable".to_string(),
            });
        }
        Ok(self.items.clone())
    }
}

pub struct RecordingDispatcher {
    pub permission: PermissionStatus,
    pub fail: bool,
    pub sent: Mutex<Vec<NotificationRequest>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self {
            permission: PermissionStatus::Granted,
            fail: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn denied() -> Self {
        Self {
            permission: PermissionStatus::Denied,
            ..Self::new()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub async fn sent(&self) -> Vec<NotificationRequest> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn request_permission(&self) -> Result<PermissionStatus> {
        Ok(self.permission)
    }

    async fn dispatch(&self, request: &NotificationRequest) -> Result<()> {
        if self.fail {
            return Err(NotifierError::General("notification service unavailable".to_string()));
        }
        self.sent.lock().await.push(request.clone());
        Ok(())
    }
}
