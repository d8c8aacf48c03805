use crate::selector::{NotificationSelector, RotationState};
use crate::traits::{LocationProvider, NotificationDispatcher, PlacesLookup, TriviaSource};
use crate::types::{NotificationRequest, NotifierError, Place};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, warn};

const MIN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Idle,
    PermissionCheck,
    Locating,
    FetchingPlaces,
    Selecting,
    Notifying,
}

impl fmt::Display for PollPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PollPhase::Idle => "idle",
            PollPhase::PermissionCheck => "permission check",
            PollPhase::Locating => "locating",
            PollPhase::FetchingPlaces => "fetching places",
            PollPhase::Selecting => "selecting",
            PollPhase::Notifying => "notifying",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionKind {
    Location,
    Notifications,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Notified(NotificationRequest),
    NothingToNotify,
    PermissionDenied(PermissionKind),
    Aborted { phase: PollPhase, reason: String },
    /// Another tick was already running; this trigger was dropped.
    Skipped,
}

struct SelectionCursor {
    rotation: RotationState,
    rng: StdRng,
}

/// Clears the busy flag when the tick that set it finishes, however it finishes.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Location driven polling loop. One tick runs at a time; overlapping
/// triggers are dropped.
pub struct Poller {
    location: Arc<dyn LocationProvider>,
    places: Arc<dyn PlacesLookup>,
    trivia: Arc<dyn TriviaSource>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    selector: NotificationSelector,
    radius_m: u32,
    interval: Duration,
    cursor: Mutex<SelectionCursor>,
    phase: RwLock<PollPhase>,
    busy: AtomicBool,
    notifications_allowed: AtomicBool,
    denial_reported: AtomicBool,
}

impl Poller {
    pub fn new(
        location: Arc<dyn LocationProvider>,
        places: Arc<dyn PlacesLookup>,
        trivia: Arc<dyn TriviaSource>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        selector: NotificationSelector,
    ) -> Self {
        Self {
            location,
            places,
            trivia,
            dispatcher,
            selector,
            radius_m: 2000,
            interval: Duration::from_secs(120),
            cursor: Mutex::new(SelectionCursor {
                rotation: RotationState::new(),
                rng: StdRng::from_entropy(),
            }),
            phase: RwLock::new(PollPhase::Idle),
            busy: AtomicBool::new(false),
            notifications_allowed: AtomicBool::new(false),
            denial_reported: AtomicBool::new(false),
        }
    }

    /// Time between timer ticks. Anything below one second is raised to one second.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        if interval < MIN_INTERVAL {
            warn!("Poll interval {:?} too short, using {:?}", interval, MIN_INTERVAL);
        }
        self.interval = interval.max(MIN_INTERVAL);
        self
    }

    pub fn with_radius(mut self, radius_m: u32) -> Self {
        self.radius_m = radius_m;
        self
    }

    /// Make selection reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.cursor.get_mut().rng = StdRng::seed_from_u64(seed);
        self
    }

    pub async fn rotation_state(&self) -> RotationState {
        self.cursor.lock().await.rotation
    }

    pub async fn phase(&self) -> PollPhase {
        *self.phase.read().await
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Ask for notification permission, remembering a grant. A denial is warned
    /// about once and asked again on later ticks.
    pub async fn ensure_notification_permission(&self) -> bool {
        if self.notifications_allowed.load(Ordering::Acquire) {
            return true;
        }
        match self.dispatcher.request_permission().await {
            Ok(status) if status.is_granted() => {
                self.notifications_allowed.store(true, Ordering::Release);
                true
            }
            Ok(_) => {
                if !self.denial_reported.swap(true, Ordering::AcqRel) {
                    warn!("Notification permission denied, allow notifications to receive alerts");
                } else {
                    debug!("Notification permission still denied");
                }
                false
            }
            Err(e) => {
                warn!("Notification permission request failed: {}", e);
                false
            }
        }
    }

    /// Run one polling cycle unless one is already in flight.
    pub async fn tick(&self) -> TickOutcome {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            debug!("Poll already in progress, dropping trigger");
            return TickOutcome::Skipped;
        };

        let outcome = self.run_cycle().await;
        self.set_phase(PollPhase::Idle).await;

        match &outcome {
            TickOutcome::Notified(request) => info!("Poll finished, notified: {}", request.title),
            TickOutcome::NothingToNotify => info!("Poll finished, nothing to notify"),
            TickOutcome::PermissionDenied(kind) => warn!("Poll stopped, {:?} permission denied", kind),
            TickOutcome::Aborted { phase, reason } => error!("Poll aborted while {}: {}", phase, reason),
            TickOutcome::Skipped => {}
        }
        outcome
    }

    /// User initiated refresh. Same single-flight rules as the timer.
    pub async fn refresh(&self) -> TickOutcome {
        info!("Manual refresh requested");
        self.tick().await
    }

    async fn run_cycle(&self) -> TickOutcome {
        self.set_phase(PollPhase::PermissionCheck).await;
        match self.location.request_permission().await {
            Ok(status) if status.is_granted() => {}
            Ok(_) => return TickOutcome::PermissionDenied(PermissionKind::Location),
            Err(e) => return Self::abort(PollPhase::PermissionCheck, e.to_string()),
        }

        self.set_phase(PollPhase::Locating).await;
        let position = match self.location.current_position().await {
            Ok(position) => position,
            Err(NotifierError::PermissionDenied { .. }) => {
                return TickOutcome::PermissionDenied(PermissionKind::Location)
            }
            Err(e) => return Self::abort(PollPhase::Locating, e.to_string()),
        };
        debug!("Current position: {}", position);

        self.set_phase(PollPhase::FetchingPlaces).await;
        let mut places: Vec<Place> = Vec::new();
        for category in self.selector.categories() {
            match self.places.nearby(position, self.radius_m, *category).await {
                Ok(found) => places.extend(found),
                Err(e) => {
                    return Self::abort(PollPhase::FetchingPlaces, format!("{} lookup failed: {}", category, e))
                }
            }
        }
        let catalog = match self.trivia.catalog().await {
            Ok(catalog) => catalog,
            Err(e) => return Self::abort(PollPhase::FetchingPlaces, format!("trivia catalog fetch failed: {}", e)),
        };

        self.set_phase(PollPhase::Selecting).await;
        let selection = {
            let mut cursor = self.cursor.lock().await;
            let SelectionCursor { rotation, rng } = &mut *cursor;
            let selection = self.selector.select(&places, &catalog, *rotation, rng);
            *rotation = selection.state;
            selection
        };
        debug!(
            "Selected target {:?} at {:?}, next category index {}",
            selection.target,
            selection.place.as_ref().map(|place| place.name.as_str()),
            selection.state.next_category_index()
        );

        let Some(request) = selection.notification else {
            return TickOutcome::NothingToNotify;
        };

        self.set_phase(PollPhase::Notifying).await;
        if !self.ensure_notification_permission().await {
            return TickOutcome::PermissionDenied(PermissionKind::Notifications);
        }
        match self.dispatcher.dispatch(&request).await {
            Ok(()) => TickOutcome::Notified(request),
            Err(e) => Self::abort(PollPhase::Notifying, e.to_string()),
        }
    }

    fn abort(phase: PollPhase, reason: String) -> TickOutcome {
        TickOutcome::Aborted { phase, reason }
    }

    async fn set_phase(&self, phase: PollPhase) {
        *self.phase.write().await = phase;
    }

    fn spawn_tick(self: &Arc<Self>, manual: bool) {
        let poller = Arc::clone(self);
        tokio::spawn(async move {
            if manual {
                poller.refresh().await;
            } else {
                poller.tick().await;
            }
        });
    }

    /// Poll on the configured interval until `shutdown` flips to true. Every
    /// message on `refresh` triggers an extra tick. The first tick fires
    /// immediately.
    pub async fn run(self: Arc<Self>, mut refresh: mpsc::Receiver<()>, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Starting poller: every {:?}, radius {}m, categories {:?}, mode {:?}",
            self.interval,
            self.radius_m,
            self.selector.categories(),
            self.selector.mode()
        );
        self.ensure_notification_permission().await;

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.spawn_tick(false),
                Some(()) = refresh.recv() => self.spawn_tick(true),
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Poller stopped");
    }
}
