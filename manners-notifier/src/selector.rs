use crate::types::{
    NotificationData, NotificationRequest, NotifierError, Place, PlaceCategory, Result, SelectionMode, SelectorConfig,
    StarvationPolicy, TriviaItem,
};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

/// Cursor into the tracked category list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RotationState {
    next_category_index: usize,
}

impl RotationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_category_index(&self) -> usize {
        self.next_category_index
    }

    fn normalized(self, category_count: usize) -> Self {
        Self {
            next_category_index: self.next_category_index % category_count,
        }
    }

    fn advanced(self, category_count: usize) -> Self {
        Self {
            next_category_index: (self.next_category_index + 1) % category_count,
        }
    }
}

/// Result of one selection pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub notification: Option<NotificationRequest>,
    pub state: RotationState,
    /// Category the pass aimed for, if any.
    pub target: Option<PlaceCategory>,
    /// Place the notification refers to, if one was chosen.
    pub place: Option<Place>,
}

impl Selection {
    fn nothing(state: RotationState, target: Option<PlaceCategory>) -> Self {
        Self {
            notification: None,
            state,
            target,
            place: None,
        }
    }
}

/// Decides which trivia fact, if any, to surface for the places around the user.
#[derive(Debug, Clone)]
pub struct NotificationSelector {
    config: SelectorConfig,
}

impl NotificationSelector {
    pub fn new(config: SelectorConfig) -> Result<Self> {
        if config.categories.is_empty() {
            return Err(NotifierError::Config("selector needs at least one category".to_string()));
        }
        Ok(Self { config })
    }

    pub fn categories(&self) -> &[PlaceCategory] {
        &self.config.categories
    }

    pub fn mode(&self) -> SelectionMode {
        self.config.mode
    }

    /// Pick at most one notification. Never fails: empty places, an empty catalog
    /// or a missing match all produce a selection without a notification.
    ///
    /// In rotation mode the returned state moves one step forward when a place of
    /// the targeted category was found, or when the skip policy passes over a
    /// missing category. Falling back to another place keeps the state. Random
    /// mode returns `state` as is.
    pub fn select<R: Rng + ?Sized>(
        &self,
        places: &[Place],
        catalog: &[TriviaItem],
        state: RotationState,
        rng: &mut R,
    ) -> Selection {
        let category_count = self.config.categories.len();
        let state = state.normalized(category_count);

        let target = match self.config.mode {
            SelectionMode::Rotation => self.config.categories[state.next_category_index],
            SelectionMode::Random => {
                let mut present: Vec<PlaceCategory> = Vec::new();
                for place in places {
                    if !present.contains(&place.category) {
                        present.push(place.category);
                    }
                }
                match present.choose(rng) {
                    Some(category) => *category,
                    None => {
                        debug!("No places nearby, nothing to select");
                        return Selection::nothing(state, None);
                    }
                }
            }
        };

        let candidates: Vec<&Place> = places.iter().filter(|place| place.category == target).collect();

        let (place, next_state) = match candidates.choose(rng) {
            Some(place) => {
                let next_state = match self.config.mode {
                    SelectionMode::Rotation => state.advanced(category_count),
                    SelectionMode::Random => state,
                };
                (*place, next_state)
            }
            None if places.is_empty() => {
                debug!("No places nearby while targeting {}", target);
                return Selection::nothing(state, Some(target));
            }
            None => match self.config.starvation {
                StarvationPolicy::FallbackToAny => match places.choose(rng) {
                    Some(place) => {
                        debug!("No {} nearby, falling back to {} ({})", target, place.name, place.category);
                        (place, state)
                    }
                    None => return Selection::nothing(state, Some(target)),
                },
                StarvationPolicy::SkipTick => {
                    debug!("No {} nearby, skipping this tick", target);
                    // Move past the missing category so it cannot stall the rotation
                    let next_state = match self.config.mode {
                        SelectionMode::Rotation => state.advanced(category_count),
                        SelectionMode::Random => state,
                    };
                    return Selection::nothing(next_state, Some(target));
                }
            },
        };

        let matched: Vec<&TriviaItem> = catalog.iter().filter(|item| item.is_tagged(place.category)).collect();
        let notification = matched.choose(rng).map(|item| NotificationRequest {
            title: format!("[{}] {}", place.category.label(), item.title),
            body: item.content.clone(),
            data: NotificationData { trivia_item_id: item.id },
        });

        if notification.is_none() {
            debug!("No trivia tagged {} in a catalog of {}", place.category.label(), catalog.len());
        }

        Selection {
            notification,
            state: next_state,
            target: Some(target),
            place: Some(place.clone()),
        }
    }
}
