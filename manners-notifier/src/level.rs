use crate::types::UserLevel;

/// Recognized-difficulty points needed per level.
pub const POINTS_PER_LEVEL: i64 = 10;

pub fn level_for_points(level_sum: i64) -> i64 {
    level_sum.max(0) / POINTS_PER_LEVEL
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelProgress {
    pub level_sum: i64,
    pub user_level: i64,
    pub points_for_next: i64,
    pub remaining: i64,
    /// Fraction of the way to the next level, in `[0, 1]`.
    pub progress: f64,
}

impl From<&UserLevel> for LevelProgress {
    fn from(level: &UserLevel) -> Self {
        let points_for_next = level.user_level.saturating_add(1).saturating_mul(POINTS_PER_LEVEL);
        let remaining = points_for_next.saturating_sub(level.level_sum).max(0);
        let progress = if points_for_next > 0 {
            (level.level_sum.max(0) as f64 / points_for_next as f64).min(1.0)
        } else {
            1.0
        };

        Self {
            level_sum: level.level_sum,
            user_level: level.user_level,
            points_for_next,
            remaining,
            progress,
        }
    }
}
