use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub weight_current: f64,
    pub weight_goal: f64,
    pub weight_initial: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Derived weight-goal figures shown on the dashboard.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeightProgress {
    pub lost: f64,
    pub remaining: f64,
    /// Percent of the way from initial to goal weight. Zero when the goal
    /// equals the initial weight (nothing to lose).
    pub percent: f64,
}

impl WeightProgress {
    pub fn for_profile(profile: &Profile) -> Self {
        Self::compute(
            profile.weight_initial,
            profile.weight_current,
            profile.weight_goal,
        )
    }

    pub fn compute(initial: f64, current: f64, goal: f64) -> Self {
        let lost = initial - current;
        let remaining = current - goal;
        let span = initial - goal;
        let percent = if span.abs() < f64::EPSILON {
            0.0
        } else {
            (lost / span) * 100.0
        };
        Self {
            lost,
            remaining,
            percent,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateWeightRequest {
    pub weight: f64,
}
