use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DailyStat {
    pub id: Uuid,
    pub user_id: Uuid,
    pub stat_date: NaiveDate,
    pub steps: i32,
    pub water_glasses: i32,
    pub sleep_hours: f64,
    pub mood: Option<Mood>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "mood", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Great,
    Good,
    Neutral,
    Bad,
    Terrible,
}

/// The numeric dashboard counters that accept delta adjustments.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CounterField {
    Steps,
    WaterGlasses,
    SleepHours,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStatRequest {
    pub field: CounterField,
    pub delta: f64,
}

#[derive(Debug, Deserialize)]
pub struct SetMoodRequest {
    pub mood: Mood,
}
