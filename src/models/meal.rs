use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Meal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meal_date: NaiveDate,
    pub name: String,
    /// HH:MM label, stamped server-side at insertion. Listings sort on it.
    pub time_label: String,
    pub items: String,
    pub calories: i32,
    pub category: MealCategory,
    pub created_at: DateTime<Utc>,
}

/// Three-level ordinal quality tag: green = favorable, yellow = acceptable,
/// orange = discouraged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "meal_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MealCategory {
    Green,
    Yellow,
    Orange,
}

#[derive(Debug, Deserialize)]
pub struct CreateMealRequest {
    pub name: String,
    pub items: String,
    pub calories: i32,
    pub category: MealCategory,
}
