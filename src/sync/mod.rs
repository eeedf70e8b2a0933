//! Optimistic client-state synchronization.
//!
//! Every dashboard mutation applies its new value to the in-memory
//! per-(user, date) snapshot synchronously, responds immediately, and
//! dispatches the database write on a spawned task. A failed write keeps the
//! optimistic value but flags the snapshot stale; the next full dashboard
//! load replaces the snapshot from the database.

use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex},
};

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::models::daily_stat::{CounterField, DailyStat, Mood};
use crate::models::meal::Meal;

/// Acknowledgement from a completed persistence call.
#[derive(Debug)]
pub struct PersistAck;

#[derive(Debug, thiserror::Error)]
#[error("persist failed: {0}")]
pub struct PersistError(#[from] pub sqlx::Error);

/// The dashboard state a user sees, mirrored in memory so mutations render
/// with zero latency. `stale` marks a snapshot whose last persist failed.
#[derive(Debug, Clone, Serialize, Default)]
pub struct DashboardSnapshot {
    pub steps: i32,
    pub water_glasses: i32,
    pub sleep_hours: f64,
    pub mood: Option<Mood>,
    pub weight_current: Option<f64>,
    pub meals: Vec<Meal>,
    pub stale: bool,
}

impl DashboardSnapshot {
    pub fn from_parts(stat: &DailyStat, meals: Vec<Meal>, weight_current: Option<f64>) -> Self {
        Self {
            steps: stat.steps,
            water_glasses: stat.water_glasses,
            sleep_hours: stat.sleep_hours,
            mood: stat.mood,
            weight_current,
            meals,
            stale: false,
        }
    }

    pub fn total_calories(&self) -> i64 {
        self.meals.iter().map(|m| m.calories as i64).sum()
    }
}

/// In-memory snapshot store keyed by (user, date). Single-instance, same
/// shape as the in-flight guard.
#[derive(Clone, Default)]
pub struct SyncState {
    snapshots: Arc<Mutex<HashMap<(Uuid, NaiveDate), DashboardSnapshot>>>,
}

impl SyncState {
    pub fn new() -> Self {
        Self {
            snapshots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn get(&self, user_id: Uuid, date: NaiveDate) -> Option<DashboardSnapshot> {
        self.snapshots
            .lock()
            .expect("sync lock poisoned")
            .get(&(user_id, date))
            .cloned()
    }

    /// Replace the snapshot with freshly-loaded database state. This is the
    /// reconciliation point: it clears any stale flag.
    pub fn replace(&self, user_id: Uuid, date: NaiveDate, snapshot: DashboardSnapshot) {
        self.snapshots
            .lock()
            .expect("sync lock poisoned")
            .insert((user_id, date), snapshot);
    }

    /// Apply a delta to a numeric counter. Counters clamp to a non-negative
    /// floor before being stored or displayed.
    pub fn apply_counter(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        field: CounterField,
        delta: f64,
    ) -> DashboardSnapshot {
        self.with_snapshot(user_id, date, |snap| match field {
            CounterField::Steps => {
                snap.steps = clamp_floor(snap.steps as f64 + delta).round() as i32;
            }
            CounterField::WaterGlasses => {
                snap.water_glasses = clamp_floor(snap.water_glasses as f64 + delta).round() as i32;
            }
            CounterField::SleepHours => {
                snap.sleep_hours = clamp_floor(snap.sleep_hours + delta);
            }
        })
    }

    pub fn set_mood(&self, user_id: Uuid, date: NaiveDate, mood: Mood) -> DashboardSnapshot {
        self.with_snapshot(user_id, date, |snap| snap.mood = Some(mood))
    }

    /// Update the weight on an existing snapshot. Unlike the other mutators
    /// this never plants a fresh entry: a defaulted snapshot here would let a
    /// later counter delta apply to zeros instead of the persisted values.
    pub fn set_weight(
        &self,
        user_id: Uuid,
        date: NaiveDate,
        weight: f64,
    ) -> Option<DashboardSnapshot> {
        let mut snapshots = self.snapshots.lock().expect("sync lock poisoned");
        snapshots.get_mut(&(user_id, date)).map(|snap| {
            snap.weight_current = Some(weight);
            snap.clone()
        })
    }

    pub fn push_meal(&self, user_id: Uuid, date: NaiveDate, meal: Meal) -> DashboardSnapshot {
        self.with_snapshot(user_id, date, |snap| snap.meals.push(meal))
    }

    /// Flag the snapshot as diverged from the database after a failed
    /// persist. The optimistic value is kept.
    pub fn mark_stale(&self, user_id: Uuid, date: NaiveDate) {
        self.with_snapshot(user_id, date, |snap| snap.stale = true);
    }

    /// Drop snapshots for days before `date`. Returns the number evicted.
    pub fn evict_before(&self, date: NaiveDate) -> usize {
        let mut snapshots = self.snapshots.lock().expect("sync lock poisoned");
        let before = snapshots.len();
        snapshots.retain(|(_, day), _| *day >= date);
        before - snapshots.len()
    }

    fn with_snapshot<F>(&self, user_id: Uuid, date: NaiveDate, apply: F) -> DashboardSnapshot
    where
        F: FnOnce(&mut DashboardSnapshot),
    {
        let mut snapshots = self.snapshots.lock().expect("sync lock poisoned");
        let snap = snapshots.entry((user_id, date)).or_default();
        apply(snap);
        snap.clone()
    }
}

/// Await a persistence call and reconcile its outcome: a failure is logged
/// and the snapshot flagged stale, never silently discarded.
pub async fn persist_and_reconcile<F>(sync: SyncState, user_id: Uuid, date: NaiveDate, persist: F)
where
    F: Future<Output = Result<PersistAck, PersistError>>,
{
    if let Err(e) = persist.await {
        tracing::warn!(
            user_id = %user_id,
            date = %date,
            error = %e,
            "Dashboard persist failed; snapshot kept optimistic value and was marked stale"
        );
        sync.mark_stale(user_id, date);
    }
}

/// Dispatch a persistence call without blocking the response.
pub fn spawn_persist<F>(sync: &SyncState, user_id: Uuid, date: NaiveDate, persist: F)
where
    F: Future<Output = Result<PersistAck, PersistError>> + Send + 'static,
{
    let sync = sync.clone();
    tokio::spawn(persist_and_reconcile(sync, user_id, date, persist));
}

/// Periodically evict snapshots from past days so the cache doesn't grow
/// with every user-day forever.
pub fn spawn_eviction_worker(sync: SyncState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            let evicted = sync.evict_before(chrono::Utc::now().date_naive());
            if evicted > 0 {
                tracing::debug!(evicted, "Evicted dashboard snapshots from past days");
            }
        }
    });
}

fn clamp_floor(value: f64) -> f64 {
    value.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> Uuid {
        Uuid::new_v4()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 29).unwrap()
    }

    #[test]
    fn test_counters_never_negative() {
        let sync = SyncState::new();
        let (u, d) = (user(), today());

        let snap = sync.apply_counter(u, d, CounterField::Steps, -10_000.0);
        assert_eq!(snap.steps, 0);

        // Repeated large decrements stay floored
        for _ in 0..5 {
            sync.apply_counter(u, d, CounterField::WaterGlasses, -100.0);
        }
        let snap = sync.apply_counter(u, d, CounterField::WaterGlasses, -1.0);
        assert_eq!(snap.water_glasses, 0);

        let snap = sync.apply_counter(u, d, CounterField::SleepHours, -0.5);
        assert_eq!(snap.sleep_hours, 0.0);
    }

    #[test]
    fn test_counter_deltas_accumulate() {
        let sync = SyncState::new();
        let (u, d) = (user(), today());

        sync.apply_counter(u, d, CounterField::Steps, 1000.0);
        let snap = sync.apply_counter(u, d, CounterField::Steps, 1000.0);
        assert_eq!(snap.steps, 2000);

        let snap = sync.apply_counter(u, d, CounterField::SleepHours, 0.5);
        assert_eq!(snap.sleep_hours, 0.5);
    }

    #[test]
    fn test_snapshots_scoped_per_user_and_date() {
        let sync = SyncState::new();
        let (u1, u2, d) = (user(), user(), today());

        sync.apply_counter(u1, d, CounterField::Steps, 1000.0);
        assert!(sync.get(u2, d).is_none());

        let other_day = d.succ_opt().unwrap();
        assert!(sync.get(u1, other_day).is_none());
    }

    #[test]
    fn test_set_weight_never_plants_a_default_snapshot() {
        let sync = SyncState::new();
        let (u, d) = (user(), today());

        // On a cold cache the weight update must not create a zeroed entry:
        // that entry would make a later counter adjustment skip its database
        // seed and persist zeros-based values over the real row.
        assert!(sync.set_weight(u, d, 82.0).is_none());
        assert!(sync.get(u, d).is_none());

        let snap = sync.apply_counter(u, d, CounterField::Steps, 1000.0);
        assert_eq!(snap.steps, 1000);
    }

    #[test]
    fn test_set_weight_updates_seeded_snapshot() {
        let sync = SyncState::new();
        let (u, d) = (user(), today());

        sync.replace(
            u,
            d,
            DashboardSnapshot {
                steps: 5000,
                weight_current: Some(90.0),
                ..Default::default()
            },
        );

        let snap = sync.set_weight(u, d, 82.0).unwrap();
        assert_eq!(snap.weight_current, Some(82.0));
        assert_eq!(snap.steps, 5000);
    }

    #[test]
    fn test_evict_before_drops_only_past_days() {
        let sync = SyncState::new();
        let (u, d) = (user(), today());
        let yesterday = d.pred_opt().unwrap();

        sync.apply_counter(u, yesterday, CounterField::Steps, 1000.0);
        sync.apply_counter(u, d, CounterField::Steps, 2000.0);

        assert_eq!(sync.evict_before(d), 1);
        assert!(sync.get(u, yesterday).is_none());
        assert_eq!(sync.get(u, d).unwrap().steps, 2000);

        // Nothing left to evict
        assert_eq!(sync.evict_before(d), 0);
    }

    #[test]
    fn test_meals_accumulate_calories_in_order() {
        use crate::models::meal::{Meal, MealCategory};

        let sync = SyncState::new();
        let (u, d) = (user(), today());

        let meal = |name: &str, time: &str, calories: i32| Meal {
            id: Uuid::new_v4(),
            user_id: u,
            meal_date: d,
            name: name.into(),
            time_label: time.into(),
            items: String::new(),
            calories,
            category: MealCategory::Green,
            created_at: chrono::Utc::now(),
        };

        sync.push_meal(u, d, meal("Café da manhã", "08:30", 350));
        let snap = sync.push_meal(u, d, meal("Almoço", "12:15", 420));

        assert_eq!(snap.total_calories(), 770);
        assert_eq!(snap.meals[0].time_label, "08:30");
        assert_eq!(snap.meals[1].time_label, "12:15");
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_optimistic_value_and_marks_stale() {
        let sync = SyncState::new();
        let (u, d) = (user(), today());

        let snap = sync.apply_counter(u, d, CounterField::Steps, 1000.0);
        assert_eq!(snap.steps, 1000);
        assert!(!snap.stale);

        persist_and_reconcile(sync.clone(), u, d, async {
            Err(PersistError(sqlx::Error::PoolTimedOut))
        })
        .await;

        // Documented behavior: the optimistic value survives the failure,
        // and the divergence is visible through the stale flag.
        let snap = sync.get(u, d).unwrap();
        assert_eq!(snap.steps, 1000);
        assert!(snap.stale);
    }

    #[tokio::test]
    async fn test_successful_persist_leaves_snapshot_clean() {
        let sync = SyncState::new();
        let (u, d) = (user(), today());

        sync.apply_counter(u, d, CounterField::Steps, 1000.0);
        persist_and_reconcile(sync.clone(), u, d, async { Ok(PersistAck) }).await;

        assert!(!sync.get(u, d).unwrap().stale);
    }

    #[test]
    fn test_reload_reconciles_stale_snapshot() {
        let sync = SyncState::new();
        let (u, d) = (user(), today());

        sync.apply_counter(u, d, CounterField::Steps, 1000.0);
        sync.mark_stale(u, d);

        // Fresh database state replaces the snapshot and clears the flag
        let fresh = DashboardSnapshot {
            steps: 0,
            ..Default::default()
        };
        sync.replace(u, d, fresh);

        let snap = sync.get(u, d).unwrap();
        assert_eq!(snap.steps, 0);
        assert!(!snap.stale);
    }
}
