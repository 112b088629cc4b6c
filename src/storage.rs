use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::catalog::DEFAULT_CATALOG_URL;
use crate::dates::day_bounds_for_timestamp;
use crate::models::{ExerciseLog, PlanExercise, SetTarget, WorkoutPlan};

const STORE_FILE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Home directory not found")]
    NoHome,
    #[error("Unsupported store version {0}")]
    Version(u32),
    #[error("Unknown workout plan {0}")]
    UnknownPlan(u64),
    #[error("Unknown exercise {exercise_id} in plan {plan_id}")]
    UnknownExercise { plan_id: u64, exercise_id: u64 },
    #[error("Timestamp out of range: {0}")]
    InvalidTimestamp(i64),
}

/// Read access to logged sets.
pub trait ExerciseLogSource {
    /// Logs whose `finished_date_time` lies in `[start_millis, end_millis)`.
    fn logs_between(&self, start_millis: i64, end_millis: i64)
        -> Result<Vec<ExerciseLog>, StoreError>;

    /// Logs finished on the local calendar day that contains `timestamp_millis`.
    fn logs_by_date_time_stamp(&self, timestamp_millis: i64)
        -> Result<Vec<ExerciseLog>, StoreError>;
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct StoreFile {
    version: u32,
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    plans: Vec<WorkoutPlan>,
    #[serde(default)]
    logs: Vec<ExerciseLog>,
}

impl Default for StoreFile {
    fn default() -> Self {
        Self {
            version: STORE_FILE_VERSION,
            next_id: 1,
            plans: Vec::new(),
            logs: Vec::new(),
        }
    }
}

/// JSON-backed store of plans and logged sets. Day bucketing uses `Tz`.
#[derive(Debug)]
pub struct LogStore<Tz: TimeZone = Local> {
    path: Option<PathBuf>,
    tz: Tz,
    data: StoreFile,
}

impl LogStore<Local> {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::open_in(path, Local)
    }
}

impl<Tz: TimeZone> LogStore<Tz> {
    pub fn open_in(path: &Path, tz: Tz) -> Result<Self, StoreError> {
        let data = match fs::read_to_string(path) {
            Ok(contents) => {
                let data: StoreFile = serde_json::from_str(&contents)?;
                if data.version != STORE_FILE_VERSION {
                    return Err(StoreError::Version(data.version));
                }
                data
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => StoreFile::default(),
            Err(err) => return Err(err.into()),
        };
        tracing::debug!(path = %path.display(), logs = data.logs.len(), "opened store");
        Ok(Self {
            path: Some(path.to_path_buf()),
            tz,
            data,
        })
    }

    #[cfg(test)]
    pub fn in_memory(tz: Tz) -> Self {
        Self {
            path: None,
            tz,
            data: StoreFile::default(),
        }
    }

    pub fn save(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.data)?;
        fs::write(path, json)?;
        tracing::info!(path = %path.display(), logs = self.data.logs.len(), "saved store");
        Ok(())
    }

    pub fn plans(&self) -> &[WorkoutPlan] {
        &self.data.plans
    }

    pub fn logs(&self) -> &[ExerciseLog] {
        &self.data.logs
    }

    pub fn add_plan(&mut self, name: &str) -> u64 {
        let id = self.allocate_id();
        self.data.plans.push(WorkoutPlan {
            id,
            name: name.trim().to_string(),
            exercises: Vec::new(),
        });
        id
    }

    /// Removes the plan. Sets already logged against it stay in the history.
    pub fn remove_plan(&mut self, plan_id: u64) -> Result<WorkoutPlan, StoreError> {
        let index = self
            .data
            .plans
            .iter()
            .position(|plan| plan.id == plan_id)
            .ok_or(StoreError::UnknownPlan(plan_id))?;
        Ok(self.data.plans.remove(index))
    }

    pub fn add_exercise(
        &mut self,
        plan_id: u64,
        name: &str,
        sets: Vec<SetTarget>,
    ) -> Result<u64, StoreError> {
        let id = self.data.next_id.max(1);
        let plan = self
            .data
            .plans
            .iter_mut()
            .find(|plan| plan.id == plan_id)
            .ok_or(StoreError::UnknownPlan(plan_id))?;
        plan.exercises.push(PlanExercise {
            exercise_id: id,
            name: name.trim().to_string(),
            sets,
        });
        self.data.next_id = id + 1;
        Ok(id)
    }

    pub fn log_set(
        &mut self,
        plan_id: u64,
        exercise_id: u64,
        reps: u32,
        weight_kg: f64,
        finished_date_time: i64,
    ) -> Result<u64, StoreError> {
        let plan = self
            .data
            .plans
            .iter()
            .find(|plan| plan.id == plan_id)
            .ok_or(StoreError::UnknownPlan(plan_id))?;
        let exercise_name = plan
            .exercises
            .iter()
            .find(|exercise| exercise.exercise_id == exercise_id)
            .map(|exercise| exercise.name.clone())
            .ok_or(StoreError::UnknownExercise {
                plan_id,
                exercise_id,
            })?;

        let id = self.allocate_id();
        self.data.logs.push(ExerciseLog {
            id,
            plan_id,
            exercise_id,
            exercise_name,
            reps,
            weight_kg,
            finished_date_time,
        });
        Ok(id)
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.data.next_id.max(1);
        self.data.next_id = id + 1;
        id
    }
}

impl<Tz: TimeZone> ExerciseLogSource for LogStore<Tz> {
    fn logs_between(
        &self,
        start_millis: i64,
        end_millis: i64,
    ) -> Result<Vec<ExerciseLog>, StoreError> {
        let mut logs: Vec<ExerciseLog> = self
            .data
            .logs
            .iter()
            .filter(|log| {
                log.finished_date_time >= start_millis && log.finished_date_time < end_millis
            })
            .cloned()
            .collect();
        logs.sort_by_key(|log| log.finished_date_time);
        Ok(logs)
    }

    fn logs_by_date_time_stamp(
        &self,
        timestamp_millis: i64,
    ) -> Result<Vec<ExerciseLog>, StoreError> {
        let (start, end) = day_bounds_for_timestamp(timestamp_millis, &self.tz)
            .ok_or(StoreError::InvalidTimestamp(timestamp_millis))?;
        self.logs_between(start, end)
    }
}

pub fn default_store_path() -> Result<PathBuf, StoreError> {
    let mut path = dirs::home_dir().ok_or(StoreError::NoHome)?;
    path.push(".liftlog-store.json");
    Ok(path)
}

pub fn default_log_path() -> Option<PathBuf> {
    let mut path = dirs::home_dir()?;
    path.push(".liftlog.log");
    Some(path)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    Terminal,
    Light,
    Dark,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Config {
    theme: Option<ThemePreference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    catalog_url: Option<String>,
}

fn config_path() -> Option<PathBuf> {
    let mut path = dirs::home_dir()?;
    path.push(".liftlog.json");
    Some(path)
}

pub fn read_theme() -> Option<ThemePreference> {
    read_config().and_then(|config| config.theme)
}

pub fn write_theme(theme: ThemePreference) -> Result<(), io::Error> {
    let mut config = read_config().unwrap_or_default();
    config.theme = Some(theme);
    write_config(&config)
}

pub fn read_catalog_url() -> String {
    read_config()
        .and_then(|config| config.catalog_url)
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string())
}

fn read_config() -> Option<Config> {
    let path = config_path()?;
    let contents = fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

fn write_config(config: &Config) -> Result<(), io::Error> {
    let path = config_path()
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Home directory not found"))?;
    let json = serde_json::to_string_pretty(config).map_err(io::Error::other)?;
    fs::write(path, json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::end_of_day_millis;
    use chrono::{NaiveDate, Utc};

    fn millis(value: &str) -> i64 {
        chrono::DateTime::parse_from_rfc3339(value)
            .unwrap()
            .timestamp_millis()
    }

    fn store_with_bench() -> (LogStore<Utc>, u64, u64) {
        let mut store = LogStore::in_memory(Utc);
        let plan = store.add_plan("Push day");
        let bench = store
            .add_exercise(
                plan,
                "Bench press",
                vec![SetTarget {
                    reps: 8,
                    weight_kg: 60.0,
                }],
            )
            .unwrap();
        (store, plan, bench)
    }

    #[test]
    fn ids_are_unique_across_plans_exercises_and_logs() {
        let (mut store, plan, bench) = store_with_bench();
        let log = store
            .log_set(plan, bench, 8, 60.0, millis("2024-06-15T10:00:00Z"))
            .unwrap();
        assert_ne!(plan, bench);
        assert_ne!(bench, log);
        assert_eq!(store.logs()[0].exercise_name, "Bench press");
    }

    #[test]
    fn log_set_rejects_unknown_exercise() {
        let (mut store, plan, _) = store_with_bench();
        let err = store.log_set(plan, 999, 5, 20.0, 0).unwrap_err();
        assert!(matches!(err, StoreError::UnknownExercise { exercise_id: 999, .. }));
    }

    #[test]
    fn selected_day_returns_exactly_that_days_logs() {
        let (mut store, plan, bench) = store_with_bench();
        for at in [
            "2024-06-14T23:59:59Z",
            "2024-06-15T00:00:00Z",
            "2024-06-15T12:30:00Z",
            "2024-06-15T23:59:59Z",
            "2024-06-16T00:00:00Z",
        ] {
            store.log_set(plan, bench, 5, 80.0, millis(at)).unwrap();
        }

        let day = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let logs = store
            .logs_by_date_time_stamp(end_of_day_millis(day, &Utc))
            .unwrap();

        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].finished_date_time, millis("2024-06-15T00:00:00Z"));
        assert_eq!(logs[2].finished_date_time, millis("2024-06-15T23:59:59Z"));
    }

    #[test]
    fn remove_plan_keeps_history() {
        let (mut store, plan, bench) = store_with_bench();
        store.log_set(plan, bench, 5, 80.0, 0).unwrap();
        let removed = store.remove_plan(plan).unwrap();
        assert_eq!(removed.name, "Push day");
        assert!(store.plans().is_empty());
        assert_eq!(store.logs().len(), 1);
        assert!(matches!(
            store.remove_plan(plan),
            Err(StoreError::UnknownPlan(_))
        ));
    }

    #[test]
    fn save_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = LogStore::open_in(&path, Utc).unwrap();
        let plan = store.add_plan("Legs");
        let squat = store.add_exercise(plan, "Squat", Vec::new()).unwrap();
        store
            .log_set(plan, squat, 5, 100.0, millis("2024-06-15T08:00:00Z"))
            .unwrap();
        store.save().unwrap();

        let mut reopened = LogStore::open_in(&path, Utc).unwrap();
        assert_eq!(reopened.plans().len(), 1);
        assert_eq!(reopened.logs().len(), 1);
        let next = reopened.add_plan("Pull");
        assert!(next > squat);
    }

    #[test]
    fn open_rejects_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, r#"{"version": 9}"#).unwrap();
        assert!(matches!(
            LogStore::open_in(&path, Utc),
            Err(StoreError::Version(9))
        ));
    }
}
