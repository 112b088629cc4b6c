use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SetTarget {
    pub reps: u32,
    pub weight_kg: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlanExercise {
    pub exercise_id: u64,
    pub name: String,
    #[serde(default)]
    pub sets: Vec<SetTarget>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkoutPlan {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub exercises: Vec<PlanExercise>,
}

/// One completed set. `finished_date_time` is epoch milliseconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExerciseLog {
    pub id: u64,
    pub plan_id: u64,
    pub exercise_id: u64,
    pub exercise_name: String,
    pub reps: u32,
    pub weight_kg: f64,
    pub finished_date_time: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogExercise {
    pub id: u64,
    pub name: String,
    pub category: Option<String>,
}
