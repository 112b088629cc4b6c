use std::collections::HashMap;

use crate::models::ExerciseLog;

#[derive(Debug, Clone)]
pub struct GroupedSet {
    pub reps: u32,
    pub weight_kg: f64,
}

#[derive(Debug, Clone)]
pub struct GroupedExercise {
    pub name: String,
    pub total_reps: u32,
    pub volume_kg: f64,
    pub sets: Vec<GroupedSet>,
}

/// Groups one day's logs by exercise, heaviest total volume first. Sets keep
/// the order they were finished in.
pub fn group_logs(logs: &[ExerciseLog]) -> Vec<GroupedExercise> {
    let mut ordered: Vec<&ExerciseLog> = logs.iter().collect();
    ordered.sort_by_key(|log| log.finished_date_time);

    let mut grouped: HashMap<u64, GroupedExercise> = HashMap::new();
    for log in ordered {
        let exercise = grouped
            .entry(log.exercise_id)
            .or_insert_with(|| GroupedExercise {
                name: log.exercise_name.clone(),
                total_reps: 0,
                volume_kg: 0.0,
                sets: Vec::new(),
            });
        exercise.total_reps += log.reps;
        exercise.volume_kg += f64::from(log.reps) * log.weight_kg;
        exercise.sets.push(GroupedSet {
            reps: log.reps,
            weight_kg: log.weight_kg,
        });
    }

    let mut result: Vec<GroupedExercise> = grouped.into_values().collect();
    result.sort_by(|a, b| {
        b.volume_kg
            .total_cmp(&a.volume_kg)
            .then_with(|| a.name.cmp(&b.name))
    });
    result
}

pub fn format_day_summary(day_label: &str, grouped: &[GroupedExercise]) -> String {
    let mut lines = vec![day_label.to_string()];
    for exercise in grouped {
        let sets = exercise
            .sets
            .iter()
            .map(|set| format!("{}×{}kg", set.reps, format_weight(set.weight_kg)))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!(
            "• {} — {} ({} kg volume)",
            exercise.name,
            sets,
            format_weight(exercise.volume_kg)
        ));
    }
    lines.join("\n")
}

pub fn format_weight(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}
