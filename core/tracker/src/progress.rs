use goal_coach_schemas::GoalId;

use crate::database::Database;
use crate::error::TrackerResult;

/// Completion percentage for a goal with `step_count` steps of which
/// `completed_count` progress records are marked completed.
///
/// The denominator is the goal's current step list. Completed records whose
/// index falls outside that list still count, so the result is not clamped
/// and can exceed 100 after steps are removed.
pub fn percentage(step_count: usize, completed_count: usize) -> f64 {
    if step_count == 0 {
        return 0.0;
    }

    completed_count as f64 / step_count as f64 * 100.0
}

/// Recompute a stored goal's percentage from its progress records.
/// An unknown goal yields 0.0.
pub fn goal_percentage(db: &Database, goal_id: &GoalId) -> TrackerResult<f64> {
    let step_count = match db.get_goal(goal_id)? {
        Some(goal) => goal.steps.len(),
        None => return Ok(0.0),
    };

    if step_count == 0 {
        return Ok(0.0);
    }

    let completed = db.count_completed_progress(goal_id)?;
    Ok(percentage(step_count, completed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_steps_is_zero() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(0, 7), 0.0);
    }

    #[test]
    fn test_fraction_of_steps() {
        assert_eq!(percentage(4, 0), 0.0);
        assert_eq!(percentage(4, 2), 50.0);
        assert_eq!(percentage(4, 3), 75.0);
        assert_eq!(percentage(4, 4), 100.0);
        assert_eq!(percentage(3, 1), 1.0 / 3.0 * 100.0);
    }

    #[test]
    fn test_stale_records_are_not_clamped() {
        // Step list shrank from 4 to 2 after three steps were completed
        assert_eq!(percentage(2, 3), 150.0);
    }

    #[test]
    fn test_unknown_goal_is_zero() {
        let db = Database::in_memory().unwrap();
        let pct = goal_percentage(&db, &GoalId("goal_missing".into())).unwrap();
        assert_eq!(pct, 0.0);
    }
}
