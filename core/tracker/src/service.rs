use goal_coach_schemas::{
    generate_category_id, generate_goal_id, generate_progress_id, Category, CategoryId,
    CreateCategoryRequest, CreateGoalRequest, Goal, GoalFilter, GoalId, GoalStats, GoalStatus,
    GoalUpdate, Progress, ProgressUpdateRequest, DEFAULT_CATEGORY_COLOR,
};
use tracing::{debug, info};

use crate::database::{timestamp_now, Database};
use crate::error::{TrackerError, TrackerResult};
use crate::progress;

fn require_non_empty(field: &str, value: &str) -> TrackerResult<()> {
    if value.trim().is_empty() {
        return Err(TrackerError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

// ========== CATEGORIES ==========

pub struct CategoryService<'a> {
    db: &'a Database,
}

impl<'a> CategoryService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Names are not required to be unique
    pub fn create(&self, request: CreateCategoryRequest) -> TrackerResult<Category> {
        require_non_empty("name", &request.name)?;

        let category = Category {
            id: generate_category_id(),
            name: request.name,
            description: request.description,
            color: request
                .color
                .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
            created_at: timestamp_now(),
        };

        self.db.insert_category(&category)?;
        info!("Created category {} ({})", category.id, category.name);
        Ok(category)
    }

    pub fn list(&self) -> TrackerResult<Vec<Category>> {
        self.db.list_categories()
    }

    /// Goals referencing the category keep their `category_id`
    pub fn delete(&self, id: &CategoryId) -> TrackerResult<()> {
        if self.db.delete_category(id)? == 0 {
            return Err(TrackerError::NotFound(format!("Category not found: {}", id)));
        }

        info!("Deleted category {}", id);
        Ok(())
    }
}

// ========== GOALS ==========

pub struct GoalService<'a> {
    db: &'a Database,
}

impl<'a> GoalService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn create(&self, request: CreateGoalRequest) -> TrackerResult<Goal> {
        require_non_empty("description", &request.description)?;

        let now = timestamp_now();
        let goal = Goal {
            id: generate_goal_id(),
            description: request.description,
            category_id: request.category_id,
            tags: request.tags,
            priority: request.priority,
            status: GoalStatus::Active,
            progress_percentage: 0.0,
            steps: Vec::new(),
            resources: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
            completed_at: None,
        };

        self.db.insert_goal(&goal)?;
        info!("Created goal {} (priority: {})", goal.id, goal.priority.as_str());
        Ok(goal)
    }

    pub fn get(&self, id: &GoalId) -> TrackerResult<Goal> {
        self.db
            .get_goal(id)?
            .ok_or_else(|| TrackerError::NotFound(format!("Goal not found: {}", id)))
    }

    pub fn list(&self, filter: &GoalFilter) -> TrackerResult<Vec<Goal>> {
        self.db.list_goals(filter)
    }

    /// Apply the supplied fields and refresh `updated_at`.
    ///
    /// Setting status to completed stamps `completed_at` and forces the
    /// percentage to 100 whatever the step progress says. Moving away from
    /// completed later leaves `completed_at` as it was.
    pub fn update(&self, id: &GoalId, update: GoalUpdate) -> TrackerResult<Goal> {
        let mut goal = self.get(id)?;

        if update.is_empty() {
            debug!("Empty update for goal {}, refreshing updated_at only", id);
        }

        if let Some(description) = update.description {
            require_non_empty("description", &description)?;
            goal.description = description;
        }
        if let Some(category_id) = update.category_id {
            goal.category_id = category_id;
        }
        if let Some(tags) = update.tags {
            goal.tags = tags;
        }
        if let Some(priority) = update.priority {
            goal.priority = priority;
        }
        if let Some(steps) = update.steps {
            goal.steps = steps;
        }
        if let Some(resources) = update.resources {
            goal.resources = resources;
        }

        let now = timestamp_now();
        if let Some(status) = update.status {
            if status == GoalStatus::Completed {
                goal.completed_at = Some(now.clone());
                goal.progress_percentage = 100.0;
            }
            goal.status = status;
        }
        goal.updated_at = now;

        if self.db.update_goal(&goal)? == 0 {
            return Err(TrackerError::NotFound(format!("Goal not found: {}", id)));
        }

        info!("Updated goal {} (status: {})", goal.id, goal.status.as_str());
        Ok(goal)
    }

    /// Progress records go first, then the goal. The two deletes are not atomic.
    pub fn delete(&self, id: &GoalId) -> TrackerResult<()> {
        let removed = self.db.delete_progress_for_goal(id)?;

        if self.db.delete_goal(id)? == 0 {
            return Err(TrackerError::NotFound(format!("Goal not found: {}", id)));
        }

        info!("Deleted goal {} and {} progress record(s)", id, removed);
        Ok(())
    }
}

// ========== PROGRESS ==========

pub struct ProgressService<'a> {
    db: &'a Database,
}

impl<'a> ProgressService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Upsert the record for `(goal_id, step_index)` and recompute the goal's
    /// percentage. Neither the goal nor the index range is validated: progress
    /// for an unknown goal is stored and the goal-side write matches nothing.
    pub fn update_step(
        &self,
        goal_id: &GoalId,
        request: ProgressUpdateRequest,
    ) -> TrackerResult<f64> {
        let completed_at = request.completed.then(timestamp_now);

        match self.db.find_progress(goal_id, request.step_index)? {
            Some(existing) => {
                let record = Progress {
                    completed: request.completed,
                    completed_at,
                    notes: request.notes,
                    ..existing
                };
                self.db.update_progress(&record)?;
                debug!("Updated progress {} for goal {}", record.id, goal_id);
            }
            None => {
                let record = Progress {
                    id: generate_progress_id(),
                    goal_id: goal_id.clone(),
                    step_index: request.step_index,
                    completed: request.completed,
                    completed_at,
                    notes: request.notes,
                };
                self.db.insert_progress(&record)?;
            }
        }

        let percentage = progress::goal_percentage(self.db, goal_id)?;
        if self.db.set_goal_progress(goal_id, percentage, &timestamp_now())? == 0 {
            debug!("Progress stored for unknown goal {}", goal_id);
        }

        info!(
            "Goal {} step {} completed={} -> {:.1}%",
            goal_id, request.step_index, request.completed, percentage
        );
        Ok(percentage)
    }

    pub fn list_for_goal(&self, goal_id: &GoalId) -> TrackerResult<Vec<Progress>> {
        self.db.list_progress(goal_id)
    }
}

// ========== STATISTICS ==========

pub struct StatsService<'a> {
    db: &'a Database,
}

impl<'a> StatsService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn stats(&self) -> TrackerResult<GoalStats> {
        let total_goals = self.db.count_goals(None)?;
        let completed_goals = self.db.count_goals(Some(GoalStatus::Completed))?;
        let active_goals = self.db.count_goals(Some(GoalStatus::Active))?;

        let completion_rate = if total_goals > 0 {
            completed_goals as f64 / total_goals as f64 * 100.0
        } else {
            0.0
        };

        Ok(GoalStats {
            total_goals,
            completed_goals,
            active_goals,
            completion_rate,
        })
    }
}
