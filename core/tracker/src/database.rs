use chrono::{SecondsFormat, Utc};
use goal_coach_schemas::{
    Category, CategoryId, Goal, GoalFilter, GoalId, GoalStatus, Progress, ProgressId,
};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::TrackerResult;

const CATEGORY_COLUMNS: &str = "id, name, description, color, created_at";

const GOAL_COLUMNS: &str = "id, description, category_id, tags, priority, status,
    progress_percentage, steps, resources, created_at, updated_at, completed_at";

const PROGRESS_COLUMNS: &str = "id, goal_id, step_index, completed, completed_at, notes";

/// Current time as RFC3339 with fixed microsecond precision, so that string
/// order in `ORDER BY created_at` matches chronological order.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// SQLite-backed entity store: one table per collection, no foreign keys.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database file and ensure the schema exists
    pub fn new<P: AsRef<Path>>(path: P) -> TrackerResult<Self> {
        let conn = Connection::open(path)?;

        let db = Self { conn };
        db.init_schema()?;

        info!("Database initialized");
        Ok(db)
    }

    /// Private in-memory database, used by tests
    pub fn in_memory() -> TrackerResult<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> TrackerResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS categories (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                color TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        // category_id is a weak reference: no FOREIGN KEY on purpose
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS goals (
                id TEXT PRIMARY KEY,
                description TEXT NOT NULL,
                category_id TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                priority TEXT NOT NULL DEFAULT 'medium',
                status TEXT NOT NULL DEFAULT 'active',
                progress_percentage REAL NOT NULL DEFAULT 0,
                steps TEXT NOT NULL DEFAULT '[]',
                resources TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                completed_at TEXT
            )",
            [],
        )?;

        // (goal_id, step_index) uniqueness is enforced by the progress service
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS progress (
                id TEXT PRIMARY KEY,
                goal_id TEXT NOT NULL,
                step_index INTEGER NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                completed_at TEXT,
                notes TEXT
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_goals_created ON goals(created_at DESC)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_goals_category ON goals(category_id)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_goals_status ON goals(status)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_progress_goal_step ON progress(goal_id, step_index)",
            [],
        )?;

        debug!("Database schema initialized");
        Ok(())
    }

    // ========== CATEGORIES ==========

    pub fn insert_category(&self, category: &Category) -> TrackerResult<()> {
        self.conn.execute(
            "INSERT INTO categories (id, name, description, color, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                category.id.0,
                category.name,
                category.description,
                category.color,
                category.created_at,
            ],
        )?;

        debug!("Inserted category: {}", category.id);
        Ok(())
    }

    /// All categories in insertion order
    pub fn list_categories(&self) -> TrackerResult<Vec<Category>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM categories ORDER BY rowid",
            CATEGORY_COLUMNS
        ))?;

        let categories = stmt
            .query_map([], row_to_category)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    /// Returns the number of deleted rows (0 or 1)
    pub fn delete_category(&self, id: &CategoryId) -> TrackerResult<usize> {
        let deleted = self
            .conn
            .execute("DELETE FROM categories WHERE id = ?1", params![id.0])?;

        debug!("Deleted {} category row(s) for {}", deleted, id);
        Ok(deleted)
    }

    // ========== GOALS ==========

    pub fn insert_goal(&self, goal: &Goal) -> TrackerResult<()> {
        let tags_json = serde_json::to_string(&goal.tags)?;
        let steps_json = serde_json::to_string(&goal.steps)?;
        let resources_json = serde_json::to_string(&goal.resources)?;

        self.conn.execute(
            "INSERT INTO goals (id, description, category_id, tags, priority, status,
                                progress_percentage, steps, resources, created_at,
                                updated_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                goal.id.0,
                goal.description,
                goal.category_id.as_ref().map(|c| c.0.as_str()),
                tags_json,
                goal.priority.as_str(),
                goal.status.as_str(),
                goal.progress_percentage,
                steps_json,
                resources_json,
                goal.created_at,
                goal.updated_at,
                goal.completed_at,
            ],
        )?;

        debug!("Inserted goal: {}", goal.id);
        Ok(())
    }

    pub fn get_goal(&self, id: &GoalId) -> TrackerResult<Option<Goal>> {
        let goal = self
            .conn
            .query_row(
                &format!("SELECT {} FROM goals WHERE id = ?1", GOAL_COLUMNS),
                params![id.0],
                row_to_goal,
            )
            .optional()?;

        Ok(goal)
    }

    /// Goals matching every supplied filter, most recently created first
    pub fn list_goals(&self, filter: &GoalFilter) -> TrackerResult<Vec<Goal>> {
        let mut clauses = Vec::new();
        let mut values: Vec<String> = Vec::new();

        if let Some(ref category_id) = filter.category_id {
            values.push(category_id.0.clone());
            clauses.push(format!("category_id = ?{}", values.len()));
        }

        if let Some(status) = filter.status {
            values.push(status.as_str().to_string());
            clauses.push(format!("status = ?{}", values.len()));
        }

        let mut sql = format!("SELECT {} FROM goals", GOAL_COLUMNS);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC, rowid DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let goals = stmt
            .query_map(params_from_iter(values.iter()), row_to_goal)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(goals)
    }

    /// Overwrite every column of an existing goal. Returns the matched row count.
    pub fn update_goal(&self, goal: &Goal) -> TrackerResult<usize> {
        let tags_json = serde_json::to_string(&goal.tags)?;
        let steps_json = serde_json::to_string(&goal.steps)?;
        let resources_json = serde_json::to_string(&goal.resources)?;

        let matched = self.conn.execute(
            "UPDATE goals
             SET description = ?2, category_id = ?3, tags = ?4, priority = ?5, status = ?6,
                 progress_percentage = ?7, steps = ?8, resources = ?9, updated_at = ?10,
                 completed_at = ?11
             WHERE id = ?1",
            params![
                goal.id.0,
                goal.description,
                goal.category_id.as_ref().map(|c| c.0.as_str()),
                tags_json,
                goal.priority.as_str(),
                goal.status.as_str(),
                goal.progress_percentage,
                steps_json,
                resources_json,
                goal.updated_at,
                goal.completed_at,
            ],
        )?;

        debug!("Updated goal {} ({} matched)", goal.id, matched);
        Ok(matched)
    }

    /// Persist a recomputed percentage. Matches zero rows for an unknown goal.
    pub fn set_goal_progress(
        &self,
        id: &GoalId,
        percentage: f64,
        updated_at: &str,
    ) -> TrackerResult<usize> {
        let matched = self.conn.execute(
            "UPDATE goals SET progress_percentage = ?2, updated_at = ?3 WHERE id = ?1",
            params![id.0, percentage, updated_at],
        )?;

        Ok(matched)
    }

    pub fn delete_goal(&self, id: &GoalId) -> TrackerResult<usize> {
        let deleted = self
            .conn
            .execute("DELETE FROM goals WHERE id = ?1", params![id.0])?;

        debug!("Deleted {} goal row(s) for {}", deleted, id);
        Ok(deleted)
    }

    /// Count goals, optionally restricted to one status
    pub fn count_goals(&self, status: Option<GoalStatus>) -> TrackerResult<usize> {
        let count: i64 = match status {
            Some(status) => self.conn.query_row(
                "SELECT COUNT(*) FROM goals WHERE status = ?1",
                params![status.as_str()],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM goals", [], |row| row.get(0))?,
        };

        Ok(count as usize)
    }

    // ========== PROGRESS ==========

    pub fn find_progress(
        &self,
        goal_id: &GoalId,
        step_index: u32,
    ) -> TrackerResult<Option<Progress>> {
        let progress = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM progress WHERE goal_id = ?1 AND step_index = ?2",
                    PROGRESS_COLUMNS
                ),
                params![goal_id.0, step_index],
                row_to_progress,
            )
            .optional()?;

        Ok(progress)
    }

    pub fn insert_progress(&self, progress: &Progress) -> TrackerResult<()> {
        self.conn.execute(
            "INSERT INTO progress (id, goal_id, step_index, completed, completed_at, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                progress.id.0,
                progress.goal_id.0,
                progress.step_index,
                progress.completed,
                progress.completed_at,
                progress.notes,
            ],
        )?;

        debug!(
            "Inserted progress {} for goal {} step {}",
            progress.id, progress.goal_id, progress.step_index
        );
        Ok(())
    }

    /// Overwrite the mutable fields of the record keyed by `(goal_id, step_index)`
    pub fn update_progress(&self, progress: &Progress) -> TrackerResult<usize> {
        let matched = self.conn.execute(
            "UPDATE progress SET completed = ?3, completed_at = ?4, notes = ?5
             WHERE goal_id = ?1 AND step_index = ?2",
            params![
                progress.goal_id.0,
                progress.step_index,
                progress.completed,
                progress.completed_at,
                progress.notes,
            ],
        )?;

        Ok(matched)
    }

    /// Progress records of a goal ordered by step index
    pub fn list_progress(&self, goal_id: &GoalId) -> TrackerResult<Vec<Progress>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM progress WHERE goal_id = ?1 ORDER BY step_index ASC",
            PROGRESS_COLUMNS
        ))?;

        let records = stmt
            .query_map(params![goal_id.0], row_to_progress)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Completed records for a goal, regardless of whether the index is still in range
    pub fn count_completed_progress(&self, goal_id: &GoalId) -> TrackerResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM progress WHERE goal_id = ?1 AND completed = 1",
            params![goal_id.0],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    pub fn delete_progress_for_goal(&self, goal_id: &GoalId) -> TrackerResult<usize> {
        let deleted = self
            .conn
            .execute("DELETE FROM progress WHERE goal_id = ?1", params![goal_id.0])?;

        debug!("Deleted {} progress row(s) for goal {}", deleted, goal_id);
        Ok(deleted)
    }
}

fn row_to_category(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: CategoryId(row.get(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        color: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn row_to_goal(row: &Row) -> rusqlite::Result<Goal> {
    let tags_json: String = row.get(3)?;
    let steps_json: String = row.get(7)?;
    let resources_json: String = row.get(8)?;

    let priority_raw: String = row.get(4)?;
    let status_raw: String = row.get(5)?;

    Ok(Goal {
        id: GoalId(row.get(0)?),
        description: row.get(1)?,
        category_id: row.get::<_, Option<String>>(2)?.map(CategoryId),
        tags: serde_json::from_str(&tags_json).map_err(|e| json_error(3, e))?,
        priority: parse_column(4, &priority_raw)?,
        status: parse_column(5, &status_raw)?,
        progress_percentage: row.get(6)?,
        steps: serde_json::from_str(&steps_json).map_err(|e| json_error(7, e))?,
        resources: serde_json::from_str(&resources_json).map_err(|e| json_error(8, e))?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        completed_at: row.get(11)?,
    })
}

fn row_to_progress(row: &Row) -> rusqlite::Result<Progress> {
    Ok(Progress {
        id: ProgressId(row.get(0)?),
        goal_id: GoalId(row.get(1)?),
        step_index: row.get(2)?,
        completed: row.get(3)?,
        completed_at: row.get(4)?,
        notes: row.get(5)?,
    })
}

fn parse_column<T>(index: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = String>,
{
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, e.into()))
}

fn json_error(index: usize, err: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use goal_coach_schemas::{
        generate_category_id, generate_goal_id, generate_progress_id, Priority,
        DEFAULT_CATEGORY_COLOR,
    };
    use tempfile::NamedTempFile;

    fn sample_goal(description: &str, category_id: Option<CategoryId>) -> Goal {
        let now = timestamp_now();
        Goal {
            id: generate_goal_id(),
            description: description.to_string(),
            category_id,
            tags: vec!["health".into()],
            priority: Priority::Medium,
            status: GoalStatus::Active,
            progress_percentage: 0.0,
            steps: Vec::new(),
            resources: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
            completed_at: None,
        }
    }

    fn sample_progress(goal_id: &GoalId, step_index: u32, completed: bool) -> Progress {
        Progress {
            id: generate_progress_id(),
            goal_id: goal_id.clone(),
            step_index,
            completed,
            completed_at: completed.then(timestamp_now),
            notes: None,
        }
    }

    #[test]
    fn test_database_creation() {
        let temp = NamedTempFile::new().unwrap();
        let db = Database::new(temp.path()).unwrap();

        assert_eq!(db.count_goals(None).unwrap(), 0);
        assert!(db.list_categories().unwrap().is_empty());

        // Re-opening an initialized file is idempotent
        drop(db);
        let db = Database::new(temp.path()).unwrap();
        assert_eq!(db.count_goals(None).unwrap(), 0);
    }

    #[test]
    fn test_category_insert_list_delete() {
        let db = Database::in_memory().unwrap();

        let category = Category {
            id: generate_category_id(),
            name: "Career".into(),
            description: None,
            color: DEFAULT_CATEGORY_COLOR.into(),
            created_at: timestamp_now(),
        };
        db.insert_category(&category).unwrap();

        assert_eq!(db.list_categories().unwrap(), vec![category.clone()]);

        assert_eq!(db.delete_category(&category.id).unwrap(), 1);
        assert_eq!(db.delete_category(&category.id).unwrap(), 0);
    }

    #[test]
    fn test_goal_round_trip_and_filters() {
        let db = Database::in_memory().unwrap();
        let category_id = generate_category_id();

        let mut first = sample_goal("Read 12 books", Some(category_id.clone()));
        first.steps = vec!["Pick list".into(), "Read".into()];
        let mut resource = goal_coach_schemas::Resource::new();
        resource.insert("url".into(), "https://example.com".into());
        first.resources = vec![resource];
        db.insert_goal(&first).unwrap();

        let mut second = sample_goal("Run 5k", None);
        second.status = GoalStatus::Paused;
        db.insert_goal(&second).unwrap();

        assert_eq!(db.get_goal(&first.id).unwrap(), Some(first.clone()));

        let all = db.list_goals(&GoalFilter::default()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id, "newest goal comes first");

        let by_category = db
            .list_goals(&GoalFilter {
                category_id: Some(category_id),
                status: None,
            })
            .unwrap();
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category[0].id, first.id);

        let paused = db
            .list_goals(&GoalFilter {
                category_id: None,
                status: Some(GoalStatus::Paused),
            })
            .unwrap();
        assert_eq!(paused.len(), 1);
        assert_eq!(db.count_goals(Some(GoalStatus::Active)).unwrap(), 1);
    }

    #[test]
    fn test_set_goal_progress_unknown_goal_matches_nothing() {
        let db = Database::in_memory().unwrap();
        let matched = db
            .set_goal_progress(&generate_goal_id(), 50.0, &timestamp_now())
            .unwrap();
        assert_eq!(matched, 0);
    }

    #[test]
    fn test_progress_ordering_and_cascade_helpers() {
        let db = Database::in_memory().unwrap();
        let goal_id = generate_goal_id();

        db.insert_progress(&sample_progress(&goal_id, 2, true)).unwrap();
        db.insert_progress(&sample_progress(&goal_id, 0, true)).unwrap();
        db.insert_progress(&sample_progress(&goal_id, 1, false)).unwrap();

        let records = db.list_progress(&goal_id).unwrap();
        let indices: Vec<u32> = records.iter().map(|p| p.step_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(db.count_completed_progress(&goal_id).unwrap(), 2);

        let mut step_one = db.find_progress(&goal_id, 1).unwrap().unwrap();
        step_one.completed = true;
        assert_eq!(db.update_progress(&step_one).unwrap(), 1);
        assert_eq!(db.count_completed_progress(&goal_id).unwrap(), 3);

        assert_eq!(db.delete_progress_for_goal(&goal_id).unwrap(), 3);
        assert!(db.list_progress(&goal_id).unwrap().is_empty());
    }

    #[test]
    fn test_timestamps_sort_lexically() {
        let earlier = timestamp_now();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let later = timestamp_now();
        assert!(earlier < later);
        assert!(earlier.ends_with('Z'));
    }
}
