use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// ULID and ID Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GoalId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgressId(pub String);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ProgressId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Category Schema
// ============================================================================

pub const DEFAULT_CATEGORY_COLOR: &str = "#0ea5e9";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub color: String,      // hex, e.g. "#0ea5e9"
    pub created_at: String, // RFC3339
}

// ============================================================================
// Goal Schema
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    #[serde(rename = "low")]
    Low,
    #[default]
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "high")]
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GoalStatus {
    #[default]
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "paused")]
    Paused,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Completed => "completed",
            GoalStatus::Paused => "paused",
        }
    }
}

impl FromStr for GoalStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "active" => Ok(GoalStatus::Active),
            "completed" => Ok(GoalStatus::Completed),
            "paused" => Ok(GoalStatus::Paused),
            other => Err(format!("unknown goal status '{}'", other)),
        }
    }
}

/// Opaque key-value record attached to a goal (links, books, notes...)
pub type Resource = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub description: String,
    /// Weak reference, never checked against the categories collection
    pub category_id: Option<CategoryId>,
    pub tags: Vec<String>,
    pub priority: Priority,
    pub status: GoalStatus,
    /// Derived from step progress; clients cannot set it directly
    pub progress_percentage: f64,
    pub steps: Vec<String>,
    pub resources: Vec<Resource>,
    pub created_at: String,           // RFC3339
    pub updated_at: String,           // RFC3339
    pub completed_at: Option<String>, // RFC3339
}

// ============================================================================
// Progress Schema
// ============================================================================

/// Completion state of one step of one goal. `(goal_id, step_index)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub id: ProgressId,
    pub goal_id: GoalId,
    pub step_index: u32,
    pub completed: bool,
    pub completed_at: Option<String>, // RFC3339
    pub notes: Option<String>,
}

// ============================================================================
// API Request/Response Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGoalRequest {
    pub description: String,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
}

/// Partial goal update. `None` means the field was not supplied.
///
/// `category_id` distinguishes an absent field (`None`) from an explicit
/// `null` (`Some(None)`), which detaches the goal from its category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub category_id: Option<Option<CategoryId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<GoalStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<Vec<Resource>>,
}

impl GoalUpdate {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.category_id.is_none()
            && self.tags.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.steps.is_none()
            && self.resources.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdateRequest {
    pub step_index: u32,
    pub completed: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdateResponse {
    pub message: String,
    pub progress_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalStats {
    pub total_goals: usize,
    pub completed_goals: usize,
    pub active_goals: usize,
    pub completion_rate: f64,
}

/// Equality filters for listing goals
#[derive(Debug, Clone, Default)]
pub struct GoalFilter {
    pub category_id: Option<CategoryId>,
    pub status: Option<GoalStatus>,
}

// ============================================================================
// Helper Functions
// ============================================================================

pub fn generate_category_id() -> CategoryId {
    CategoryId(format!("cat_{}", ulid::Ulid::new()))
}

pub fn generate_goal_id() -> GoalId {
    GoalId(format!("goal_{}", ulid::Ulid::new()))
}

pub fn generate_progress_id() -> ProgressId {
    ProgressId(format!("prog_{}", ulid::Ulid::new()))
}

/// Any present value, `null` included, becomes `Some(..)`. Paired with
/// `#[serde(default)]` so a missing field stays `None`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_generation() {
        let goal_id = generate_goal_id();
        assert!(goal_id.0.starts_with("goal_"));
        assert_eq!(goal_id.0.len(), 31); // "goal_" + 26 chars

        let category_id = generate_category_id();
        assert!(category_id.0.starts_with("cat_"));

        let progress_id = generate_progress_id();
        assert!(progress_id.0.starts_with("prog_"));

        assert_ne!(generate_goal_id(), generate_goal_id());
    }

    #[test]
    fn test_goal_serialization() {
        let mut resource = Resource::new();
        resource.insert("title".into(), "The Rust Book".into());

        let goal = Goal {
            id: generate_goal_id(),
            description: "Learn Rust".to_string(),
            category_id: Some(generate_category_id()),
            tags: vec!["programming".into()],
            priority: Priority::High,
            status: GoalStatus::Active,
            progress_percentage: 25.0,
            steps: vec!["Read".into(), "Write".into()],
            resources: vec![resource],
            created_at: "2025-11-02T18:00:00.000000Z".to_string(),
            updated_at: "2025-11-02T18:00:00.000000Z".to_string(),
            completed_at: None,
        };

        let json = serde_json::to_value(&goal).unwrap();
        assert_eq!(json["priority"], "high");
        assert_eq!(json["status"], "active");
        assert!(json["id"].as_str().unwrap().starts_with("goal_"));
        assert!(json["completed_at"].is_null());

        let restored: Goal = serde_json::from_value(json).unwrap();
        assert_eq!(restored, goal);
    }

    #[test]
    fn test_create_goal_request_defaults() {
        let request: CreateGoalRequest =
            serde_json::from_str(r#"{"description": "Run a marathon"}"#).unwrap();
        assert_eq!(request.priority, Priority::Medium);
        assert!(request.tags.is_empty());
        assert!(request.category_id.is_none());

        let bad = serde_json::from_str::<CreateGoalRequest>(
            r#"{"description": "x", "priority": "urgent"}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_goal_update_tracks_supplied_fields() {
        let absent: GoalUpdate = serde_json::from_str(r#"{"tags": ["a"]}"#).unwrap();
        assert!(absent.category_id.is_none());
        assert_eq!(absent.tags, Some(vec!["a".to_string()]));
        assert!(!absent.is_empty());

        let cleared: GoalUpdate = serde_json::from_str(r#"{"category_id": null}"#).unwrap();
        assert_eq!(cleared.category_id, Some(None));

        let set: GoalUpdate = serde_json::from_str(r#"{"category_id": "cat_1"}"#).unwrap();
        assert_eq!(set.category_id, Some(Some(CategoryId("cat_1".into()))));

        // progress_percentage is not client-settable and is dropped
        let ignored: GoalUpdate =
            serde_json::from_str(r#"{"progress_percentage": 42.0}"#).unwrap();
        assert!(ignored.is_empty());
    }

    #[test]
    fn test_progress_request_rejects_negative_index() {
        let bad = serde_json::from_str::<ProgressUpdateRequest>(
            r#"{"step_index": -1, "completed": true}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_enum_round_trip_through_str() {
        for status in [GoalStatus::Active, GoalStatus::Completed, GoalStatus::Paused] {
            assert_eq!(status.as_str().parse::<GoalStatus>().unwrap(), status);
        }
        for priority in [Priority::Low, Priority::Medium, Priority::High] {
            assert_eq!(priority.as_str().parse::<Priority>().unwrap(), priority);
        }
        assert!("done".parse::<GoalStatus>().is_err());
    }
}
