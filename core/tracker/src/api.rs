use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Json, Path, Query, State,
    },
    response::IntoResponse,
    routing::{delete, get},
    Router,
};
use goal_coach_schemas::{
    Category, CategoryId, CreateCategoryRequest, CreateGoalRequest, Goal, GoalFilter, GoalId,
    GoalStats, GoalStatus, GoalUpdate, MessageResponse, Progress, ProgressUpdateRequest,
    ProgressUpdateResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::database::{timestamp_now, Database};
use crate::error::{TrackerError, TrackerResult};
use crate::service::{CategoryService, GoalService, ProgressService, StatsService};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }
}

/// All endpoints, mounted under `/api`
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))

        // Categories
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/:category_id", delete(delete_category))

        // Goals
        .route("/goals", get(list_goals).post(create_goal))
        .route(
            "/goals/:goal_id",
            get(get_goal).put(update_goal).delete(delete_goal),
        )

        // Step progress
        .route(
            "/goals/:goal_id/progress",
            get(list_goal_progress).post(update_step_progress),
        );

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "goal-coach",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": timestamp_now()
    }))
}

async fn get_stats(State(state): State<AppState>) -> TrackerResult<Json<GoalStats>> {
    let db = state.db.lock().await;
    let stats = StatsService::new(&db).stats()?;
    Ok(Json(stats))
}

// ========== CATEGORIES ==========

async fn list_categories(State(state): State<AppState>) -> TrackerResult<Json<Vec<Category>>> {
    let db = state.db.lock().await;
    let categories = CategoryService::new(&db).list()?;
    Ok(Json(categories))
}

async fn create_category(
    State(state): State<AppState>,
    request: Result<Json<CreateCategoryRequest>, JsonRejection>,
) -> TrackerResult<Json<Category>> {
    let Json(request) = request?;

    let db = state.db.lock().await;
    let category = CategoryService::new(&db).create(request)?;
    Ok(Json(category))
}

async fn delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
) -> TrackerResult<Json<MessageResponse>> {
    let db = state.db.lock().await;
    CategoryService::new(&db).delete(&CategoryId(category_id))?;

    Ok(Json(MessageResponse {
        message: "Category deleted successfully".to_string(),
    }))
}

// ========== GOALS ==========

/// Raw query string; empty values count as "no filter"
#[derive(Debug, Deserialize)]
struct ListGoalsQuery {
    category_id: Option<String>,
    status: Option<String>,
}

impl ListGoalsQuery {
    fn into_filter(self) -> TrackerResult<GoalFilter> {
        let category_id = self
            .category_id
            .filter(|id| !id.is_empty())
            .map(CategoryId);

        let status = self
            .status
            .filter(|status| !status.is_empty())
            .map(|raw| raw.parse::<GoalStatus>())
            .transpose()
            .map_err(TrackerError::Validation)?;

        Ok(GoalFilter {
            category_id,
            status,
        })
    }
}

async fn list_goals(
    State(state): State<AppState>,
    query: Result<Query<ListGoalsQuery>, QueryRejection>,
) -> TrackerResult<Json<Vec<Goal>>> {
    let Query(query) = query?;
    let filter = query.into_filter()?;

    let db = state.db.lock().await;
    let goals = GoalService::new(&db).list(&filter)?;
    Ok(Json(goals))
}

async fn create_goal(
    State(state): State<AppState>,
    request: Result<Json<CreateGoalRequest>, JsonRejection>,
) -> TrackerResult<Json<Goal>> {
    let Json(request) = request?;

    let db = state.db.lock().await;
    let goal = GoalService::new(&db).create(request)?;
    Ok(Json(goal))
}

async fn get_goal(
    State(state): State<AppState>,
    Path(goal_id): Path<String>,
) -> TrackerResult<Json<Goal>> {
    let db = state.db.lock().await;
    let goal = GoalService::new(&db).get(&GoalId(goal_id))?;
    Ok(Json(goal))
}

async fn update_goal(
    State(state): State<AppState>,
    Path(goal_id): Path<String>,
    update: Result<Json<GoalUpdate>, JsonRejection>,
) -> TrackerResult<Json<Goal>> {
    let Json(update) = update?;

    let db = state.db.lock().await;
    let goal = GoalService::new(&db).update(&GoalId(goal_id), update)?;
    Ok(Json(goal))
}

async fn delete_goal(
    State(state): State<AppState>,
    Path(goal_id): Path<String>,
) -> TrackerResult<Json<MessageResponse>> {
    let db = state.db.lock().await;
    GoalService::new(&db).delete(&GoalId(goal_id))?;

    Ok(Json(MessageResponse {
        message: "Goal deleted successfully".to_string(),
    }))
}

// ========== PROGRESS ==========

async fn list_goal_progress(
    State(state): State<AppState>,
    Path(goal_id): Path<String>,
) -> TrackerResult<Json<Vec<Progress>>> {
    let db = state.db.lock().await;
    let records = ProgressService::new(&db).list_for_goal(&GoalId(goal_id))?;
    Ok(Json(records))
}

async fn update_step_progress(
    State(state): State<AppState>,
    Path(goal_id): Path<String>,
    request: Result<Json<ProgressUpdateRequest>, JsonRejection>,
) -> TrackerResult<Json<ProgressUpdateResponse>> {
    let Json(request) = request?;
    info!(
        "Progress update: goal={}, step={}, completed={}",
        goal_id, request.step_index, request.completed
    );

    let db = state.db.lock().await;
    let progress_percentage = ProgressService::new(&db).update_step(&GoalId(goal_id), request)?;

    Ok(Json(ProgressUpdateResponse {
        message: "Progress updated successfully".to_string(),
        progress_percentage,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_values_mean_no_filter() {
        let filter = ListGoalsQuery {
            category_id: Some(String::new()),
            status: Some(String::new()),
        }
        .into_filter()
        .unwrap();

        assert!(filter.category_id.is_none());
        assert!(filter.status.is_none());
    }

    #[test]
    fn test_unknown_status_filter_is_rejected() {
        let result = ListGoalsQuery {
            category_id: None,
            status: Some("finished".into()),
        }
        .into_filter();

        assert!(matches!(result, Err(TrackerError::Validation(_))));
    }
}
