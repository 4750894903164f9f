use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, put},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use larder_core::db::Database;
use larder_core::models::{
    AtHomeItem, MealAssignment, MealPlan, NewRecipe, Recipe, validate_meal_type,
    validate_new_recipe,
};

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Database>>,
    api_key: Option<String>,
}

impl AppState {
    fn db(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct NoteRequest {
    note: String,
}

#[derive(Deserialize)]
struct ExtrasRequest {
    extras: Vec<String>,
}

#[derive(Deserialize)]
struct AtHomeRequest {
    name: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(err) => {
                error!(error = %format!("{err:#}"), "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

fn bad_request(err: &anyhow::Error) -> ApiError {
    ApiError::BadRequest(format!("{err:#}"))
}

fn parse_date(date: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid date '{date}'. Use YYYY-MM-DD")))
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Meal plan handlers ---
//
// Every mutation answers with the full plan so clients can reconcile their
// optimistic copy.

async fn get_meal_plan(State(state): State<AppState>) -> Result<Json<MealPlan>, ApiError> {
    let plan = state.db().get_meal_plan().context("database error")?;
    Ok(Json(plan))
}

async fn set_meal(
    State(state): State<AppState>,
    Path((date, meal_type)): Path<(String, String)>,
    Json(assignment): Json<MealAssignment>,
) -> Result<Json<MealPlan>, ApiError> {
    let date = parse_date(&date)?;
    let meal_type = validate_meal_type(&meal_type).map_err(|e| bad_request(&e))?;
    if let MealAssignment::FreeText { custom_text } = &assignment {
        if custom_text.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "custom_text must not be empty".to_string(),
            ));
        }
    }

    let db = state.db();
    db.upsert_meal(date, &meal_type, &assignment)
        .context("failed to save meal")?;
    Ok(Json(db.get_meal_plan().context("database error")?))
}

async fn remove_meal(
    State(state): State<AppState>,
    Path((date, meal_type)): Path<(String, String)>,
) -> Result<Json<MealPlan>, ApiError> {
    let date = parse_date(&date)?;
    let meal_type = validate_meal_type(&meal_type).map_err(|e| bad_request(&e))?;

    let db = state.db();
    // An already empty slot is settled, not missing.
    db.delete_meal(date, &meal_type)
        .context("failed to remove meal")?;
    Ok(Json(db.get_meal_plan().context("database error")?))
}

async fn set_note(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Json(req): Json<NoteRequest>,
) -> Result<Json<MealPlan>, ApiError> {
    let date = parse_date(&date)?;
    let db = state.db();
    db.upsert_note(date, &req.note)
        .context("failed to save note")?;
    Ok(Json(db.get_meal_plan().context("database error")?))
}

async fn set_extras(
    State(state): State<AppState>,
    Json(req): Json<ExtrasRequest>,
) -> Result<Json<MealPlan>, ApiError> {
    if req.extras.iter().any(|id| id.trim().is_empty()) {
        return Err(ApiError::BadRequest(
            "extras must not contain empty recipe ids".to_string(),
        ));
    }
    let db = state.db();
    db.replace_extras(&req.extras)
        .context("failed to save extras")?;
    Ok(Json(db.get_meal_plan().context("database error")?))
}

// --- Recipe handlers ---

async fn create_recipe(
    State(state): State<AppState>,
    Json(req): Json<NewRecipe>,
) -> Result<(StatusCode, Json<Recipe>), ApiError> {
    validate_new_recipe(&req).map_err(|e| bad_request(&e))?;
    let recipe = state
        .db()
        .create_recipe(&req)
        .context("failed to create recipe")?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn list_recipes(State(state): State<AppState>) -> Result<Json<Vec<Recipe>>, ApiError> {
    let recipes = state.db().list_recipes().context("database error")?;
    Ok(Json(recipes))
}

async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Recipe>, ApiError> {
    let recipe = state
        .db()
        .get_recipe(&id)
        .map_err(|_| ApiError::NotFound(format!("Recipe {id} not found")))?;
    Ok(Json(recipe))
}

async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state
        .db()
        .delete_recipe(&id)
        .context("failed to delete recipe")?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("Recipe {id} not found")))
    }
}

// --- At-home handlers ---

async fn list_at_home(State(state): State<AppState>) -> Result<Json<Vec<AtHomeItem>>, ApiError> {
    let items = state.db().list_at_home().context("database error")?;
    Ok(Json(items))
}

async fn add_at_home(
    State(state): State<AppState>,
    Json(req): Json<AtHomeRequest>,
) -> Result<StatusCode, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }
    let added = state
        .db()
        .add_at_home(&req.name)
        .context("failed to save at-home item")?;
    Ok(if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    })
}

async fn remove_at_home(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state
        .db()
        .remove_at_home(&name)
        .context("failed to remove at-home item")?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("'{name}' is not marked as at home")))
    }
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/meal-plan", get(get_meal_plan))
        .route(
            "/api/meal-plan/{date}/{meal_type}",
            put(set_meal).delete(remove_meal),
        )
        .route("/api/notes/{date}", put(set_note))
        .route("/api/extras", put(set_extras))
        .route("/api/recipes", get(list_recipes).post(create_recipe))
        .route("/api/recipes/{id}", get(get_recipe).delete(delete_recipe))
        .route("/api/at-home", get(list_at_home).post(add_at_home))
        .route("/api/at-home/{name}", delete(remove_at_home))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Router serving `db` as the household store.
pub(crate) fn household_router(db: Database, api_key: Option<String>) -> Router {
    build_router(AppState {
        db: Arc::new(Mutex::new(db)),
        api_key,
    })
}

// --- Server startup ---

pub async fn start_server(
    db: Database,
    port: u16,
    bind: &str,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    let app = household_router(db, api_key.clone());

    if let Some(ref key) = api_key {
        let shown: String = key.chars().take(4).collect();
        eprintln!("API key: {shown}... (see api_key file in data directory)");
    } else {
        warn!("authentication disabled (--no-auth), API is open to anyone");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        warn!(%bind, "listening with no authentication, any device on the network can change the meal plan");
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("Failed to bind {bind}:{port}"))?;
    info!(%bind, port, "household server listening");
    eprintln!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
