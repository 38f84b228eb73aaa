// 🌐 Dashboard HTTP API
// Axum routes over the chart builders and per-viewer animation sessions

use crate::animation::{AnimationController, AnimationFrame};
use crate::dashboard::Dashboard;
use crate::session::SessionRegistry;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Dashboard,
    pub sessions: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(dashboard: Dashboard, sessions: SessionRegistry) -> Self {
        AppState {
            dashboard,
            sessions: Arc::new(sessions),
        }
    }
}

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<Value> {
    fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Value::Null,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChoroplethQuery {
    pub year: i32,
    pub battery_capacity: u32,
    pub daily_cycle_limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct BubbleQuery {
    pub battery_capacity: u32,
    pub daily_cycle_limit: u32,
}

/// Body of the play/pause call.
///
/// `playing` is the play flag the page last saw; when present, an expired
/// session is resumed with it instead of answering 404.
#[derive(Debug, Default, Deserialize)]
pub struct ToggleRequest {
    #[serde(default)]
    pub n_clicks: Option<u64>,
    #[serde(default)]
    pub playing: Option<bool>,
}

/// Body of the tick and year calls
#[derive(Debug, Deserialize)]
pub struct FrameRequest {
    pub year: i32,
    pub battery_capacity: u32,
    pub daily_cycle_limit: u32,
    #[serde(default)]
    pub playing: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub frame: AnimationFrame,
}

/// Next year/play flag plus the map for that year
#[derive(Debug, Serialize)]
pub struct FrameResponse {
    pub frame: AnimationFrame,
    pub figure: Value,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/options - Control values and defaults
async fn get_options(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(state.dashboard.options().clone()))
}

/// GET /api/summary - Dataset overview
async fn get_summary(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::ok(state.dashboard.summary()))
}

/// GET /api/choropleth - Map for one (year, capacity, cycle limit) slice
async fn get_choropleth(
    State(state): State<AppState>,
    Query(query): Query<ChoroplethQuery>,
) -> impl IntoResponse {
    let figure = state
        .dashboard
        .choropleth()
        .build(query.year, query.battery_capacity, query.daily_cycle_limit);
    Json(ApiResponse::ok(figure.to_plotly()))
}

/// GET /api/bubble - Bubble chart across all years
async fn get_bubble(State(state): State<AppState>, Query(query): Query<BubbleQuery>) -> impl IntoResponse {
    let figure = state
        .dashboard
        .bubble()
        .build(query.battery_capacity, query.daily_cycle_limit);
    Json(ApiResponse::ok(figure.to_plotly()))
}

/// POST /api/sessions - Start a paused animation session
async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let (session_id, frame) = state.sessions.create(state.dashboard.new_controller());
    (
        StatusCode::CREATED,
        Json(ApiResponse::ok(SessionResponse { session_id, frame })),
    )
}

/// POST /api/sessions/:id/toggle - Play/pause button
async fn toggle_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ToggleRequest>,
) -> Response {
    match run_session(&state, id, request.playing, |c| c.toggle(request.n_clicks)) {
        Some(frame) => Json(ApiResponse::ok(frame)).into_response(),
        None => session_not_found(&id),
    }
}

/// POST /api/sessions/:id/tick - Timer tick; advances the year while playing
async fn tick_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<FrameRequest>,
) -> Response {
    let frame = run_session(&state, id, request.playing, |c| c.tick(request.year));
    frame_response(&state, &id, frame, &request)
}

/// POST /api/sessions/:id/year - Manual year selection
async fn select_session_year(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<FrameRequest>,
) -> Response {
    let frame = run_session(&state, id, request.playing, |c| c.select_year(request.year));
    frame_response(&state, &id, frame, &request)
}

/// Run `f` on the session; with a known play flag an expired session is
/// resumed under the same id
fn run_session<T>(
    state: &AppState,
    id: Uuid,
    playing: Option<bool>,
    f: impl FnOnce(&mut AnimationController) -> T,
) -> Option<T> {
    match playing {
        Some(playing) => Some(state.sessions.with_session_or_resume(
            id,
            || state.dashboard.resumed_controller(playing),
            f,
        )),
        None => state.sessions.with_session(&id, f),
    }
}

fn frame_response(
    state: &AppState,
    id: &Uuid,
    frame: Option<AnimationFrame>,
    request: &FrameRequest,
) -> Response {
    let Some(frame) = frame else {
        return session_not_found(id);
    };
    // session lock is released; build outside it
    let figure = state
        .dashboard
        .choropleth()
        .build(frame.year, request.battery_capacity, request.daily_cycle_limit)
        .to_plotly();
    Json(ApiResponse::ok(FrameResponse { frame, figure })).into_response()
}

fn session_not_found(id: &Uuid) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::error(format!("Unknown animation session: {}", id))),
    )
        .into_response()
}

/// GET / - Serve the dashboard page
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/options", get(get_options))
        .route("/summary", get(get_summary))
        .route("/choropleth", get(get_choropleth))
        .route("/bubble", get(get_bubble))
        .route("/sessions", post(create_session))
        .route("/sessions/:id/toggle", post(toggle_session))
        .route("/sessions/:id/tick", post(tick_session))
        .route("/sessions/:id/year", post(select_session_year))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
