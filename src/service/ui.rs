//! HTTP surface of the view
//!
//! * `GET /api/view` - the derived view
//! * `GET /api/teams` - all teams, sorted by id
//! * `GET /api/teams/:team` - one team with its roster
//! * `POST /api/bid` - submit a bid for the active lot
use crate::{
    auction::TeamSnapshot,
    event::Event,
    event_log,
    service::LoopService,
    view::{DerivedView, SharedView, SubmitError, TeamOverview},
};
use anyhow::{format_err, Context, Result};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use tokio::{runtime::Runtime, sync::oneshot};
use tracing::info;

#[derive(Clone)]
struct AppState {
    view: SharedView,
    event_writer: event_log::SharedWriter,
}

#[derive(Debug)]
pub enum ApiError {
    /// 404 - no such team
    NotFound(String),
    /// 409 - the view does not allow bidding right now
    Conflict(String),
    /// 500 - internal error
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "cannot_bid", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        let body = ErrorBody {
            error: error_type.into(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        ApiError::Conflict(err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(format!("{err:#}"))
    }
}

async fn get_view(State(state): State<AppState>) -> Json<DerivedView> {
    Json(state.view.lock().derived_view())
}

async fn get_teams(State(state): State<AppState>) -> Json<Vec<TeamOverview>> {
    Json(state.view.lock().teams_overview())
}

async fn get_team(
    State(state): State<AppState>,
    Path(team): Path<String>,
) -> Result<Json<TeamSnapshot>, ApiError> {
    let snapshot = state.view.lock().team(&team).cloned();
    snapshot
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("unknown team: {team}")))
}

async fn post_bid(State(state): State<AppState>) -> Result<Json<DerivedView>, ApiError> {
    submit_bid(&state.view, &state.event_writer).await.map(Json)
}

/// Start a submission and publish it on the log
///
/// A request that never makes it onto the log does not stay pending.
pub async fn submit_bid(
    view: &SharedView,
    event_writer: &event_log::SharedWriter,
) -> Result<DerivedView, ApiError> {
    let request = view.lock().submit_bid()?;

    let event_writer = event_writer.clone();
    let written = tokio::task::spawn_blocking(move || {
        event_writer.write(&[Event::Outbound(request)])
    })
    .await
    .map_err(|e| format_err!("bid writer task failed: {e}"))
    .and_then(|res| res);

    if let Err(e) = written {
        view.lock().abandon_submission(&e.to_string());
        return Err(e.into());
    }

    Ok(view.lock().derived_view())
}

pub fn router(view: SharedView, event_writer: event_log::SharedWriter) -> Router {
    Router::new()
        .route("/api/view", get(get_view))
        .route("/api/teams", get(get_teams))
        .route("/api/teams/:team", get(get_team))
        .route("/api/bid", post(post_bid))
        .with_state(AppState { view, event_writer })
}

async fn run_http_server(
    addr: SocketAddr,
    view: SharedView,
    event_writer: event_log::SharedWriter,
) -> Result<()> {
    let app = router(view, event_writer);

    info!(%addr, "serving view");
    axum::Server::try_bind(&addr)?
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

pub struct Ui {
    // cancels all tasks on drop
    _runtime: Runtime,
    server_rx: oneshot::Receiver<Result<()>>,
}

impl Ui {
    pub fn new(
        addr: SocketAddr,
        view: SharedView,
        event_writer: event_log::SharedWriter,
    ) -> Result<Self> {
        let runtime = Runtime::new()?;

        let (tx, rx) = oneshot::channel();

        runtime.spawn(async move {
            // the receiver is gone only if the service already stopped
            let _ = tx.send(
                run_http_server(addr, view, event_writer)
                    .await
                    .with_context(|| format!("Failed to run http server on {addr}")),
            );
        });

        Ok(Self {
            _runtime: runtime,
            server_rx: rx,
        })
    }
}

impl LoopService for Ui {
    fn run_iteration(&mut self) -> Result<()> {
        // don't hog the cpu
        std::thread::sleep(std::time::Duration::from_millis(100));

        match self.server_rx.try_recv() {
            Ok(res) => res,
            Err(oneshot::error::TryRecvError::Empty) => Ok(()),
            Err(oneshot::error::TryRecvError::Closed) => {
                Err(format_err!("ui server died without leaving a response?!"))
            }
        }
    }
}
