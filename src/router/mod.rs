//! REST surface of the scheduler under `/api/v1`.

mod response;

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Json, Path, State};
use axum::routing::{get, post};
use serde::de::DeserializeOwned;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::error::ApiError;
use crate::handler::{BatchHandler, HandlerContext, JobHandler};
use crate::models::schedule::{BatchScheduleDescription, JobScheduleDescription};
use crate::models::status::{BatchStatus, JobStatus, Status};
use crate::store::ResourceStore;

pub struct AppState<S> {
    pub batches: BatchHandler<S>,
    pub jobs: JobHandler<S>,
}

impl<S: ResourceStore> AppState<S> {
    pub fn new(context: Arc<HandlerContext<S>>) -> Self {
        AppState {
            batches: BatchHandler::new(Arc::clone(&context)),
            jobs: JobHandler::new(context),
        }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        AppState {
            batches: self.batches.clone(),
            jobs: self.jobs.clone(),
        }
    }
}

pub fn router<S: ResourceStore>(state: AppState<S>) -> Router {
    let api = Router::new()
        .route(
            "/batches",
            post(create_batch::<S>).get(get_batches::<S>),
        )
        .route(
            "/batches/{batch_name}",
            get(get_batch::<S>).delete(delete_batch::<S>),
        )
        .route("/batches/{batch_name}/stop", post(stop_batch::<S>))
        .route(
            "/batches/{batch_name}/jobs/{job_name}/stop",
            post(stop_batch_job::<S>),
        )
        .route("/jobs", post(create_job::<S>).get(get_jobs::<S>))
        .route(
            "/jobs/{job_name}",
            get(get_job::<S>).delete(delete_job::<S>),
        );

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Parses a create request body. An empty body means "all defaults".
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes, kind: &str) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::invalid(kind, e))
}

async fn create_batch<S: ResourceStore>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> Result<Json<BatchStatus>, ApiError> {
    let description: BatchScheduleDescription = parse_body(&body, "BatchScheduleDescription")?;
    let status = state.batches.create_batch(&description).await?;

    if let Err(e) = state.batches.maintain_history_limit().await {
        warn!("Failed to maintain batch history limit: {e}");
    }
    Ok(Json(status))
}

async fn get_batches<S: ResourceStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<BatchStatus>>, ApiError> {
    Ok(Json(state.batches.get_batches().await?))
}

async fn get_batch<S: ResourceStore>(
    State(state): State<AppState<S>>,
    Path(batch_name): Path<String>,
) -> Result<Json<BatchStatus>, ApiError> {
    Ok(Json(state.batches.get_batch(&batch_name).await?))
}

async fn delete_batch<S: ResourceStore>(
    State(state): State<AppState<S>>,
    Path(batch_name): Path<String>,
) -> Result<Json<Status>, ApiError> {
    state.batches.delete_batch(&batch_name).await?;
    Ok(Json(Status::success(format!(
        "batch {batch_name} successfully deleted"
    ))))
}

async fn stop_batch<S: ResourceStore>(
    State(state): State<AppState<S>>,
    Path(batch_name): Path<String>,
) -> Result<Json<Status>, ApiError> {
    state.batches.stop_batch(&batch_name).await?;
    Ok(Json(Status::success(format!(
        "batch {batch_name} successfully stopped"
    ))))
}

async fn stop_batch_job<S: ResourceStore>(
    State(state): State<AppState<S>>,
    Path((batch_name, job_name)): Path<(String, String)>,
) -> Result<Json<Status>, ApiError> {
    state.batches.stop_batch_job(&batch_name, &job_name).await?;
    Ok(Json(Status::success(format!(
        "job {job_name} in batch {batch_name} successfully stopped"
    ))))
}

async fn create_job<S: ResourceStore>(
    State(state): State<AppState<S>>,
    body: Bytes,
) -> Result<Json<JobStatus>, ApiError> {
    let description: JobScheduleDescription = parse_body(&body, "JobScheduleDescription")?;
    let status = state.jobs.create_job(&description).await?;

    if let Err(e) = state.jobs.maintain_history_limit().await {
        warn!("Failed to maintain job history limit: {e}");
    }
    Ok(Json(status))
}

async fn get_jobs<S: ResourceStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<JobStatus>>, ApiError> {
    Ok(Json(state.jobs.get_jobs().await?))
}

async fn get_job<S: ResourceStore>(
    State(state): State<AppState<S>>,
    Path(job_name): Path<String>,
) -> Result<Json<JobStatus>, ApiError> {
    Ok(Json(state.jobs.get_job(&job_name).await?))
}

async fn delete_job<S: ResourceStore>(
    State(state): State<AppState<S>>,
    Path(job_name): Path<String>,
) -> Result<Json<Status>, ApiError> {
    state.jobs.delete_job(&job_name).await?;
    Ok(Json(Status::success(format!(
        "job {job_name} successfully deleted"
    ))))
}
