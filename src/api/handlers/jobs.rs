//! Job administration request handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::api::dto::{
    CancelResponse, JobResponse, PagedResponse, PaginationParams, RunResponse,
    RunSummaryResponse, TriggerResponse, UpcomingParams, UpcomingResponse,
};
use crate::error::AppResult;
use crate::state::AppState;
use crate::utils::validate::ValidatedQuery;

/// Creates job-related routes.
pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_jobs))
        .route("/{id}", get(get_job))
        .route("/{id}/trigger", post(trigger_job))
        .route("/{id}/cancel", post(cancel_job))
        .route("/{id}/enable", post(enable_job))
        .route("/{id}/disable", post(disable_job))
        .route("/{id}/upcoming", get(upcoming_fires))
        .route("/{id}/runs", get(list_job_runs))
        .route("/{id}/runs/{run_id}", get(get_job_run))
}

/// GET /api/jobs - List all registered jobs
async fn list_jobs(State(state): State<AppState>) -> Json<Vec<JobResponse>> {
    let jobs = state.services.jobs.list_jobs();
    Json(jobs.into_iter().map(JobResponse::from).collect())
}

/// GET /api/jobs/{id}
async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<JobResponse>> {
    let job = state.services.jobs.get_job(id)?;
    Ok(Json(JobResponse::from(job)))
}

/// POST /api/jobs/{id}/trigger - Start a manual run
///
/// Responds 202 with the run id; 409 if the job is already running.
async fn trigger_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<TriggerResponse>)> {
    let run = state.services.jobs.trigger(id)?;
    Ok((StatusCode::ACCEPTED, Json(TriggerResponse::from(run))))
}

/// POST /api/jobs/{id}/cancel - Request cancellation of the current run
async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<CancelResponse>> {
    let cancelled = state.services.jobs.cancel(id)?;
    Ok(Json(CancelResponse {
        job_id: id,
        cancelled,
    }))
}

/// POST /api/jobs/{id}/enable
async fn enable_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<JobResponse>> {
    let job = state.services.jobs.enable(id)?;
    Ok(Json(JobResponse::from(job)))
}

/// POST /api/jobs/{id}/disable
async fn disable_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<JobResponse>> {
    let job = state.services.jobs.disable(id)?;
    Ok(Json(JobResponse::from(job)))
}

/// GET /api/jobs/{id}/upcoming?count=N
async fn upcoming_fires(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedQuery(params): ValidatedQuery<UpcomingParams>,
) -> AppResult<Json<UpcomingResponse>> {
    let jobs = &state.services.jobs;
    let fire_times = jobs.upcoming(id, params.count)?;
    let timezone = jobs
        .scheduler()
        .registry()
        .timezone()
        .iana_name()
        .unwrap_or("UTC")
        .to_string();

    Ok(Json(UpcomingResponse {
        job_id: id,
        timezone,
        fire_times,
    }))
}

/// GET /api/jobs/{id}/runs - Run history, newest first
async fn list_job_runs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidatedQuery(params): ValidatedQuery<PaginationParams>,
) -> AppResult<Json<PagedResponse<RunSummaryResponse>>> {
    let (runs, total) = state
        .services
        .jobs
        .list_runs(id, params.offset(), params.limit())?;

    let data = runs.into_iter().map(RunSummaryResponse::from).collect();
    Ok(Json(PagedResponse::new(data, &params, total as u64)))
}

/// GET /api/jobs/{id}/runs/{run_id} - One run including its log
async fn get_job_run(
    State(state): State<AppState>,
    Path((id, run_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<RunResponse>> {
    let run = state.services.jobs.get_run(id, run_id)?;
    Ok(Json(RunResponse::from(run)))
}
