//! Workflow execution and run inspection handlers.

use std::convert::Infallible;
use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::Stream;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use inkloom_types::event::NodeEventStatus;
use inkloom_types::workflow::WorkflowSubmission;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/workflows/execute - Validate a submission and start a run.
///
/// Structural errors come back as 400 before anything executes; otherwise
/// the run is dispatched in the background and 202 carries its id.
pub async fn execute_workflow(
    State(state): State<AppState>,
    Json(body): Json<WorkflowSubmission>,
) -> Result<(StatusCode, Json<ApiResponse<serde_json::Value>>), AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let run_id = state.engine.submit(body)?;
    let elapsed = start.elapsed().as_millis() as u64;

    let resp = ApiResponse::success(json!({ "run_id": run_id.to_string() }), request_id, elapsed)
        .with_link("self", &format!("/api/v1/runs/{run_id}"))
        .with_link("events", &format!("/api/v1/runs/{run_id}/events"));

    Ok((StatusCode::ACCEPTED, Json(resp)))
}

/// GET /api/v1/runs - List run records, newest first.
pub async fn list_runs(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<serde_json::Value>>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let runs = state.engine.runs();
    let elapsed = start.elapsed().as_millis() as u64;

    let runs_json: Vec<serde_json::Value> = runs
        .iter()
        .map(|r| serde_json::to_value(r).unwrap())
        .collect();

    let resp = ApiResponse::success(runs_json, request_id, elapsed).with_link("self", "/api/v1/runs");

    Ok(Json(resp))
}

/// GET /api/v1/runs/:run_id - Poll the current run record.
pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let run = state
        .engine
        .run(&run_id)
        .ok_or(AppError::RunNotFound(run_id))?;
    let elapsed = start.elapsed().as_millis() as u64;

    let run_json = serde_json::to_value(&run).unwrap();
    let resp = ApiResponse::success(run_json, request_id, elapsed)
        .with_link("self", &format!("/api/v1/runs/{run_id}"))
        .with_link("events", &format!("/api/v1/runs/{run_id}/events"));

    Ok(Json(resp))
}

/// GET /api/v1/runs/:run_id/events - SSE stream of node lifecycle events.
///
/// Forwards this run's events as they are published and closes with a
/// `done` event carrying the final run record once the run is terminal.
pub async fn run_events(
    State(state): State<AppState>,
    Path(run_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if state.engine.run(&run_id).is_none() {
        return Err(AppError::RunNotFound(run_id));
    }

    // Subscribe before checking terminality so no event can slip between.
    let mut events = state.engine.events().subscribe();
    let engine = state.engine.clone();

    let sse_stream = async_stream::stream! {
        // The run record goes terminal strictly after the last node event,
        // so polling it between receives is a safe close condition.
        let mut poll = tokio::time::interval(Duration::from_millis(500));
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) if event.run_id == run_id => {
                        yield Ok::<_, Infallible>(
                            Event::default()
                                .event(event_name(event.event.status))
                                .data(serde_json::to_string(&event).unwrap_or_default()),
                        );
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(%run_id, skipped, "SSE subscriber lagged behind the event bus");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = poll.tick() => {}
            }

            if let Some(run) = engine.run(&run_id) {
                if run.status.is_terminal() {
                    // Flush anything still buffered for this run before closing.
                    while let Ok(event) = events.try_recv() {
                        if event.run_id == run_id {
                            yield Ok(Event::default()
                                .event(event_name(event.event.status))
                                .data(serde_json::to_string(&event).unwrap_or_default()));
                        }
                    }
                    yield Ok(Event::default()
                        .event("done")
                        .data(serde_json::to_string(&run).unwrap_or_default()));
                    break;
                }
            }
        }
    };

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

fn event_name(status: NodeEventStatus) -> &'static str {
    match status {
        NodeEventStatus::Started => "started",
        NodeEventStatus::Processing => "processing",
        NodeEventStatus::Completed => "completed",
        NodeEventStatus::Failed => "failed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_match_wire_statuses() {
        assert_eq!(event_name(NodeEventStatus::Started), "started");
        assert_eq!(event_name(NodeEventStatus::Processing), "processing");
        assert_eq!(event_name(NodeEventStatus::Completed), "completed");
        assert_eq!(event_name(NodeEventStatus::Failed), "failed");
    }
}
