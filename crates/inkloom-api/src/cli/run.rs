//! `inkloom run` -- execute a workflow submission file from disk.
//!
//! Loads the submission JSON, runs it inline through the engine, and prints
//! node lifecycle events as they happen followed by the collected outputs.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use tokio::sync::broadcast::error::RecvError;

use inkloom_types::event::{NodeEventStatus, RunEvent};
use inkloom_types::workflow::{RunStatus, WorkflowRun, WorkflowSubmission};

use crate::state::AppState;

/// Load a submission file and run it to completion.
///
/// Returns an error (non-zero exit) when the file cannot be loaded, the
/// submission is structurally invalid, or the run fails.
pub async fn run_workflow(state: &AppState, file: &Path, json: bool, quiet: bool) -> Result<()> {
    let submission = load_submission(file).await?;

    // Print events live while the engine drives the run. JSON mode prints
    // only the final record.
    let show_events = !json && !quiet;
    let streaming = state.config.engine.stream_responses;
    let mut events = state.engine.events().subscribe();
    let (done_tx, mut done_rx) = tokio::sync::oneshot::channel::<()>();

    let printer = tokio::spawn(async move {
        let mut mid_stream = false;
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => {
                        if show_events {
                            print_event(&event, streaming, &mut mid_stream);
                        }
                    }
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
                _ = &mut done_rx => {
                    // Drain what was published before the run finished.
                    while let Ok(event) = events.try_recv() {
                        if show_events {
                            print_event(&event, streaming, &mut mid_stream);
                        }
                    }
                    break;
                }
            }
        }
    });

    let outcome = state.engine.execute(submission).await;
    let _ = done_tx.send(());
    let _ = printer.await;

    let run = outcome?;
    print_run(&run, json)?;

    if run.status == RunStatus::Failed {
        anyhow::bail!("workflow run failed");
    }
    Ok(())
}

/// Read and parse a submission JSON file.
pub async fn load_submission(file: &Path) -> Result<WorkflowSubmission> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read '{}'", file.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse '{}' as a workflow submission", file.display()))
}

/// Print one node lifecycle event.
///
/// In streaming mode, `processing` events carry response text in the
/// message and are printed inline; `mid_stream` tracks whether the cursor
/// sits on such an unfinished line.
fn print_event(event: &RunEvent, streaming: bool, mid_stream: &mut bool) {
    let node = &event.event;
    let inline_chunk = streaming && node.status == NodeEventStatus::Processing;
    if *mid_stream && !inline_chunk {
        println!();
        *mid_stream = false;
    }

    match node.status {
        NodeEventStatus::Started => {
            println!("  {} {}", style("*").dim(), node.message);
        }
        NodeEventStatus::Processing => {
            if streaming {
                print!("{}", node.message);
                let _ = std::io::stdout().flush();
                *mid_stream = true;
            } else {
                println!("    {}", style(&node.message).dim());
            }
        }
        NodeEventStatus::Completed => {
            println!("  {} {}", style("✓").green(), node.message);
        }
        NodeEventStatus::Failed => {
            println!("  {} {}", style("✗").red(), node.message);
            if let Some(error) = &node.error {
                println!("    {}", style(error).red());
            }
        }
    }
}

fn print_run(run: &WorkflowRun, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(run)?);
        return Ok(());
    }

    let short_id: String = run.run_id.to_string().chars().take(8).collect();
    println!();
    match run.status {
        RunStatus::Complete => println!(
            "  {} Run {} complete",
            style("✓").green().bold(),
            style(short_id).cyan()
        ),
        _ => println!(
            "  {} Run {} failed",
            style("✗").red().bold(),
            style(short_id).cyan()
        ),
    }
    println!("  Workflow: {}", style(&run.workflow_name).cyan());
    if let Some(error) = &run.error {
        println!("  Error: {}", style(error).red());
    }
    if let Some(finished) = run.finished_at {
        let elapsed = finished.signed_duration_since(run.started_at);
        println!(
            "  Elapsed: {:.1}s",
            elapsed.num_milliseconds() as f64 / 1000.0
        );
    }
    if !run.outputs.is_empty() {
        println!();
        println!("  Outputs ({} node{}):", run.outputs.len(), plural(run.outputs.len()));
        println!("{}", serde_json::to_string_pretty(&run.outputs)?);
    }
    println!();
    Ok(())
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}
