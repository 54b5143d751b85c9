//! `inkloom validate` -- structural checks for a submission file.
//!
//! Parses the file and runs the same graph validation the engine applies
//! before execution, without touching any model provider.

use std::path::Path;

use anyhow::Result;
use console::style;
use serde_json::json;

use super::run::load_submission;

pub async fn validate_workflow(file: &Path, json: bool) -> Result<()> {
    let submission = load_submission(file).await?;
    let (definition, _context) = submission.into_parts();
    let nodes = definition.nodes.len();
    let edges = definition.edges.len();

    match inkloom_core::workflow::validate(&definition) {
        Ok(()) => {
            if json {
                let report = json!({ "valid": true, "nodes": nodes, "edges": edges });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!();
                println!(
                    "  {} {} is valid ({} node{}, {} edge{})",
                    style("✓").green().bold(),
                    style(file.display()).cyan(),
                    nodes,
                    if nodes == 1 { "" } else { "s" },
                    edges,
                    if edges == 1 { "" } else { "s" },
                );
                println!();
            }
            Ok(())
        }
        Err(err) => {
            if json {
                let report = json!({ "valid": false, "error": err.to_string() });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!();
                println!("  {} {}", style("✗").red().bold(), err);
                println!();
            }
            anyhow::bail!("workflow validation failed")
        }
    }
}
