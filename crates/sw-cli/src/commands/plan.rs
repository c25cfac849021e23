//! Plan command implementation

use anyhow::Result;
use sw_migrate::{ApplyPlan, ShardOutcome};

use crate::cli::{GlobalArgs, OutputFormat, PlanArgs};
use crate::commands::common::{error_json, print_json, ExitCode};
use crate::context::RuntimeContext;

/// Execute the plan command
pub(crate) async fn execute(args: &PlanArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::load(global)?;
    let orchestrator = ctx.orchestrator(&args.shards, None, args.target.as_deref())?;
    let outcomes = orchestrator.plan().await;

    match args.output {
        OutputFormat::Text => print_text(&outcomes),
        OutputFormat::Json => {
            let items: Vec<serde_json::Value> = outcomes.iter().map(outcome_json).collect();
            print_json(&serde_json::Value::Array(items))?;
        }
    }

    if outcomes.iter().any(|o| o.result.is_err()) {
        return Err(ExitCode(1).into());
    }
    Ok(())
}

fn print_text(outcomes: &[ShardOutcome<ApplyPlan>]) {
    for outcome in outcomes {
        match &outcome.result {
            Ok(plan) if plan.is_empty() => println!("{}: up to date", outcome.shard),
            Ok(plan) => {
                println!("{}: {} pending", outcome.shard, plan.len());
                for script in plan.pending() {
                    println!(
                        "  {:<14} {:<30} ({})",
                        script.id().to_string(),
                        script.description(),
                        script.file_name()
                    );
                }
            }
            Err(e) => println!("{}: {e}", outcome.shard),
        }
    }
}

fn outcome_json(outcome: &ShardOutcome<ApplyPlan>) -> serde_json::Value {
    match &outcome.result {
        Ok(plan) => {
            let pending: Vec<serde_json::Value> = plan
                .pending()
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "id": s.id().to_string(),
                        "description": s.description(),
                        "file": s.file_name(),
                        "checksum": s.checksum(),
                    })
                })
                .collect();
            let unknown: Vec<String> = plan.unknown().iter().map(ToString::to_string).collect();
            serde_json::json!({
                "shard": outcome.shard.as_str(),
                "pending": pending,
                "unknown": unknown,
            })
        }
        Err(e) => serde_json::json!({
            "shard": outcome.shard.as_str(),
            "error": error_json(e),
        }),
    }
}
