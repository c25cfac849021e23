//! Info command implementation

use anyhow::Result;
use sw_migrate::{MigrationState, ShardInfo, ShardOutcome};

use crate::cli::{GlobalArgs, InfoArgs, OutputFormat};
use crate::commands::common::{error_json, print_json, ExitCode};
use crate::context::RuntimeContext;

/// Execute the info command
pub(crate) async fn execute(args: &InfoArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::load(global)?;
    let orchestrator = ctx.orchestrator(&args.shards, None, args.target.as_deref())?;
    let outcomes = orchestrator.inspect().await;

    match args.output {
        OutputFormat::Text => print_text(&outcomes),
        OutputFormat::Json => {
            let items = outcomes
                .iter()
                .map(|o| match &o.result {
                    Ok(info) => serde_json::to_value(info),
                    Err(e) => Ok(serde_json::json!({
                        "shard": o.shard.as_str(),
                        "error": error_json(e),
                    })),
                })
                .collect::<Result<Vec<_>, _>>()?;
            print_json(&serde_json::Value::Array(items))?;
        }
    }

    let unhealthy = outcomes.iter().any(|o| match &o.result {
        Ok(info) => info.first_drift().is_some(),
        Err(_) => true,
    });
    if unhealthy {
        return Err(ExitCode(1).into());
    }
    Ok(())
}

fn print_text(outcomes: &[ShardOutcome<ShardInfo>]) {
    for outcome in outcomes {
        let info = match &outcome.result {
            Ok(info) => info,
            Err(e) => {
                println!("{}: {e}\n", outcome.shard);
                continue;
            }
        };
        println!(
            "{} ({} applied, {} pending)",
            info.shard,
            info.count(MigrationState::Applied),
            info.count(MigrationState::Pending)
        );
        for m in &info.migrations {
            let applied_at = m
                .applied_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default();
            println!(
                "  {:<14} {:<13} {:<30} {}",
                m.id.to_string(),
                m.state.to_string(),
                m.description,
                applied_at
            );
        }
        println!();
    }
}
