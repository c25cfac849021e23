//! Validate command implementation

use anyhow::Result;

use crate::cli::{GlobalArgs, OutputFormat, ValidateArgs};
use crate::commands::common::{error_json, print_json, ExitCode};
use crate::context::RuntimeContext;

/// Execute the validate command
pub(crate) async fn execute(args: &ValidateArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::load(global)?;
    let orchestrator = ctx.orchestrator(&args.shards, None, None)?;
    let outcomes = orchestrator.validate().await;
    let failures = outcomes.iter().filter(|o| o.result.is_err()).count();

    match args.output {
        OutputFormat::Text => {
            for outcome in &outcomes {
                match &outcome.result {
                    Ok(()) => println!("  {}: ok", outcome.shard),
                    Err(e) => println!("  {}: {e}", outcome.shard),
                }
            }
            if failures == 0 {
                println!("\nAll {} shards match the migration catalog", outcomes.len());
            } else {
                println!("\n{failures} of {} shards failed validation", outcomes.len());
            }
        }
        OutputFormat::Json => {
            let items: Vec<serde_json::Value> = outcomes
                .iter()
                .map(|o| {
                    serde_json::json!({
                        "shard": o.shard.as_str(),
                        "valid": o.result.is_ok(),
                        "error": o.result.as_ref().err().map(error_json),
                    })
                })
                .collect();
            print_json(&serde_json::Value::Array(items))?;
        }
    }

    if failures > 0 {
        return Err(ExitCode(1).into());
    }
    Ok(())
}
