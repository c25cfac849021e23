//! Migrate command implementation

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use sw_migrate::{CancelFlag, RunReport, ShardStatus};

use crate::cli::{GlobalArgs, MigrateArgs, OutputFormat};
use crate::commands::common::{error_json, print_json, ExitCode};
use crate::context::RuntimeContext;

/// Execute the migrate command
pub(crate) async fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::load(global)?;
    let orchestrator = ctx.orchestrator(&args.shards, args.threads, args.target.as_deref())?;

    let cancel = CancelFlag::new();
    // Ctrl-C lets in-flight migrations finish and starts nothing new
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, finishing in-flight migrations");
            on_signal.cancel();
        }
    });

    let progress = if !args.quiet && args.output == OutputFormat::Text {
        let pb = ProgressBar::new(orchestrator.registry().len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({msg})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let orchestrator = match &progress {
        Some(pb) => {
            let pb = pb.clone();
            orchestrator.with_progress(move |report| {
                pb.set_message(format!("{} {}", report.shard, report.status));
                pb.inc(1);
            })
        }
        None => orchestrator,
    };

    let report = orchestrator.run(&cancel).await;

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    match args.output {
        OutputFormat::Text => print_text(&report),
        OutputFormat::Json => print_json(&report_json(&report))?,
    }

    if !report.is_success() {
        return Err(ExitCode(1).into());
    }
    Ok(())
}

fn print_text(report: &RunReport) {
    println!("Run {}", report.run_id);
    for shard in &report.shards {
        match shard.status {
            ShardStatus::Succeeded if shard.applied.is_empty() => {
                println!("  {}: up to date", shard.shard);
            }
            ShardStatus::Succeeded => {
                println!(
                    "  {}: applied {} ({}ms)",
                    shard.shard,
                    shard.applied.len(),
                    shard.duration_ms
                );
            }
            ShardStatus::Failed => {
                let message = shard
                    .error
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                println!(
                    "  {}: FAILED after {} applied: {message}",
                    shard.shard,
                    shard.applied.len()
                );
            }
            ShardStatus::Cancelled => {
                println!(
                    "  {}: cancelled after {} applied",
                    shard.shard,
                    shard.applied.len()
                );
            }
        }
        for id in &shard.applied {
            println!("      {id}");
        }
    }
    println!(
        "\n{} succeeded, {} failed, {} cancelled; {} migrations applied",
        report.count(ShardStatus::Succeeded),
        report.count(ShardStatus::Failed),
        report.count(ShardStatus::Cancelled),
        report.total_applied()
    );
}

fn report_json(report: &RunReport) -> serde_json::Value {
    let shards: Vec<serde_json::Value> = report
        .shards
        .iter()
        .map(|s| {
            serde_json::json!({
                "shard": s.shard.as_str(),
                "status": s.status,
                "applied": s.applied.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "duration_ms": s.duration_ms,
                "error": s.error.as_ref().map(error_json),
            })
        })
        .collect();
    serde_json::json!({
        "run_id": report.run_id,
        "started_at": report.started_at.to_rfc3339(),
        "finished_at": report.finished_at.to_rfc3339(),
        "success": report.is_success(),
        "total_applied": report.total_applied(),
        "shards": shards,
    })
}
