//! Unlock command implementation

use anyhow::Result;

use crate::cli::{GlobalArgs, UnlockArgs};
use crate::context::RuntimeContext;

/// Execute the unlock command
pub(crate) async fn execute(args: &UnlockArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::load(global)?;
    let orchestrator = ctx.orchestrator(&None, None, None)?;

    match orchestrator.unlock(&args.shard).await? {
        Some(owner) => println!("Released lock on {} held by {owner}", args.shard),
        None => println!("Shard {} was not locked", args.shard),
    }
    Ok(())
}
