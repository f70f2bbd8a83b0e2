use anyhow::Result;
use genflow_application::{AdvanceOutcome, GenflowEngine, StatusCallback, WorkflowInstance};
use genflow_core::generation::{GenerationOutcome, JobStatus, Presentation, Recovery};
use std::sync::Arc;

fn progress() -> StatusCallback {
    Arc::new(|status: &JobStatus| eprintln!("  … job {:?}", status.status))
}

pub async fn next(instance: &WorkflowInstance) -> Result<()> {
    match instance.advance_with_status(Some(progress())).await? {
        AdvanceOutcome::Moved(step) => {
            println!("✓ At step {step} ({})", instance.variant().steps()[step].name);
        }
        AdvanceOutcome::Submitted(outcome) => report(&outcome),
    }
    Ok(())
}

pub async fn generate(instance: &WorkflowInstance) -> Result<()> {
    println!("🎨 Generating '{}'...", instance.variant());
    let outcome = instance
        .orchestrator()
        .submit_with_status(Some(progress()))
        .await?;
    report(&outcome);
    Ok(())
}

pub async fn credits(engine: &GenflowEngine) -> Result<()> {
    let remaining = engine.credits.remaining().await?;
    println!("Credits remaining: {remaining}");
    Ok(())
}

fn report(outcome: &GenerationOutcome) {
    match outcome.presentation() {
        Presentation::Result(result) => println!("✅ Result: {result}"),
        Presentation::Inline {
            message,
            recovery,
            retry_after,
        } => {
            println!("❌ {message}");
            match (recovery, retry_after) {
                (Recovery::LogIn, _) => println!("💡 Log in and run the command again."),
                (_, Some(wait)) => println!("💡 Retry in {}s.", wait.as_secs()),
                _ => println!("💡 Run the command again to retry."),
            }
        }
        Presentation::UpgradeDialog {
            available,
            required,
        } => {
            println!("💳 Not enough credits: {available} available, {required} required.");
            println!("💡 Upgrade your plan to continue.");
        }
    }
}
