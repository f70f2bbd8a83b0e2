use anyhow::{Context, Result};
use genflow_application::WorkflowInstance;

pub async fn undo(instance: &WorkflowInstance) -> Result<()> {
    match instance.container().undo().await? {
        Some(result) => println!("✓ Back to {result}"),
        None => println!("Nothing to undo"),
    }
    Ok(())
}

pub async fn pick(instance: &WorkflowInstance, index: usize) -> Result<()> {
    let timeline = instance.container().snapshot().await.timeline();
    let result = timeline
        .get(index)
        .with_context(|| format!("No result at index {index} ({} available)", timeline.len()))?;
    instance
        .container()
        .select_history_entry(result, index)
        .await?;
    println!("✓ Current result is {result}");
    Ok(())
}
