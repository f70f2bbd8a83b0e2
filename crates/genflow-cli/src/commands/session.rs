use anyhow::{Context, Result, bail};
use genflow_application::WorkflowInstance;
use genflow_core::session::{AspectRatio, CatalogId, Resolution};
use genflow_infrastructure::load_image_as_data_uri;
use std::path::Path;

pub async fn show(instance: &WorkflowInstance) -> Result<()> {
    let session = instance.container().snapshot().await;
    let variant = instance.variant();
    let steps = variant.steps();

    println!("{} (session {})", variant, session.session_id);
    for (index, step) in steps.iter().enumerate() {
        let marker = if index == session.current_step() {
            ">"
        } else if index <= session.max_unlocked_step() {
            " "
        } else {
            "x"
        };
        println!("  {marker} {index}. {}", step.name);
    }

    println!("Inputs:");
    if session.inputs.is_empty() {
        println!("  (none)");
    }
    for (slot, data) in &session.inputs {
        println!("  [{slot}] {} bytes", data.len());
    }
    if let Some(subject) = &session.selections.subject_id {
        println!("Subject:     {subject}");
    }
    if let Some(backdrop) = &session.selections.backdrop_id {
        println!("Backdrop:    {backdrop}");
    }
    println!(
        "Output:      {} @ {}",
        session.output_prefs.aspect_ratio.as_str(),
        session.output_prefs.resolution.as_str()
    );
    if !session.instruction_text.is_empty() {
        println!("Instruction: {}", session.instruction_text);
    }
    if session.is_edit_mode {
        println!("Edit mode:   on");
    }

    let timeline = session.timeline();
    if !timeline.is_empty() {
        println!("Results:");
        let current = timeline.len() - 1;
        for (index, result) in timeline.iter().enumerate() {
            let marker = if index == current { "*" } else { " " };
            println!("  {marker} {index}. {result}");
        }
    }
    Ok(())
}

pub async fn upload(instance: &WorkflowInstance, slot: u8, file: &Path) -> Result<()> {
    let data = load_image_as_data_uri(file)
        .await
        .with_context(|| format!("Failed to load {}", file.display()))?;
    instance.container().set_input(slot, data).await?;
    println!("✓ Slot {slot} set from {}", file.display());
    Ok(())
}

pub async fn remove(instance: &WorkflowInstance, slot: u8) -> Result<()> {
    match instance.container().remove_input(slot).await? {
        Some(_) => println!("✓ Slot {slot} cleared"),
        None => println!("Slot {slot} was empty"),
    }
    Ok(())
}

pub async fn subject(instance: &WorkflowInstance, id: &str) -> Result<()> {
    let id = CatalogId::parse(id);
    instance.container().select_subject(Some(id.clone())).await?;
    println!("✓ Subject {id} selected");
    Ok(())
}

pub async fn backdrop(instance: &WorkflowInstance, id: &str) -> Result<()> {
    let id = CatalogId::parse(id);
    instance.container().select_backdrop(Some(id.clone())).await?;
    println!("✓ Backdrop {id} selected");
    Ok(())
}

pub async fn instruct(instance: &WorkflowInstance, text: String) -> Result<()> {
    instance.container().set_instruction(text).await?;
    println!("✓ Instruction saved");
    Ok(())
}

pub async fn prefs(
    instance: &WorkflowInstance,
    aspect_ratio: Option<&str>,
    resolution: Option<&str>,
) -> Result<()> {
    let mut prefs = instance.container().snapshot().await.output_prefs;
    if let Some(raw) = aspect_ratio {
        prefs.aspect_ratio = AspectRatio::parse(raw).with_context(|| {
            let known: Vec<_> = AspectRatio::ALL.iter().map(|r| r.as_str()).collect();
            format!("Unknown aspect ratio '{raw}' (expected one of {})", known.join(", "))
        })?;
    }
    if let Some(raw) = resolution {
        prefs.resolution = Resolution::parse(raw).with_context(|| {
            let known: Vec<_> = Resolution::ALL.iter().map(|r| r.as_str()).collect();
            format!("Unknown resolution '{raw}' (expected one of {})", known.join(", "))
        })?;
    }
    instance.container().set_output_prefs(prefs).await?;
    println!(
        "✓ Output {} @ {}",
        prefs.aspect_ratio.as_str(),
        prefs.resolution.as_str()
    );
    Ok(())
}

pub async fn goto(instance: &WorkflowInstance, step: &str) -> Result<()> {
    let variant = instance.variant();
    let target = match step.parse::<usize>() {
        Ok(index) => index,
        Err(_) => variant
            .step_index(step)
            .with_context(|| format!("'{variant}' has no step named '{step}'"))?,
    };
    if !instance.container().go_to(target).await? {
        bail!("Step {target} is not unlocked yet");
    }
    println!("✓ At step {target} ({})", variant.steps()[target].name);
    Ok(())
}

pub async fn start_over(instance: &WorkflowInstance) -> Result<()> {
    instance.start_over().await?;
    println!("✓ Started over '{}'", instance.variant());
    Ok(())
}
