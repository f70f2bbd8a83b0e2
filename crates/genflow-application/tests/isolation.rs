//! Workflow variants run independently of one another.

mod support;

use genflow_core::generation::{GenerateResponse, GenerationOutcome};
use genflow_core::session::SessionStore;
use genflow_core::workflow::WorkflowVariant;
use support::{harness, prepare, wait_until};

#[tokio::test]
async fn variants_submit_concurrently_with_separate_sessions() {
    let h = harness();
    let composite = h.registry.get(WorkflowVariant::Composite).await.unwrap();
    let try_on = h.registry.get(WorkflowVariant::TryOn).await.unwrap();
    prepare(&composite).await;
    prepare(&try_on).await;

    let release = h.service.hold_generate(WorkflowVariant::Composite);
    let running = tokio::spawn({
        let composite = composite.clone();
        async move { composite.submit().await }
    });
    wait_until(|| h.service.generate_count() == 1).await;
    assert!(composite.orchestrator().is_busy());
    assert!(!try_on.orchestrator().is_busy());

    // The held composite call has not taken its response yet.
    h.service
        .push_generate(Ok(GenerateResponse::Immediate("t1".into())));
    assert_eq!(
        try_on.submit().await.unwrap(),
        GenerationOutcome::Completed("t1".into())
    );
    assert!(composite.orchestrator().is_busy());
    assert!(
        composite
            .container()
            .snapshot()
            .await
            .current_result
            .is_none()
    );

    h.service
        .push_generate(Ok(GenerateResponse::Immediate("c1".into())));
    release.notify_one();
    assert_eq!(
        running.await.unwrap().unwrap(),
        GenerationOutcome::Completed("c1".into())
    );

    let stored_composite = h.store.load(WorkflowVariant::Composite).await.unwrap().unwrap();
    let stored_try_on = h.store.load(WorkflowVariant::TryOn).await.unwrap().unwrap();
    assert_eq!(stored_composite.current_result, Some("c1".into()));
    assert_eq!(stored_try_on.current_result, Some("t1".into()));
    assert_ne!(stored_composite.session_id, stored_try_on.session_id);
    // Credits are shared: both successes invalidated the same notifier.
    assert_eq!(h.notifier.count(), 2);
}

#[tokio::test]
async fn start_over_touches_only_its_variant() {
    let h = harness();
    let composite = h.registry.get(WorkflowVariant::Composite).await.unwrap();
    let swap = h.registry.get(WorkflowVariant::BackdropSwap).await.unwrap();
    prepare(&composite).await;
    prepare(&swap).await;

    h.registry
        .start_over(WorkflowVariant::Composite)
        .await
        .unwrap();

    assert!(composite.container().snapshot().await.inputs.is_empty());
    assert_eq!(swap.container().snapshot().await.inputs.len(), 1);
    assert!(h.store.load(WorkflowVariant::Composite).await.unwrap().is_none());
    assert!(h.store.load(WorkflowVariant::BackdropSwap).await.unwrap().is_some());
    assert_eq!(
        h.registry.loaded_variants().await,
        vec![WorkflowVariant::Composite, WorkflowVariant::BackdropSwap]
    );
}

#[tokio::test]
async fn registry_returns_the_same_instance() {
    let h = harness();
    let first = h.registry.get(WorkflowVariant::TryOn).await.unwrap();
    let second = h.registry.get(WorkflowVariant::TryOn).await.unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert_eq!(h.store.len().await, 0);
}
