use genflow_core::error::{GenflowError, Result};
use genflow_core::session::{
    CatalogId, ImageData, OutputPrefs, ResultRef, SessionStore, SlotId, WorkflowSession,
};
use genflow_core::workflow::{GateAdvance, WorkflowVariant};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// What a submission captured when it started.
///
/// The session is a snapshot: edits made while the submission runs do not
/// change the request being sent.
#[derive(Debug, Clone)]
pub struct SubmissionTicket {
    pub session_id: Uuid,
    pub session: WorkflowSession,
    /// Cancelled when the session is started over or the submission is
    /// abandoned.
    pub token: CancellationToken,
}

struct ContainerState {
    session: WorkflowSession,
    lifecycle: CancellationToken,
}

/// Holds the resumable session of one workflow variant.
///
/// `SessionContainer` is responsible for:
/// - Restoring the session from the store on first use
/// - Persisting the whole session after every mutation
/// - Handing out lifecycle tokens to submissions
/// - Refusing results that arrive after a start over
pub struct SessionContainer {
    variant: WorkflowVariant,
    state: RwLock<ContainerState>,
    store: Arc<dyn SessionStore>,
    defaults: OutputPrefs,
}

impl SessionContainer {
    /// Restores the stored session for `variant`, or starts a fresh one.
    pub async fn open(
        variant: WorkflowVariant,
        store: Arc<dyn SessionStore>,
        defaults: OutputPrefs,
    ) -> Result<Self> {
        let session = match store.load(variant).await? {
            Some(session) => {
                tracing::info!(
                    "[SessionContainer] Resumed '{}' session at step {}",
                    variant,
                    session.current_step()
                );
                session
            }
            None => {
                tracing::debug!("[SessionContainer] Starting new '{}' session", variant);
                WorkflowSession::new(variant, defaults)
            }
        };

        Ok(Self {
            variant,
            state: RwLock::new(ContainerState {
                session,
                lifecycle: CancellationToken::new(),
            }),
            store,
            defaults,
        })
    }

    pub fn variant(&self) -> WorkflowVariant {
        self.variant
    }

    /// A copy of the current session.
    pub async fn snapshot(&self) -> WorkflowSession {
        self.state.read().await.session.clone()
    }

    pub async fn session_id(&self) -> Uuid {
        self.state.read().await.session.session_id
    }

    /// Applies `f` to a draft and commits it only once it is persisted.
    async fn mutate<R>(
        &self,
        f: impl FnOnce(&mut WorkflowSession) -> Result<R> + Send,
    ) -> Result<R> {
        let mut state = self.state.write().await;
        let mut draft = state.session.clone();
        let value = f(&mut draft)?;
        self.store.save(&draft).await?;
        state.session = draft;
        Ok(value)
    }

    pub async fn set_input(&self, slot: SlotId, data: ImageData) -> Result<()> {
        self.mutate(|s| {
            s.set_input(slot, data);
            Ok(())
        })
        .await
    }

    pub async fn remove_input(&self, slot: SlotId) -> Result<Option<ImageData>> {
        self.mutate(|s| Ok(s.remove_input(slot))).await
    }

    pub async fn clear_inputs(&self) -> Result<()> {
        self.mutate(|s| {
            s.clear_inputs();
            Ok(())
        })
        .await
    }

    pub async fn select_subject(&self, subject_id: Option<CatalogId>) -> Result<()> {
        self.mutate(|s| {
            s.select_subject(subject_id);
            Ok(())
        })
        .await
    }

    pub async fn select_backdrop(&self, backdrop_id: Option<CatalogId>) -> Result<()> {
        self.mutate(|s| {
            s.select_backdrop(backdrop_id);
            Ok(())
        })
        .await
    }

    pub async fn set_instruction(&self, text: impl Into<String>) -> Result<()> {
        let text = text.into();
        self.mutate(|s| {
            s.set_instruction(text);
            Ok(())
        })
        .await
    }

    pub async fn set_output_prefs(&self, prefs: OutputPrefs) -> Result<()> {
        self.mutate(|s| {
            s.set_output_prefs(prefs);
            Ok(())
        })
        .await
    }

    /// Moves forward if the current step is complete.
    pub async fn advance(&self, is_submitting: bool) -> Result<GateAdvance> {
        self.mutate(|s| s.advance(is_submitting)).await
    }

    /// Jumps within the unlocked frontier. Returns false when refused.
    pub async fn go_to(&self, target: usize) -> Result<bool> {
        {
            let state = self.state.read().await;
            if target > state.session.max_unlocked_step() {
                return Ok(false);
            }
        }
        self.mutate(|s| Ok(s.go_to(target))).await
    }

    pub async fn undo(&self) -> Result<Option<ResultRef>> {
        self.mutate(|s| Ok(s.undo())).await
    }

    pub async fn select_history_entry(&self, result: &ResultRef, index: usize) -> Result<()> {
        self.mutate(|s| s.select_history_entry(result, index)).await
    }

    /// Captures the session and a child of the current lifecycle token.
    pub async fn begin_submission(&self) -> SubmissionTicket {
        let state = self.state.read().await;
        SubmissionTicket {
            session_id: state.session.session_id,
            session: state.session.clone(),
            token: state.lifecycle.child_token(),
        }
    }

    /// Applies a successful result if the submission is still wanted.
    ///
    /// Checked under the write lock: a start over since `ticket` was issued
    /// gives `Superseded`, a cancelled ticket gives `Cancelled`. Neither
    /// touches the session or the store.
    pub async fn apply_result(&self, ticket: &SubmissionTicket, result: ResultRef) -> Result<()> {
        let mut state = self.state.write().await;
        if state.session.session_id != ticket.session_id {
            tracing::info!(
                "[SessionContainer] Discarding late result {} for reset '{}' session",
                result,
                self.variant
            );
            return Err(GenflowError::Superseded);
        }
        if ticket.token.is_cancelled() {
            tracing::info!(
                "[SessionContainer] Discarding result {} of cancelled '{}' submission",
                result,
                self.variant
            );
            return Err(GenflowError::Cancelled);
        }

        let mut draft = state.session.clone();
        draft.apply_success_after(ticket.session.current_result.clone(), result);
        self.store.save(&draft).await?;
        state.session = draft;
        Ok(())
    }

    /// Discards the session: cancels outstanding submissions, clears the
    /// store and starts a fresh lifecycle.
    pub async fn start_over(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.lifecycle.cancel();
        state.lifecycle = CancellationToken::new();
        state.session = WorkflowSession::new(self.variant, self.defaults);
        self.store.clear(self.variant).await?;
        tracing::info!("[SessionContainer] Started over '{}'", self.variant);
        Ok(())
    }
}
