//! Interception gate in front of question matching.
//!
//! An [`InterceptionGate`] holds at most one predicate. Before an incoming
//! event is matched against stored questions, the [`Interceptor`] fetches
//! the conversation state and asks the gate whether to proceed.
//!
//! Lifecycle: a gate starts empty, [`InterceptionGate::register`] installs
//! or replaces the predicate, and [`InterceptionGate::clear`] removes it.
//! An empty gate lets every event through.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use qna::gate::{InterceptionGate, Interceptor, MemoryStateManager, RulePredicate};
//!
//! let gate = Arc::new(InterceptionGate::new());
//! gate.register(RulePredicate::new(settings.intercept.clone()))?;
//!
//! let interceptor = Interceptor::new(Arc::clone(&gate), MemoryStateManager::new());
//! let flow = interceptor.intercept(&event, &matcher).await?;
//! ```

mod predicate;
mod rules;
mod state;

use std::future::Future;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

pub use predicate::{BoxedPredicate, FnPredicate, InterceptPredicate};
pub use rules::{InterceptRules, RulePredicate};
pub use state::{ConversationEvent, ConversationState, MemoryStateManager, StateManager};

/// Outcome of evaluating the gate for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateDecision {
    Process,
    Skip,
}

/// Single-slot holder for the interception predicate.
#[derive(Debug, Default)]
pub struct InterceptionGate {
    slot: RwLock<Option<Arc<BoxedPredicate>>>,
}

impl InterceptionGate {
    /// Create an empty gate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `predicate`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot lock is poisoned.
    pub fn register<P: InterceptPredicate + 'static>(&self, predicate: P) -> Result<()> {
        *self.write_slot()? = Some(Arc::new(BoxedPredicate::new(predicate)));
        debug!("Interception predicate registered");
        Ok(())
    }

    /// Remove the predicate.
    ///
    /// # Errors
    ///
    /// Returns an error if the slot lock is poisoned.
    pub fn clear(&self) -> Result<()> {
        *self.write_slot()? = None;
        Ok(())
    }

    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.slot.read().is_ok_and(|slot| slot.is_some())
    }

    /// Evaluate the registered predicate for an event.
    ///
    /// Only an explicit `Some(false)` skips. A predicate that fails is
    /// logged and treated as `Process` so matching is never blocked by it.
    pub async fn evaluate(
        &self,
        event: &ConversationEvent,
        state: &ConversationState,
    ) -> GateDecision {
        // Clone out so the lock is not held across the await
        let predicate = match self.slot.read() {
            Ok(slot) => slot.clone(),
            Err(_) => {
                warn!("Interception gate lock poisoned; processing event");
                return GateDecision::Process;
            }
        };

        let Some(predicate) = predicate else {
            return GateDecision::Process;
        };

        match predicate.should_process(event, state).await {
            Ok(Some(false)) => GateDecision::Skip,
            Ok(_) => GateDecision::Process,
            Err(e) => {
                warn!(error = %e, session = %event.session_id, "Interception predicate failed; processing event");
                GateDecision::Process
            }
        }
    }

    fn write_slot(&self) -> Result<std::sync::RwLockWriteGuard<'_, Option<Arc<BoxedPredicate>>>> {
        self.slot
            .write()
            .map_err(|_| Error::Other("interception gate lock poisoned".to_string()))
    }
}

/// Whether an event was consumed or should continue down the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    Handled,
    Next,
}

/// The matching stage the interceptor guards.
pub trait MatchStage: Send + Sync {
    fn run(
        &self,
        event: &ConversationEvent,
        state: &ConversationState,
    ) -> impl Future<Output = Result<Flow>> + Send;
}

/// Pipeline stage that consults the gate before matching.
pub struct Interceptor<M: StateManager> {
    gate: Arc<InterceptionGate>,
    states: M,
}

impl<M: StateManager> Interceptor<M> {
    #[must_use]
    pub fn new(gate: Arc<InterceptionGate>, states: M) -> Self {
        Self { gate, states }
    }

    /// Run `matcher` for `event` unless the gate says to skip it.
    ///
    /// A skipped event continues as [`Flow::Next`] without matching.
    ///
    /// # Errors
    ///
    /// Returns an error if state cannot be loaded or the matcher fails.
    pub async fn intercept<S: MatchStage>(
        &self,
        event: &ConversationEvent,
        matcher: &S,
    ) -> Result<Flow> {
        let state = self
            .states
            .get_state(&event.session_id, &event.user_id)
            .await?;

        match self.gate.evaluate(event, &state).await {
            GateDecision::Skip => {
                debug!(session = %event.session_id, "Matching skipped by interception gate");
                Ok(Flow::Next)
            }
            GateDecision::Process => matcher.run(event, &state).await,
        }
    }
}
