//! Interception predicate trait.
//!
//! Uses async methods so predicates can consult remote services.

use std::future::Future;
use std::pin::Pin;

use super::state::{ConversationEvent, ConversationState};
use crate::error::Result;

/// Decides whether an event should reach the matching stage.
///
/// `Some(false)` skips matching for the event. `Some(true)` and `None`
/// (no opinion) both let it through.
pub trait InterceptPredicate: Send + Sync {
    fn should_process(
        &self,
        event: &ConversationEvent,
        state: &ConversationState,
    ) -> impl Future<Output = Result<Option<bool>>> + Send;
}

/// Type-erased predicate, as stored in the gate slot.
pub struct BoxedPredicate {
    inner: Box<dyn InterceptPredicateBoxed>,
}

/// Object-safe version of `InterceptPredicate` for boxing.
trait InterceptPredicateBoxed: Send + Sync {
    fn should_process_boxed<'a>(
        &'a self,
        event: &'a ConversationEvent,
        state: &'a ConversationState,
    ) -> Pin<Box<dyn Future<Output = Result<Option<bool>>> + Send + 'a>>;
}

impl BoxedPredicate {
    pub fn new<P: InterceptPredicate + 'static>(predicate: P) -> Self {
        Self {
            inner: Box::new(BoxedPredicateWrapper(predicate)),
        }
    }

    pub async fn should_process(
        &self,
        event: &ConversationEvent,
        state: &ConversationState,
    ) -> Result<Option<bool>> {
        self.inner.should_process_boxed(event, state).await
    }
}

impl std::fmt::Debug for BoxedPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BoxedPredicate")
    }
}

struct BoxedPredicateWrapper<P: InterceptPredicate + 'static>(P);

impl<P: InterceptPredicate + 'static> InterceptPredicateBoxed for BoxedPredicateWrapper<P> {
    fn should_process_boxed<'a>(
        &'a self,
        event: &'a ConversationEvent,
        state: &'a ConversationState,
    ) -> Pin<Box<dyn Future<Output = Result<Option<bool>>> + Send + 'a>> {
        Box::pin(self.0.should_process(event, state))
    }
}

/// Predicate backed by a plain closure.
pub struct FnPredicate<F>(F);

impl<F> FnPredicate<F>
where
    F: Fn(&ConversationEvent, &ConversationState) -> Result<Option<bool>> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> InterceptPredicate for FnPredicate<F>
where
    F: Fn(&ConversationEvent, &ConversationState) -> Result<Option<bool>> + Send + Sync,
{
    async fn should_process(
        &self,
        event: &ConversationEvent,
        state: &ConversationState,
    ) -> Result<Option<bool>> {
        (self.0)(event, state)
    }
}
