//! Write operations with pending/success/error tracking.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::debug;

use super::cache::BoxFuture;
use crate::api::ApiError;

/// The state of a mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationState<T> {
  Idle,
  Pending,
  Success(T),
  Error(ApiError),
}

type MutateFn<A, T> = Arc<dyn Fn(A) -> BoxFuture<T> + Send + Sync>;

/// Runs a write operation and tracks its outcome.
///
/// Each [`mutate`](Self::mutate) supersedes the previous invocation: only the
/// latest call's outcome is reported, whatever order the responses arrive in.
/// The caller branches on the result of [`poll`](Self::poll), which hands out
/// each outcome exactly once.
pub struct Mutation<A, T> {
  state: MutationState<T>,
  mutate_fn: MutateFn<A, T>,
  receiver: Option<oneshot::Receiver<Result<T, ApiError>>>,
}

impl<A: Send + 'static, T: Clone + Send + 'static> Mutation<A, T> {
  pub fn new<F, Fut>(mutate_fn: F) -> Self
  where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    Self {
      state: MutationState::Idle,
      mutate_fn: Arc::new(move |args| Box::pin(mutate_fn(args))),
      receiver: None,
    }
  }

  pub fn state(&self) -> &MutationState<T> {
    &self.state
  }

  #[cfg(test)]
  pub fn data(&self) -> Option<&T> {
    match &self.state {
      MutationState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&ApiError> {
    match &self.state {
      MutationState::Error(e) => Some(e),
      _ => None,
    }
  }

  #[cfg(test)]
  pub fn is_idle(&self) -> bool {
    matches!(self.state, MutationState::Idle)
  }

  #[cfg(test)]
  pub fn is_pending(&self) -> bool {
    matches!(self.state, MutationState::Pending)
  }

  pub fn is_success(&self) -> bool {
    matches!(self.state, MutationState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self.state, MutationState::Error(_))
  }

  /// Start the write. A still-running earlier call keeps going on the server
  /// but its outcome is discarded.
  pub fn mutate(&mut self, args: A) {
    let (tx, rx) = oneshot::channel();
    self.receiver = Some(rx);
    self.state = MutationState::Pending;

    let future = (self.mutate_fn)(args);
    tokio::spawn(async move {
      let _ = tx.send(future.await);
    });
  }

  /// Pick up the outcome of the latest call once it settles.
  pub fn poll(&mut self) -> Option<Result<T, ApiError>> {
    let receiver = self.receiver.as_mut()?;

    let result = match receiver.try_recv() {
      Ok(result) => result,
      Err(oneshot::error::TryRecvError::Empty) => return None,
      Err(oneshot::error::TryRecvError::Closed) => Err(ApiError::Cancelled),
    };
    self.receiver = None;

    self.state = match &result {
      Ok(data) => MutationState::Success(data.clone()),
      Err(e) => {
        debug!(error = %e, "mutation failed");
        MutationState::Error(e.clone())
      }
    };
    Some(result)
  }

  /// Back to idle, discarding any pending outcome
  pub fn reset(&mut self) {
    self.receiver = None;
    self.state = MutationState::Idle;
  }
}

impl<A, T: std::fmt::Debug> std::fmt::Debug for Mutation<A, T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Mutation")
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  async fn settle<A: Send + 'static, T: Clone + Send + 'static>(
    m: &mut Mutation<A, T>,
  ) -> Option<Result<T, ApiError>> {
    tokio::time::sleep(Duration::from_millis(30)).await;
    m.poll()
  }

  #[tokio::test]
  async fn test_success_transition() {
    let mut m = Mutation::new(|x: u32| async move { Ok(x * 2) });
    assert!(m.is_idle());

    m.mutate(21);
    assert!(m.is_pending());

    assert_eq!(settle(&mut m).await, Some(Ok(42)));
    assert!(m.is_success());
    assert_eq!(m.data(), Some(&42));

    // Outcome is reported once
    assert_eq!(m.poll(), None);
    assert!(m.is_success());
  }

  #[tokio::test]
  async fn test_error_is_captured() {
    let mut m: Mutation<(), ()> = Mutation::new(|_| async { Err(ApiError::Timeout) });

    m.mutate(());
    assert_eq!(settle(&mut m).await, Some(Err(ApiError::Timeout)));
    assert_eq!(m.error(), Some(&ApiError::Timeout));
  }

  #[tokio::test]
  async fn test_last_call_wins() {
    let mut m = Mutation::new(|(value, delay): (u32, u64)| async move {
      tokio::time::sleep(Duration::from_millis(delay)).await;
      Ok(value)
    });

    // The first call finishes last but is superseded anyway
    m.mutate((1, 40));
    m.mutate((2, 5));

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(m.poll(), Some(Ok(2)));
    assert_eq!(m.poll(), None);
    assert_eq!(m.data(), Some(&2));
  }

  #[tokio::test]
  async fn test_reset_discards_pending_outcome() {
    let mut m = Mutation::new(|x: u32| async move { Ok(x) });

    m.mutate(1);
    m.reset();
    assert!(m.is_idle());
    assert_eq!(settle(&mut m).await, None);
    assert!(m.is_idle());
  }

  #[tokio::test]
  async fn test_reset_after_error() {
    let mut m: Mutation<(), ()> = Mutation::new(|_| async { Err(ApiError::Timeout) });
    m.mutate(());
    settle(&mut m).await;
    assert!(m.is_error());

    m.reset();
    assert!(m.is_idle());
    assert_eq!(m.error(), None);
  }
}
