use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

const TOAST_TTL: Duration = Duration::from_secs(3);
const MAX_TOASTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
  Success,
  Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
  pub message: String,
  pub level: ToastLevel,
  created: Instant,
}

/// Short-lived notifications shown in the footer
#[derive(Debug, Default)]
pub struct Toasts {
  items: VecDeque<Toast>,
}

impl Toasts {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn success(&mut self, message: impl Into<String>) {
    let message = message.into();
    info!(%message, "notification");
    self.push(message, ToastLevel::Success);
  }

  pub fn error(&mut self, message: impl Into<String>) {
    let message = message.into();
    warn!(%message, "notification");
    self.push(message, ToastLevel::Error);
  }

  fn push(&mut self, message: String, level: ToastLevel) {
    if self.items.len() == MAX_TOASTS {
      self.items.pop_front();
    }
    self.items.push_back(Toast {
      message,
      level,
      created: Instant::now(),
    });
  }

  /// Drop expired notifications
  pub fn prune(&mut self) {
    self.items.retain(|t| t.created.elapsed() < TOAST_TTL);
  }

  /// Most recent notification
  pub fn latest(&self) -> Option<&Toast> {
    self.items.back()
  }

  #[cfg(test)]
  pub fn iter(&self) -> impl Iterator<Item = &Toast> {
    self.items.iter()
  }
}
