use crate::app::Context;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back, quits from the root view)
  Pop,
}

/// Trait for view behavior
///
/// Views hold only local UI state. Server data lives in the query cache in
/// [`Context`], which the App passes in on every call. Only the top view of
/// the stack is mounted: the App calls `mount` when a view becomes visible and
/// `unmount` when it is covered or popped, so cache subscriptions follow what
/// is on screen.
pub trait View {
  /// Subscribe to the queries this view renders
  fn mount(&mut self, ctx: &mut Context);

  /// Release the subscriptions taken in `mount`
  fn unmount(&mut self, ctx: &mut Context);

  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent, ctx: &mut Context) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &Context);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Called on each tick, after the cache applied settled fetches
  fn tick(&mut self, _ctx: &mut Context) {}

  /// Get keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![ShortcutInfo::new("q", "back").with_priority(90)]
  }
}
