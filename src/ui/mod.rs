pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::Context;
use ratatui::prelude::*;
use ratatui::widgets::TableState;
use renderfns::{draw_footer, draw_header};
use view::View;

/// Main draw function: header, top view, footer
pub fn draw(frame: &mut Frame, title: &str, view_stack: &mut [Box<dyn View>], ctx: &Context) {
  let chunks = Layout::vertical([
    Constraint::Length(1), // Header
    Constraint::Min(1),    // Main content
    Constraint::Length(1), // Footer
  ])
  .split(frame.area());

  let breadcrumb: Vec<String> = view_stack.iter().map(|v| v.breadcrumb_label()).collect();

  if let Some(view) = view_stack.last_mut() {
    draw_header(frame, chunks[0], title, view.shortcuts());
    view.render(frame, chunks[1], ctx);
  }

  draw_footer(frame, chunks[2], &breadcrumb, &ctx.toasts);
}

/// Clamp the selection to the row count, selecting the first row when unset
pub fn ensure_valid_selection(state: &mut TableState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    Some(i) if i >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    _ => {}
  }
}
