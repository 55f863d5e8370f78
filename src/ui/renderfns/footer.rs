use crate::ui::components::{ToastLevel, Toasts};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer bar with view breadcrumb and the latest notification
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String], toasts: &Toasts) {
  let mut spans = vec![Span::raw(" ")];

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }

    let style = if i == breadcrumb.len() - 1 {
      // Current view - highlighted
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };

    spans.push(Span::styled(part.clone(), style));
  }

  let chunks = Layout::horizontal([Constraint::Fill(1), Constraint::Fill(1)]).split(area);
  let background = Style::default().bg(Color::Black);
  frame.render_widget(Paragraph::new(Line::from(spans)).style(background), chunks[0]);

  if let Some(toast) = toasts.latest() {
    let (icon, color) = match toast.level {
      ToastLevel::Success => ("✓", Color::Green),
      ToastLevel::Error => ("✗", Color::Red),
    };
    let line = Line::from(Span::styled(
      format!("{} {} ", icon, toast.message),
      Style::default().fg(color).bold(),
    ));
    frame.render_widget(
      Paragraph::new(line)
        .alignment(Alignment::Right)
        .style(background),
      chunks[1],
    );
  } else {
    frame.render_widget(Paragraph::new("").style(background), chunks[1]);
  }
}
