use ratatui::prelude::*;
use ratatui::widgets::Paragraph;
use std::ops::RangeInclusive;

/// Most numbered links drawn at once
const MAX_VISIBLE_LINKS: u32 = 9;

/// Number of pages for `total_count` records, 0 when the total is unknown.
/// Saturates at `u32::MAX`.
pub fn total_pages(total_count: Option<u64>, page_size: u32) -> u32 {
  match total_count {
    Some(total) if page_size > 0 => {
      u32::try_from(total.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX)
    }
    _ => 0,
  }
}

/// Page links for the list footer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
  pub current: u32,
  pub total: u32,
}

impl Pagination {
  pub fn new(current: u32, total: u32) -> Self {
    Self { current, total }
  }

  /// Target of the "Previous" link, if enabled
  pub fn prev(&self) -> Option<u32> {
    (self.current > 1).then(|| self.current - 1)
  }

  /// Target of the "Next" link, if enabled
  pub fn next(&self) -> Option<u32> {
    (self.current < self.total).then(|| self.current + 1)
  }

  /// Numbered links, 1..=total
  pub fn links(&self) -> RangeInclusive<u32> {
    1..=self.total
  }

  /// The links drawn on screen: a window of at most nine pages around the current one
  pub fn visible_links(&self) -> RangeInclusive<u32> {
    if self.total <= MAX_VISIBLE_LINKS {
      return self.links();
    }
    let half = MAX_VISIBLE_LINKS / 2;
    let start = self
      .current
      .saturating_sub(half)
      .clamp(1, self.total - MAX_VISIBLE_LINKS + 1);
    start..=start + MAX_VISIBLE_LINKS - 1
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let enabled = Style::default().fg(Color::White);
    let disabled = Style::default().fg(Color::DarkGray);

    let mut spans = vec![Span::styled(
      "‹ Previous",
      if self.prev().is_some() { enabled } else { disabled },
    )];
    let visible = self.visible_links();
    if *visible.start() > 1 {
      spans.push(Span::styled(" …", disabled));
    }
    for page in visible.clone() {
      spans.push(Span::raw(" "));
      let style = if page == self.current {
        Style::default().fg(Color::Black).bg(Color::Cyan).bold()
      } else {
        enabled
      };
      spans.push(Span::styled(format!(" {} ", page), style));
    }
    if *visible.end() < self.total {
      spans.push(Span::styled(" …", disabled));
    }
    spans.push(Span::raw(" "));
    spans.push(Span::styled(
      "Next ›",
      if self.next().is_some() { enabled } else { disabled },
    ));

    let paragraph = Paragraph::new(Line::from(spans)).alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_total_pages_rounds_up() {
    assert_eq!(total_pages(Some(23), 10), 3);
    assert_eq!(total_pages(Some(20), 10), 2);
    assert_eq!(total_pages(Some(1), 10), 1);
    assert_eq!(total_pages(Some(0), 10), 0);
  }

  #[test]
  fn test_unknown_total_has_no_pages() {
    assert_eq!(total_pages(None, 10), 0);
    assert_eq!(Pagination::new(1, 0).links().count(), 0);
  }

  #[test]
  fn test_links_cover_every_page() {
    for total in [1u64, 9, 10, 11, 23, 100] {
      let pages = total_pages(Some(total), 10);
      let links: Vec<u32> = Pagination::new(1, pages).links().collect();
      assert_eq!(links, (1..=pages).collect::<Vec<_>>());
      assert_eq!(u64::from(pages), total.div_ceil(10));
    }
  }

  #[test]
  fn test_huge_total_saturates() {
    assert_eq!(total_pages(Some(u64::MAX), 10), u32::MAX);
    assert_eq!(total_pages(Some(u64::from(u32::MAX) * 10 + 1), 10), u32::MAX);
  }

  #[test]
  fn test_visible_links_window() {
    assert_eq!(Pagination::new(2, 3).visible_links(), 1..=3);
    assert_eq!(Pagination::new(1, 100).visible_links(), 1..=9);
    assert_eq!(Pagination::new(50, 100).visible_links(), 46..=54);
    assert_eq!(Pagination::new(100, 100).visible_links(), 92..=100);

    let huge = Pagination::new(u32::MAX, u32::MAX);
    assert_eq!(huge.visible_links().count(), 9);
    assert_eq!(*huge.visible_links().end(), u32::MAX);
  }

  #[test]
  fn test_prev_next_bounds() {
    let first = Pagination::new(1, 3);
    assert_eq!(first.prev(), None);
    assert_eq!(first.next(), Some(2));

    let last = Pagination::new(3, 3);
    assert_eq!(last.prev(), Some(2));
    assert_eq!(last.next(), None);

    // Past the end, e.g. after deleting the last record of the last page
    let beyond = Pagination::new(5, 3);
    assert_eq!(beyond.next(), None);
    assert_eq!(beyond.prev(), Some(4));
  }
}
