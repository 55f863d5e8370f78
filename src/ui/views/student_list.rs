use crate::api::{
  cache::{detail_fetcher, list_fetcher},
  Student, StudentKey, StudentPage, PAGE_SIZE,
};
use crate::app::Context;
use crate::query::{FetchStatus, InvalidateOptions, Mutation, QueryOptions};
use crate::ui::components::{total_pages, Pagination};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::truncate;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::StudentFormView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, TableState};
use std::time::Duration;
use tracing::{debug, warn};

const LIST_STALE_TIME: Duration = Duration::from_secs(5);
const DETAIL_STALE_TIME: Duration = Duration::from_secs(10);
/// List requests are aborted after this long, without retry
const LIST_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a delete, carrying the page it was issued from
#[derive(Debug, Clone, PartialEq, Eq)]
struct Deleted {
  id: u64,
  page: u32,
}

/// Paginated table of students
pub struct StudentListView {
  page: u32,
  mounted: bool,
  /// Last page shown, kept on screen until the current page has data
  placeholder: Option<StudentPage>,
  table_state: TableState,
  hovered: Option<u64>,
  delete: Mutation<(u64, u32), Deleted>,
}

impl StudentListView {
  pub fn new(page: u32, ctx: &Context) -> Self {
    let api = ctx.api.clone();
    let delete = Mutation::new(move |(id, page): (u64, u32)| {
      let api = api.clone();
      async move { api.remove(id).await.map(|_| Deleted { id, page }) }
    });

    Self {
      page: page.max(1),
      mounted: false,
      placeholder: None,
      table_state: TableState::default(),
      hovered: None,
      delete,
    }
  }

  #[cfg(test)]
  pub fn page(&self) -> u32 {
    self.page
  }

  fn key(&self) -> StudentKey {
    StudentKey::list(self.page)
  }

  fn subscribe(&mut self, ctx: &mut Context) {
    let fetcher = list_fetcher(&ctx.api, self.page, LIST_FETCH_TIMEOUT);
    ctx
      .cache
      .read(self.key(), fetcher, QueryOptions::stale_after(LIST_STALE_TIME));
  }

  fn current_page<'a>(&self, ctx: &'a Context) -> Option<&'a StudentPage> {
    ctx
      .cache
      .get(&self.key())
      .and_then(|entry| entry.data())
      .and_then(|data| data.as_page())
  }

  /// Current page data, or the previous page while this one loads
  fn page_data<'a>(&'a self, ctx: &'a Context) -> Option<&'a StudentPage> {
    self.current_page(ctx).or(self.placeholder.as_ref())
  }

  fn students<'a>(&'a self, ctx: &'a Context) -> &'a [Student] {
    self
      .page_data(ctx)
      .map(|p| p.students.as_slice())
      .unwrap_or(&[])
  }

  pub fn pagination(&self, ctx: &Context) -> Pagination {
    let total_count = self.page_data(ctx).and_then(|p| p.total_count);
    Pagination::new(self.page, total_pages(total_count, PAGE_SIZE))
  }

  fn selected_student<'a>(&'a self, ctx: &'a Context) -> Option<&'a Student> {
    self
      .table_state
      .selected()
      .and_then(|i| self.students(ctx).get(i))
  }

  fn go_to_page(&mut self, page: u32, ctx: &mut Context) {
    if page == self.page || page == 0 {
      return;
    }
    debug!(from = self.page, to = page, "changing page");

    if let Some(current) = self.current_page(ctx) {
      self.placeholder = Some(current.clone());
    }

    if self.mounted {
      ctx.cache.unsubscribe(&self.key());
    }
    self.page = page;
    self.table_state.select(Some(0));
    if self.mounted {
      self.subscribe(ctx);
    }
  }

  /// Warm the detail cache for the row under the cursor
  fn hover(&mut self, ctx: &mut Context) {
    let len = self.students(ctx).len();
    ensure_valid_selection(&mut self.table_state, len);

    let Some(id) = self.selected_student(ctx).map(|s| s.id) else {
      return;
    };
    if self.hovered == Some(id) {
      return;
    }
    self.hovered = Some(id);
    ctx.cache.prefetch(
      StudentKey::detail(id),
      detail_fetcher(&ctx.api, id),
      QueryOptions::stale_after(DETAIL_STALE_TIME),
    );
  }

  fn delete_selected(&mut self, ctx: &Context) {
    if let Some(id) = self.selected_student(ctx).map(|s| s.id) {
      debug!(id, page = self.page, "deleting student");
      self.delete.mutate((id, self.page));
    }
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect, ctx: &Context) {
    let status = ctx.cache.get(&self.key()).map(|e| e.status());
    let fetching = status == Some(FetchStatus::Fetching);

    let title = if fetching {
      format!(" Students [page {}] (loading...) ", self.page)
    } else {
      format!(" Students [page {}] ", self.page)
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.page_data(ctx).is_none() && fetching {
      let paragraph = Paragraph::new("Loading students...")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let len = self.students(ctx).len();
    ensure_valid_selection(&mut self.table_state, len);

    let header = Row::new(["ID", "Avatar", "Name", "Email"]).style(
      Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = self
      .students(ctx)
      .iter()
      .map(|student| {
        Row::new(vec![
          Span::styled(student.id.to_string(), Style::default().fg(Color::Cyan)),
          Span::styled(
            truncate(&student.fields.avatar, 24),
            Style::default().fg(Color::DarkGray),
          ),
          Span::raw(truncate(&student.fields.last_name, 24)),
          Span::raw(truncate(&student.fields.email, 40)),
        ])
      })
      .collect();

    let table = Table::new(
      rows,
      [
        Constraint::Length(6),
        Constraint::Length(26),
        Constraint::Length(26),
        Constraint::Fill(1),
      ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }
}

impl View for StudentListView {
  fn mount(&mut self, ctx: &mut Context) {
    self.mounted = true;
    self.subscribe(ctx);
  }

  fn unmount(&mut self, ctx: &mut Context) {
    self.mounted = false;
    ctx.cache.unsubscribe(&self.key());
  }

  fn handle_key(&mut self, key: KeyEvent, ctx: &mut Context) -> ViewAction {
    let pagination = self.pagination(ctx);

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.table_state.select_next();
        self.hover(ctx);
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.table_state.select_previous();
        self.hover(ctx);
      }
      KeyCode::Char('n') | KeyCode::Right => {
        if let Some(page) = pagination.next() {
          self.go_to_page(page, ctx);
        }
      }
      KeyCode::Char('p') | KeyCode::Left => {
        if let Some(page) = pagination.prev() {
          self.go_to_page(page, ctx);
        }
      }
      KeyCode::Char(c @ '1'..='9') => {
        let page = c.to_digit(10).unwrap_or(1);
        if page <= pagination.total {
          self.go_to_page(page, ctx);
        }
      }
      KeyCode::Char('d') => self.delete_selected(ctx),
      KeyCode::Char('c') => ctx.cache.cancel(&self.key()),
      KeyCode::Char('r') => ctx.cache.invalidate(&self.key(), InvalidateOptions::exact()),
      KeyCode::Char('a') => {
        return ViewAction::Push(Box::new(StudentFormView::add(ctx)));
      }
      KeyCode::Enter | KeyCode::Char('e') => {
        if let Some(id) = self.selected_student(ctx).map(|s| s.id) {
          return ViewAction::Push(Box::new(StudentFormView::edit(id, ctx)));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &Context) {
    let chunks = Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).split(area);
    self.render_table(frame, chunks[0], ctx);
    self.pagination(ctx).render(frame, chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    format!("Students [page {}]", self.page)
  }

  fn tick(&mut self, ctx: &mut Context) {
    if self.placeholder.is_some() && self.current_page(ctx).is_some() {
      self.placeholder = None;
    }

    match self.delete.poll() {
      Some(Ok(deleted)) => {
        ctx.cache.invalidate(
          &StudentKey::list(deleted.page),
          InvalidateOptions::exact(),
        );
        ctx
          .toasts
          .success(format!("Deleted student id={}", deleted.id));
      }
      Some(Err(e)) if e.is_cancelled() => debug!("delete cancelled"),
      Some(Err(e)) => warn!(error = %e, network = e.is_network(), "failed to delete student"),
      None => {}
    }

    self.hover(ctx);
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("a", "add").with_priority(10),
      ShortcutInfo::new("e", "edit").with_priority(20),
      ShortcutInfo::new("d", "delete").with_priority(30),
      ShortcutInfo::new("n/p", "page").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("c", "cancel").with_priority(60),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::client::tests::{student_json, test_api};
  use crate::api::StudentData;
  use crate::ui::views::tests::{key, settle};
  use serde_json::Value;
  use wiremock::matchers::{method, path, path_regex, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  fn page_json(page: u64) -> Value {
    let first = (page - 1) * 10 + 1;
    Value::Array((first..first + 10).map(student_json).collect())
  }

  fn page_response(page: u64) -> ResponseTemplate {
    ResponseTemplate::new(200)
      .set_body_json(page_json(page))
      .insert_header("x-total-count", "23")
  }

  async fn mock_details(server: &MockServer) {
    Mock::given(method("GET"))
      .and(path_regex(r"^/students/\d+$"))
      .respond_with(ResponseTemplate::new(200).set_body_json(student_json(1)))
      .mount(server)
      .await;
  }

  fn seeded_page(page: u64) -> StudentData {
    let students = serde_json::from_value(page_json(page)).unwrap();
    StudentData::Page(StudentPage {
      students,
      total_count: Some(23),
    })
  }

  #[tokio::test]
  async fn test_total_pages_from_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/students"))
      .and(query_param("_page", "1"))
      .and(query_param("_limit", "10"))
      .respond_with(page_response(1))
      .expect(1)
      .mount(&server)
      .await;
    mock_details(&server).await;

    let mut ctx = Context::new(test_api(&server));
    let mut view = StudentListView::new(1, &ctx);
    view.mount(&mut ctx);
    settle(&mut view, &mut ctx).await;

    assert_eq!(view.students(&ctx).len(), 10);
    let pagination = view.pagination(&ctx);
    assert_eq!(pagination.total, 3);
    assert_eq!(pagination.links().collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(pagination.prev(), None);
  }

  #[tokio::test]
  async fn test_delete_invalidates_only_current_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/students"))
      .and(query_param("_page", "2"))
      .respond_with(page_response(2))
      .expect(2)
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/students"))
      .and(query_param("_page", "1"))
      .respond_with(page_response(1))
      .expect(0)
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/students"))
      .and(query_param("_page", "3"))
      .respond_with(page_response(3))
      .expect(0)
      .mount(&server)
      .await;
    Mock::given(method("DELETE"))
      .and(path("/students/11"))
      .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
      .expect(1)
      .mount(&server)
      .await;
    mock_details(&server).await;

    let mut ctx = Context::new(test_api(&server));
    ctx.cache.write(StudentKey::list(1), seeded_page(1));
    ctx.cache.write(StudentKey::list(3), seeded_page(3));

    let mut view = StudentListView::new(2, &ctx);
    view.mount(&mut ctx);
    settle(&mut view, &mut ctx).await;
    assert_eq!(view.selected_student(&ctx).map(|s| s.id), Some(11));

    view.handle_key(key(KeyCode::Char('d')), &mut ctx);
    settle(&mut view, &mut ctx).await;

    assert_eq!(
      ctx.toasts.latest().map(|t| t.message.as_str()),
      Some("Deleted student id=11")
    );
    let current = ctx.cache.get(&StudentKey::list(2)).unwrap();
    assert_eq!(current.fetch_seq(), 2);
    for page in [1, 3] {
      let neighbour = ctx.cache.get(&StudentKey::list(page)).unwrap();
      assert!(!neighbour.is_invalidated());
      assert_eq!(neighbour.fetch_seq(), 0);
      assert_eq!(neighbour.data(), Some(&seeded_page(u64::from(page))));
    }
  }

  #[tokio::test]
  async fn test_cancel_then_read_fetches_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/students"))
      .respond_with(page_response(1).set_delay(Duration::from_millis(300)))
      .expect(2)
      .mount(&server)
      .await;
    mock_details(&server).await;

    let mut ctx = Context::new(test_api(&server));
    let mut view = StudentListView::new(1, &ctx);
    view.mount(&mut ctx);
    tokio::time::sleep(Duration::from_millis(50)).await;

    view.handle_key(key(KeyCode::Char('c')), &mut ctx);
    let entry = ctx.cache.get(&StudentKey::list(1)).unwrap();
    assert!(!entry.is_fetching());
    assert!(entry.error().is_none());

    view.unmount(&mut ctx);
    view.mount(&mut ctx);
    assert!(ctx.cache.get(&StudentKey::list(1)).unwrap().is_fetching());

    tokio::time::sleep(Duration::from_millis(400)).await;
    settle(&mut view, &mut ctx).await;
    assert_eq!(view.students(&ctx).len(), 10);
  }

  #[tokio::test]
  async fn test_previous_page_shown_while_next_loads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/students"))
      .and(query_param("_page", "1"))
      .respond_with(page_response(1))
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/students"))
      .and(query_param("_page", "2"))
      .respond_with(page_response(2).set_delay(Duration::from_millis(300)))
      .mount(&server)
      .await;
    mock_details(&server).await;

    let mut ctx = Context::new(test_api(&server));
    let mut view = StudentListView::new(1, &ctx);
    view.mount(&mut ctx);
    settle(&mut view, &mut ctx).await;

    view.handle_key(key(KeyCode::Char('n')), &mut ctx);
    assert_eq!(view.page(), 2);
    assert_eq!(view.students(&ctx).first().map(|s| s.id), Some(1));
    assert_eq!(ctx.cache.get(&StudentKey::list(1)).unwrap().observers(), 0);

    tokio::time::sleep(Duration::from_millis(400)).await;
    settle(&mut view, &mut ctx).await;
    assert_eq!(view.students(&ctx).first().map(|s| s.id), Some(11));
  }

  #[tokio::test]
  async fn test_page_jump_bounded_by_total() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/students"))
      .respond_with(page_response(1))
      .mount(&server)
      .await;
    mock_details(&server).await;

    let mut ctx = Context::new(test_api(&server));
    let mut view = StudentListView::new(1, &ctx);
    view.mount(&mut ctx);
    settle(&mut view, &mut ctx).await;

    view.handle_key(key(KeyCode::Char('7')), &mut ctx);
    assert_eq!(view.page(), 1);
    view.handle_key(key(KeyCode::Char('3')), &mut ctx);
    assert_eq!(view.page(), 3);
    view.handle_key(key(KeyCode::Char('n')), &mut ctx);
    assert_eq!(view.page(), 3);
  }

  #[tokio::test]
  async fn test_hover_prefetches_detail_once_per_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/students"))
      .respond_with(page_response(1))
      .mount(&server)
      .await;
    for id in [1, 2] {
      Mock::given(method("GET"))
        .and(path(format!("/students/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(student_json(id)))
        .expect(1)
        .mount(&server)
        .await;
    }

    let mut ctx = Context::new(test_api(&server));
    let mut view = StudentListView::new(1, &ctx);
    view.mount(&mut ctx);
    settle(&mut view, &mut ctx).await;

    view.handle_key(key(KeyCode::Char('j')), &mut ctx);
    settle(&mut view, &mut ctx).await;
    assert_eq!(view.selected_student(&ctx).map(|s| s.id), Some(2));

    for id in [1, 2] {
      let entry = ctx.cache.get(&StudentKey::detail(id)).unwrap();
      assert_eq!(entry.observers(), 0);
      assert_eq!(entry.fetch_seq(), 1);
    }

    // Back and forth within the detail stale time reuses the cached records
    for code in ['k', 'j', 'k', 'j'] {
      view.handle_key(key(KeyCode::Char(code)), &mut ctx);
      settle(&mut view, &mut ctx).await;
    }
    assert_eq!(ctx.cache.get(&StudentKey::detail(2)).unwrap().fetch_seq(), 1);
  }
}
