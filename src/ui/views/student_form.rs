use crate::api::{
  cache::detail_fetcher, ApiError, FieldErrors, FormData, Gender, Student, StudentData,
  StudentField, StudentFields, StudentKey,
};
use crate::app::Context;
use crate::query::{Mutation, MutationState, QueryOptions};
use crate::ui::components::{InputResult, TextInput};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::layout::Position;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use std::time::Duration;
use tracing::{debug, info, warn};

const DETAIL_STALE_TIME: Duration = Duration::from_secs(5);

/// Create or edit a single student
pub struct StudentFormView {
  form: FormData,
  focus: usize,
  editor: TextInput,
  add: Mutation<FormData, Student>,
  update: Mutation<FormData, Student>,
  /// `fetch_seq` of the detail entry last copied into the form
  synced: Option<u64>,
}

impl StudentFormView {
  /// Empty form that creates a new student
  pub fn add(ctx: &Context) -> Self {
    Self::new(FormData::New(StudentFields::default()), ctx)
  }

  /// Form bound to an existing student, filled once its data arrives
  pub fn edit(id: u64, ctx: &Context) -> Self {
    Self::new(
      FormData::Existing {
        id,
        fields: StudentFields::default(),
      },
      ctx,
    )
  }

  fn new(form: FormData, ctx: &Context) -> Self {
    let mut view = Self {
      form,
      focus: 0,
      editor: TextInput::new(),
      add: Self::save_mutation(ctx),
      update: Self::save_mutation(ctx),
      synced: None,
    };
    view.load_editor();
    view
  }

  #[cfg(test)]
  pub fn form(&self) -> &FormData {
    &self.form
  }

  /// POST or PUT depending on the submitted form
  fn save_mutation(ctx: &Context) -> Mutation<FormData, Student> {
    let api = ctx.api.clone();
    Mutation::new(move |form: FormData| {
      let api = api.clone();
      async move { api.save(&form).await }
    })
  }

  fn focused_field(&self) -> StudentField {
    StudentField::FORM_ORDER[self.focus]
  }

  /// The mutation matching the form mode
  fn active(&self) -> &Mutation<FormData, Student> {
    match self.form {
      FormData::New(_) => &self.add,
      FormData::Existing { .. } => &self.update,
    }
  }

  /// Validation messages of the active mutation
  pub fn form_errors(&self) -> Option<&FieldErrors> {
    self
      .active()
      .error()
      .and_then(ApiError::field_errors)
      .filter(|errors| !errors.is_empty())
  }

  fn load_editor(&mut self) {
    let field = self.focused_field();
    let value = self.form.fields().get(field).to_string();
    self.editor.set_value(&value);
  }

  fn move_focus(&mut self, forward: bool) {
    let len = StudentField::FORM_ORDER.len();
    self.focus = if forward {
      (self.focus + 1) % len
    } else {
      (self.focus + len - 1) % len
    };
    self.load_editor();
  }

  fn field_changed(&mut self) {
    if self.add.is_error() || self.add.is_success() {
      self.add.reset();
    }
    if self.update.is_error() || self.update.is_success() {
      self.update.reset();
    }
  }

  /// Copy fetched data into the form on first data and on every later fetch
  fn sync_from_cache(&mut self, ctx: &Context) {
    let Some(id) = self.form.id() else {
      return;
    };
    let Some(entry) = ctx.cache.get(&StudentKey::detail(id)) else {
      return;
    };
    let Some(student) = entry.data().and_then(StudentData::as_student) else {
      return;
    };
    if self.synced == Some(entry.fetch_seq()) {
      return;
    }

    debug!(id, fetch_seq = entry.fetch_seq(), "filling form from fetched student");
    self.synced = Some(entry.fetch_seq());
    *self.form.fields_mut() = student.fields.clone();
    self.load_editor();
  }

  /// Send the form. A resubmit while pending supersedes the earlier call.
  fn submit(&mut self) {
    debug!(id = ?self.form.id(), "submitting student");
    let mutation = match self.form {
      FormData::New(_) => &mut self.add,
      FormData::Existing { .. } => &mut self.update,
    };
    mutation.mutate(self.form.clone());
  }

  fn clear_form(&mut self) {
    self.form.clear();
    self.load_editor();
  }

  fn report_failure(e: &ApiError, ctx: &mut Context) {
    if e.field_errors().is_some() {
      debug!(error = %e, "student rejected by validation");
    } else if e.is_cancelled() {
      debug!("save cancelled");
    } else {
      warn!(error = %e, network = e.is_network(), "failed to save student");
      ctx.toasts.error(format!("Save failed: {}", e));
    }
  }

  fn handle_field_key(&mut self, key: KeyEvent) {
    let field = self.focused_field();

    if field == StudentField::Gender {
      let gender = &mut self.form.fields_mut().gender;
      match key.code {
        KeyCode::Left => *gender = gender.prev(),
        KeyCode::Right | KeyCode::Char(' ') => *gender = gender.next(),
        _ => return,
      }
      self.load_editor();
      self.field_changed();
      return;
    }

    if self.editor.handle_key(key) == InputResult::Changed {
      if let Some(text) = self.form.fields_mut().text_mut(field) {
        *text = self.editor.value().to_string();
      }
      self.field_changed();
    }
  }

  fn render_fields(&self, frame: &mut Frame, area: Rect) {
    let errors = self.form_errors();
    let mut lines = Vec::new();
    let mut cursor = None;

    for (i, field) in StudentField::FORM_ORDER.iter().enumerate() {
      let focused = i == self.focus;
      let label_style = if focused {
        Style::default().fg(Color::Cyan).bold()
      } else {
        Style::default().fg(Color::DarkGray)
      };
      lines.push(Line::from(Span::styled(field.label(), label_style)));

      let marker = if focused { "> " } else { "  " };
      let mut spans = vec![Span::raw(marker)];
      if *field == StudentField::Gender {
        let selected = self.form.fields().gender;
        for gender in Gender::ALL {
          let style = if gender == selected {
            Style::default().fg(Color::Black).bg(Color::Cyan)
          } else {
            Style::default().fg(Color::DarkGray)
          };
          spans.push(Span::styled(format!(" {} ", gender.as_str()), style));
          spans.push(Span::raw(" "));
        }
      } else {
        if focused {
          cursor = Some((lines.len(), marker.len() + self.editor.cursor_position()));
        }
        spans.push(Span::raw(self.form.fields().get(*field).to_string()));
      }
      lines.push(Line::from(spans));

      match errors.and_then(|e| e.get(*field)) {
        Some(message) => lines.push(Line::from(Span::styled(
          format!("  {}", message),
          Style::default().fg(Color::Red),
        ))),
        None => lines.push(Line::raw("")),
      }
    }

    match self.active().state() {
      MutationState::Pending => lines.push(Line::from(Span::styled(
        "Saving...",
        Style::default().fg(Color::Yellow),
      ))),
      MutationState::Error(e) if e.field_errors().is_none() => lines.push(Line::from(
        Span::styled(format!("Save failed: {}", e), Style::default().fg(Color::Red)),
      )),
      _ => {}
    }

    frame.render_widget(Paragraph::new(lines), area);

    if let Some((row, col)) = cursor {
      let x = area.x.saturating_add(col as u16);
      let y = area.y.saturating_add(row as u16);
      if y < area.bottom() && x < area.right() {
        frame.set_cursor_position(Position::new(x, y));
      }
    }
  }
}

impl View for StudentFormView {
  fn mount(&mut self, ctx: &mut Context) {
    if let Some(id) = self.form.id() {
      ctx.cache.read(
        StudentKey::detail(id),
        detail_fetcher(&ctx.api, id),
        QueryOptions::stale_after(DETAIL_STALE_TIME),
      );
      self.sync_from_cache(ctx);
    }
  }

  fn unmount(&mut self, ctx: &mut Context) {
    if let Some(id) = self.form.id() {
      ctx.cache.unsubscribe(&StudentKey::detail(id));
    }
  }

  fn handle_key(&mut self, key: KeyEvent, _ctx: &mut Context) -> ViewAction {
    match key.code {
      KeyCode::Esc => return ViewAction::Pop,
      KeyCode::Tab | KeyCode::Down => self.move_focus(true),
      KeyCode::BackTab | KeyCode::Up => self.move_focus(false),
      KeyCode::Enter => self.submit(),
      _ => self.handle_field_key(key),
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, ctx: &Context) {
    let title = match self.form.id() {
      Some(id) => match ctx.cache.get(&StudentKey::detail(id)) {
        Some(entry) if entry.is_loading() => format!(" Edit student #{} (loading...) ", id),
        Some(entry) if entry.data().is_none() && entry.error().is_some() => {
          format!(" Edit student #{} (failed to load) ", id)
        }
        _ => format!(" Edit student #{} ", id),
      },
      None => " Add student ".to_string(),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);
    self.render_fields(frame, inner);
  }

  fn breadcrumb_label(&self) -> String {
    match self.form.id() {
      Some(id) => format!("Edit #{}", id),
      None => "Add".to_string(),
    }
  }

  fn tick(&mut self, ctx: &mut Context) {
    self.sync_from_cache(ctx);

    match self.add.poll() {
      Some(Ok(student)) => {
        info!(id = student.id, "student added");
        self.clear_form();
        ctx.toasts.success("Student added");
      }
      Some(Err(e)) => Self::report_failure(&e, ctx),
      None => {}
    }

    match self.update.poll() {
      Some(Ok(student)) => {
        info!(id = student.id, "student updated");
        ctx
          .cache
          .write(StudentKey::detail(student.id), StudentData::Student(student));
        self.clear_form();
        ctx.toasts.success("Student updated");
      }
      Some(Err(e)) => Self::report_failure(&e, ctx),
      None => {}
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("Tab", "next field").with_priority(10),
      ShortcutInfo::new("Enter", "submit").with_priority(20),
      ShortcutInfo::new("Esc", "back").with_priority(90),
    ]
  }
}
