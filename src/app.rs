use crate::api::{StudentApi, StudentData, StudentKey};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::query::QueryCache;
use crate::route::Route;
use crate::ui;
use crate::ui::components::Toasts;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{StudentFormView, StudentListView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::{debug, info};

/// Shared state handed to every view
pub struct Context {
  pub api: StudentApi,
  pub cache: QueryCache<StudentKey, StudentData>,
  pub toasts: Toasts,
}

impl Context {
  pub fn new(api: StudentApi) -> Self {
    Self {
      api,
      cache: QueryCache::new(),
      toasts: Toasts::new(),
    }
  }
}

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0, only the top is mounted
  view_stack: Vec<Box<dyn View>>,

  ctx: Context,

  /// Header title
  title: String,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: &Config, route: Route) -> Result<Self> {
    let api = StudentApi::new(&config.api)?;
    Ok(Self::with_context(Context::new(api), route, config.display_title()))
  }

  fn with_context(ctx: Context, route: Route, title: String) -> Self {
    let view_stack = Self::views_for_route(route, &ctx);
    let mut app = Self {
      view_stack,
      ctx,
      title,
      should_quit: false,
    };
    if let Some(top) = app.view_stack.last_mut() {
      top.mount(&mut app.ctx);
    }
    app
  }

  /// Initial stack for a route. Forms open on top of the first list page.
  fn views_for_route(route: Route, ctx: &Context) -> Vec<Box<dyn View>> {
    match route {
      Route::Students { page } => vec![Box::new(StudentListView::new(page, ctx))],
      Route::AddStudent => vec![
        Box::new(StudentListView::new(1, ctx)),
        Box::new(StudentFormView::add(ctx)),
      ],
      Route::EditStudent { id } => vec![
        Box::new(StudentListView::new(1, ctx)),
        Box::new(StudentFormView::edit(id, ctx)),
      ],
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(100));
    info!(views = self.view_stack.len(), "app started");

    // Main loop
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, &self.title, &mut self.view_stack, &self.ctx))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }

    self.shutdown();

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.tick(),
      Event::Resize => {} // Redrawn on the next loop iteration
    }
  }

  fn tick(&mut self) {
    self.ctx.cache.poll();
    self.ctx.toasts.prune();
    if let Some(top) = self.view_stack.last_mut() {
      top.tick(&mut self.ctx);
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let action = match self.view_stack.last_mut() {
      Some(top) => top.handle_key(key, &mut self.ctx),
      None => ViewAction::Pop,
    };
    self.apply(action);
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(mut view) => {
        if let Some(top) = self.view_stack.last_mut() {
          top.unmount(&mut self.ctx);
        }
        debug!(view = %view.breadcrumb_label(), "push view");
        view.mount(&mut self.ctx);
        self.view_stack.push(view);
      }
      ViewAction::Pop => {
        if self.view_stack.len() <= 1 {
          self.should_quit = true;
          return;
        }
        if let Some(mut view) = self.view_stack.pop() {
          view.unmount(&mut self.ctx);
          debug!(view = %view.breadcrumb_label(), "pop view");
        }
        if let Some(top) = self.view_stack.last_mut() {
          top.mount(&mut self.ctx);
        }
      }
    }
  }

  fn shutdown(&mut self) {
    if let Some(top) = self.view_stack.last_mut() {
      top.unmount(&mut self.ctx);
    }
    self.ctx.cache.clear();
    info!("app stopped");
  }
}
