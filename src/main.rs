mod api;
mod app;
mod config;
mod event;
mod logging;
mod query;
mod route;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rollcall")]
#[command(about = "A terminal UI for managing student records over a REST API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/rollcall/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the student API
  #[arg(short, long)]
  url: Option<String>,

  /// Initial route, e.g. "/students?page=2", "/students/add", "/students/5"
  #[arg(short, long, default_value = "/students")]
  route: String,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Override the API URL if specified on command line
  if let Some(url) = args.url {
    config.api.url = url;
  }

  let _guard = logging::init(&config)?;
  let route: route::Route = args.route.parse()?;
  tracing::info!(url = %config.api.url, %route, "starting");

  // Initialize and run the app
  let mut app = app::App::new(&config, route)?;
  app.run().await?;

  Ok(())
}
