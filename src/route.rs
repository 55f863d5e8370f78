//! In-app routes, mirroring the web paths of the backend's front-end.
//!
//! - `/students?page=N` - student list (page defaults to 1)
//! - `/students/add` - add form
//! - `/students/:id` - edit form

use std::fmt;
use std::str::FromStr;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
  Students { page: u32 },
  AddStudent,
  EditStudent { id: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
  #[error("invalid route {0:?}")]
  Malformed(String),
  #[error("no view for route {0:?}")]
  Unknown(String),
}

impl Route {
  /// Parse a path with optional query string
  pub fn parse(input: &str) -> Result<Self, RouteError> {
    let base = Url::parse("app://rollcall/").map_err(|_| RouteError::Malformed(input.to_string()))?;
    let url = base
      .join(input.trim())
      .map_err(|_| RouteError::Malformed(input.to_string()))?;

    let segments: Vec<&str> = url
      .path_segments()
      .map(|s| s.filter(|seg| !seg.is_empty()).collect())
      .unwrap_or_default();

    match segments.as_slice() {
      [] | ["students"] => {
        let page = url
          .query_pairs()
          .find(|(k, _)| k == "page")
          .map(|(_, v)| parse_page(&v))
          .unwrap_or(1);
        Ok(Route::Students { page })
      }
      ["students", "add"] => Ok(Route::AddStudent),
      ["students", id] => id
        .parse()
        .map(|id| Route::EditStudent { id })
        .map_err(|_| RouteError::Unknown(input.to_string())),
      _ => Err(RouteError::Unknown(input.to_string())),
    }
  }
}

/// Positive page number, 1 for anything else
fn parse_page(value: &str) -> u32 {
  value
    .trim()
    .parse::<u32>()
    .ok()
    .filter(|page| *page > 0)
    .unwrap_or(1)
}

impl FromStr for Route {
  type Err = RouteError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Route::parse(s)
  }
}

impl fmt::Display for Route {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Route::Students { page } => write!(f, "/students?page={}", page),
      Route::AddStudent => write!(f, "/students/add"),
      Route::EditStudent { id } => write!(f, "/students/{}", id),
    }
  }
}

impl Default for Route {
  fn default() -> Self {
    Route::Students { page: 1 }
  }
}
