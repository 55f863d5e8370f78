//! Query keys and fetchers for student data.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::client::StudentApi;
use super::error::ApiError;
use super::types::{Student, StudentPage};
use crate::query::{fetcher, Fetcher, QueryKey};

/// Students per list page
pub const PAGE_SIZE: u32 = 10;

/// Cache keys for student queries.
///
/// List keys carry only the page: the page size is fixed, so the same page
/// always maps to the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StudentKey {
  List { page: u32 },
  Detail { id: u64 },
}

impl StudentKey {
  pub fn list(page: u32) -> Self {
    StudentKey::List { page }
  }

  pub fn detail(id: u64) -> Self {
    StudentKey::Detail { id }
  }
}

impl QueryKey for StudentKey {
  fn operation(&self) -> &'static str {
    match self {
      StudentKey::List { .. } => "list",
      StudentKey::Detail { .. } => "get",
    }
  }
}

/// Cached value, one variant per key kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentData {
  Page(StudentPage),
  Student(Student),
}

impl StudentData {
  pub fn as_page(&self) -> Option<&StudentPage> {
    match self {
      StudentData::Page(page) => Some(page),
      StudentData::Student(_) => None,
    }
  }

  pub fn as_student(&self) -> Option<&Student> {
    match self {
      StudentData::Student(student) => Some(student),
      StudentData::Page(_) => None,
    }
  }
}

/// Fetcher for one list page, aborted after `timeout`
pub fn list_fetcher(api: &StudentApi, page: u32, timeout: Duration) -> Fetcher<StudentData> {
  let api = api.clone();
  fetcher(move |token: CancellationToken| {
    let api = api.clone();
    async move {
      match tokio::time::timeout(timeout, api.list(page, PAGE_SIZE, Some(&token))).await {
        Ok(result) => result.map(StudentData::Page),
        Err(_) => {
          warn!(page, ?timeout, "student list request timed out");
          Err(ApiError::Timeout)
        }
      }
    }
  })
}

/// Fetcher for a single student
pub fn detail_fetcher(api: &StudentApi, id: u64) -> Fetcher<StudentData> {
  let api = api.clone();
  fetcher(move |token: CancellationToken| {
    let api = api.clone();
    async move { api.get(id, Some(&token)).await.map(StudentData::Student) }
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::client::tests::{student_json, test_api};
  use wiremock::matchers::{method, path};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  #[test]
  fn test_list_keys_are_per_page() {
    assert_ne!(StudentKey::list(1), StudentKey::list(2));
    assert_eq!(StudentKey::list(1).operation(), StudentKey::list(7).operation());
    assert_ne!(StudentKey::list(1).operation(), StudentKey::detail(1).operation());
  }

  #[tokio::test]
  async fn test_list_fetch_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/students"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(serde_json::json!([]))
          .set_delay(Duration::from_millis(500)),
      )
      .mount(&server)
      .await;

    let fetch = list_fetcher(&test_api(&server), 1, Duration::from_millis(50));
    let err = fetch(CancellationToken::new()).await.unwrap_err();
    assert_eq!(err, ApiError::Timeout);
  }

  #[tokio::test]
  async fn test_detail_fetch_wraps_student() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/students/4"))
      .respond_with(ResponseTemplate::new(200).set_body_json(student_json(4)))
      .mount(&server)
      .await;

    let fetch = detail_fetcher(&test_api(&server), 4);
    let data = fetch(CancellationToken::new()).await.unwrap();
    assert_eq!(data.as_student().map(|s| s.id), Some(4));
    assert!(data.as_page().is_none());
  }
}
