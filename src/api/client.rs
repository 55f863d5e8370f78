use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::ApiError;
use super::http::HttpClient;
use super::types::{FormData, Student, StudentFields, StudentPage};
use crate::config::ApiConfig;

const STUDENTS: &str = "students";
const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Student backend client
#[derive(Debug, Clone)]
pub struct StudentApi {
  http: HttpClient,
}

impl StudentApi {
  pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
    Ok(Self {
      http: HttpClient::new(config)?,
    })
  }

  /// Fetch one page of students along with the total count header
  pub async fn list(
    &self,
    page: u32,
    limit: u32,
    cancel: Option<&CancellationToken>,
  ) -> Result<StudentPage, ApiError> {
    debug!(page, limit, "listing students");
    let query = [("_page", page.to_string()), ("_limit", limit.to_string())];
    let response = self.http.get(STUDENTS, &query, cancel).await?;

    Ok(StudentPage {
      students: response.json()?,
      total_count: response.header_u64(TOTAL_COUNT_HEADER),
    })
  }

  /// Fetch a single student
  pub async fn get(&self, id: u64, cancel: Option<&CancellationToken>) -> Result<Student, ApiError> {
    debug!(id, "fetching student");
    self
      .http
      .get(&student_path(id), &[], cancel)
      .await?
      .json()
  }

  /// Create a student, the server assigns the id
  pub async fn add(&self, fields: &StudentFields) -> Result<Student, ApiError> {
    debug!(email = %fields.email, "adding student");
    self.http.post(STUDENTS, fields).await?.json()
  }

  /// Replace an existing student
  pub async fn update(&self, id: u64, fields: &StudentFields) -> Result<Student, ApiError> {
    debug!(id, "updating student");
    self.http.put(&student_path(id), fields).await?.json()
  }

  pub async fn remove(&self, id: u64) -> Result<(), ApiError> {
    debug!(id, "deleting student");
    self.http.delete(&student_path(id)).await?;
    Ok(())
  }

  /// Create or update depending on whether the form carries an id
  pub async fn save(&self, form: &FormData) -> Result<Student, ApiError> {
    match form {
      FormData::New(fields) => self.add(fields).await,
      FormData::Existing { id, fields } => self.update(*id, fields).await,
    }
  }
}

fn student_path(id: u64) -> String {
  format!("{}/{}", STUDENTS, id)
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::api::types::{Gender, StudentField};
  use serde_json::json;
  use std::time::Duration;
  use wiremock::matchers::{body_json, method, path, query_param};
  use wiremock::{Mock, MockServer, ResponseTemplate};

  pub(crate) fn test_api(server: &MockServer) -> StudentApi {
    let config = ApiConfig {
      url: server.uri(),
      ..Default::default()
    };
    StudentApi::new(&config).expect("failed to create client")
  }

  pub(crate) fn student_json(id: u64) -> serde_json::Value {
    json!({
      "id": id,
      "email": format!("student{}@example.com", id),
      "first_name": "First",
      "last_name": format!("Last{}", id),
      "gender": "Female",
      "country": "Vietnam",
      "avatar": "https://example.com/a.png",
      "btc_address": "1BoatSLRHtKNngkdXEeobR76b53LETtpyT"
    })
  }

  #[tokio::test]
  async fn test_list_reads_page_and_total_count() {
    let server = MockServer::start().await;
    let body: Vec<_> = (1..=10).map(student_json).collect();

    Mock::given(method("GET"))
      .and(path("/students"))
      .and(query_param("_page", "1"))
      .and(query_param("_limit", "10"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(body)
          .insert_header("x-total-count", "23"),
      )
      .expect(1)
      .mount(&server)
      .await;

    let page = test_api(&server).list(1, 10, None).await.unwrap();
    assert_eq!(page.students.len(), 10);
    assert_eq!(page.total_count, Some(23));
    assert_eq!(page.students[0].fields.gender, Gender::Female);
  }

  #[tokio::test]
  async fn test_list_without_total_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/students"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
      .mount(&server)
      .await;

    let page = test_api(&server).list(4, 10, None).await.unwrap();
    assert!(page.students.is_empty());
    assert_eq!(page.total_count, None);
  }

  #[tokio::test]
  async fn test_get_missing_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/students/99"))
      .respond_with(ResponseTemplate::new(404).set_body_json(json!({})))
      .mount(&server)
      .await;

    let err = test_api(&server).get(99, None).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound { .. }));
  }

  #[tokio::test]
  async fn test_add_posts_fields_without_id() {
    let server = MockServer::start().await;
    let fields = StudentFields {
      email: "new@example.com".to_string(),
      ..Default::default()
    };

    Mock::given(method("POST"))
      .and(path("/students"))
      .and(body_json(serde_json::to_value(&fields).unwrap()))
      .respond_with(ResponseTemplate::new(201).set_body_json(student_json(31)))
      .expect(1)
      .mount(&server)
      .await;

    let student = test_api(&server).add(&fields).await.unwrap();
    assert_eq!(student.id, 31);
  }

  #[tokio::test]
  async fn test_update_validation_error() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
      .and(path("/students/5"))
      .respond_with(
        ResponseTemplate::new(422).set_body_json(json!({"error": {"email": "Email is invalid"}})),
      )
      .mount(&server)
      .await;

    let err = test_api(&server)
      .update(5, &StudentFields::default())
      .await
      .unwrap_err();
    let errors = err.field_errors().expect("expected validation error");
    assert_eq!(errors.get(StudentField::Email), Some("Email is invalid"));
  }

  #[tokio::test]
  async fn test_remove_accepts_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
      .and(path("/students/7"))
      .respond_with(ResponseTemplate::new(204))
      .expect(1)
      .mount(&server)
      .await;

    test_api(&server).remove(7).await.unwrap();
  }

  #[tokio::test]
  async fn test_server_error_passes_through() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
      .and(path("/students/7"))
      .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
      .mount(&server)
      .await;

    let err = test_api(&server).remove(7).await.unwrap_err();
    assert_eq!(
      err,
      ApiError::Server {
        status: 500,
        message: "boom".to_string()
      }
    );
  }

  #[tokio::test]
  async fn test_save_dispatches_on_form_variant() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
      .and(path("/students/5"))
      .respond_with(ResponseTemplate::new(200).set_body_json(student_json(5)))
      .expect(1)
      .mount(&server)
      .await;

    let form = FormData::Existing {
      id: 5,
      fields: StudentFields::default(),
    };
    assert_eq!(test_api(&server).save(&form).await.unwrap().id, 5);
  }

  #[tokio::test]
  async fn test_cancelled_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/students/1"))
      .respond_with(
        ResponseTemplate::new(200)
          .set_body_json(student_json(1))
          .set_delay(Duration::from_secs(2)),
      )
      .mount(&server)
      .await;

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
      tokio::time::sleep(Duration::from_millis(20)).await;
      canceller.cancel();
    });

    let err = test_api(&server).get(1, Some(&token)).await.unwrap_err();
    assert_eq!(err, ApiError::Cancelled);
  }
}
