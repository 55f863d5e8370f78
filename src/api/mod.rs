//! Student backend: HTTP adapter, typed client, data model and query keys.

pub mod cache;
pub mod client;
pub mod error;
pub mod http;
pub mod types;

pub use cache::{StudentData, StudentKey, PAGE_SIZE};
pub use client::StudentApi;
pub use error::ApiError;
pub use types::{FieldErrors, FormData, Gender, Student, StudentField, StudentFields, StudentPage};
