use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Gender as stored by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
  Male,
  Female,
  #[default]
  Other,
}

impl Gender {
  pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

  pub fn as_str(&self) -> &'static str {
    match self {
      Gender::Male => "Male",
      Gender::Female => "Female",
      Gender::Other => "Other",
    }
  }

  /// Next option, wrapping around
  pub fn next(self) -> Self {
    match self {
      Gender::Male => Gender::Female,
      Gender::Female => Gender::Other,
      Gender::Other => Gender::Male,
    }
  }

  /// Previous option, wrapping around
  pub fn prev(self) -> Self {
    match self {
      Gender::Male => Gender::Other,
      Gender::Female => Gender::Male,
      Gender::Other => Gender::Female,
    }
  }
}

/// Editable fields of a student (everything except the server-assigned id)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentFields {
  pub email: String,
  pub first_name: String,
  pub last_name: String,
  #[serde(default)]
  pub gender: Gender,
  pub country: String,
  pub avatar: String,
  pub btc_address: String,
}

impl StudentFields {
  /// Text value of a field. Gender is rendered by name.
  pub fn get(&self, field: StudentField) -> &str {
    match field {
      StudentField::Email => &self.email,
      StudentField::FirstName => &self.first_name,
      StudentField::LastName => &self.last_name,
      StudentField::Gender => self.gender.as_str(),
      StudentField::Country => &self.country,
      StudentField::Avatar => &self.avatar,
      StudentField::BtcAddress => &self.btc_address,
    }
  }

  /// Mutable text buffer for a field, `None` for gender
  pub fn text_mut(&mut self, field: StudentField) -> Option<&mut String> {
    match field {
      StudentField::Email => Some(&mut self.email),
      StudentField::FirstName => Some(&mut self.first_name),
      StudentField::LastName => Some(&mut self.last_name),
      StudentField::Gender => None,
      StudentField::Country => Some(&mut self.country),
      StudentField::Avatar => Some(&mut self.avatar),
      StudentField::BtcAddress => Some(&mut self.btc_address),
    }
  }
}

/// A student record as returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
  pub id: u64,
  #[serde(flatten)]
  pub fields: StudentFields,
}

/// One page of the student list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentPage {
  pub students: Vec<Student>,
  /// Value of the `x-total-count` response header
  pub total_count: Option<u64>,
}

/// Form contents, either a record to create or an existing one to update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormData {
  New(StudentFields),
  Existing { id: u64, fields: StudentFields },
}

impl FormData {
  pub fn id(&self) -> Option<u64> {
    match self {
      FormData::New(_) => None,
      FormData::Existing { id, .. } => Some(*id),
    }
  }

  pub fn fields(&self) -> &StudentFields {
    match self {
      FormData::New(fields) | FormData::Existing { fields, .. } => fields,
    }
  }

  pub fn fields_mut(&mut self) -> &mut StudentFields {
    match self {
      FormData::New(fields) | FormData::Existing { fields, .. } => fields,
    }
  }

  /// Reset all fields to their empty values, keeping the variant and id
  pub fn clear(&mut self) {
    *self.fields_mut() = StudentFields::default();
  }
}

/// Field names, in the order the form displays them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StudentField {
  Email,
  Gender,
  Country,
  FirstName,
  LastName,
  Avatar,
  BtcAddress,
}

impl StudentField {
  pub const FORM_ORDER: [StudentField; 7] = [
    StudentField::Email,
    StudentField::Gender,
    StudentField::Country,
    StudentField::FirstName,
    StudentField::LastName,
    StudentField::Avatar,
    StudentField::BtcAddress,
  ];

  /// Wire name, as used in JSON bodies and validation payloads
  pub fn as_str(&self) -> &'static str {
    match self {
      StudentField::Email => "email",
      StudentField::Gender => "gender",
      StudentField::Country => "country",
      StudentField::FirstName => "first_name",
      StudentField::LastName => "last_name",
      StudentField::Avatar => "avatar",
      StudentField::BtcAddress => "btc_address",
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      StudentField::Email => "Email address",
      StudentField::Gender => "Gender",
      StudentField::Country => "Country",
      StudentField::FirstName => "First Name",
      StudentField::LastName => "Last Name",
      StudentField::Avatar => "Avatar Base64",
      StudentField::BtcAddress => "BTC Address",
    }
  }
}

/// Field-level validation messages from a 422 response
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
  pub fn get(&self, field: StudentField) -> Option<&str> {
    self.0.get(field.as_str()).map(String::as_str)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FieldErrors {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self(
      iter
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect(),
    )
  }
}

/// Body of a 422 response: `{"error": {"field": "message"}}`
#[derive(Debug, Deserialize)]
pub(crate) struct ValidationBody {
  pub error: FieldErrors,
}
