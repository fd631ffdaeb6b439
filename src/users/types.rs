use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// A user record as returned by the API and stored in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id: UserId,
  pub name: Name,
  pub email: String,
  pub phone: String,
  pub cell: String,
  pub picture: Picture,
  pub location: Location,
  pub dob: DateInfo,
  pub registered: DateInfo,
  pub nat: String,
  pub gender: String,
}

/// National identifier; the API leaves both halves null for some nationalities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserId {
  pub name: Option<String>,
  pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name {
  pub title: String,
  pub first: String,
  pub last: String,
}

impl Name {
  pub fn full_name(&self) -> String {
    format!("{} {} {}", self.title, self.first, self.last)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Picture {
  pub large: String,
  pub medium: String,
  pub thumbnail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
  pub street: Street,
  pub city: String,
  pub state: String,
  pub country: String,
  pub postcode: Postcode,
  pub coordinates: Coordinates,
  pub timezone: Timezone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Street {
  pub number: i64,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinates {
  pub latitude: String,
  pub longitude: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timezone {
  pub offset: String,
  pub description: String,
}

/// ISO-8601 timestamp plus the age in years it implies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateInfo {
  pub date: String,
  pub age: u32,
}

/// Postal code; the API sends either a string or a number depending on country.
///
/// The representation stays private, callers read it through `Display` or
/// [`Postcode::as_string`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Postcode(PostcodeValue);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum PostcodeValue {
  Text(String),
  Number(i64),
}

impl Postcode {
  pub fn as_string(&self) -> String {
    self.to_string()
  }
}

impl fmt::Display for Postcode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.0 {
      PostcodeValue::Text(s) => f.write_str(s),
      PostcodeValue::Number(n) => write!(f, "{}", n),
    }
  }
}

impl From<&str> for Postcode {
  fn from(value: &str) -> Self {
    Postcode(PostcodeValue::Text(value.to_string()))
  }
}

impl From<i64> for Postcode {
  fn from(value: i64) -> Self {
    Postcode(PostcodeValue::Number(value))
  }
}

// ============================================================================
// Detail formatting
// ============================================================================

impl User {
  pub fn full_name(&self) -> String {
    self.name.full_name()
  }

  pub fn postcode(&self) -> String {
    self.location.postcode.as_string()
  }

  /// "number street, city, state, country"
  pub fn address(&self) -> String {
    let loc = &self.location;
    format!(
      "{} {}, {}, {}, {}",
      loc.street.number, loc.street.name, loc.city, loc.state, loc.country
    )
  }

  pub fn gender_label(&self) -> String {
    capitalize(&self.gender)
  }

  pub fn date_of_birth_label(&self) -> String {
    format!("{} (Age: {})", format_date(&self.dob.date), self.dob.age)
  }

  pub fn registration_label(&self) -> String {
    format!(
      "{} (Duration: {} years)",
      format_date(&self.registered.date),
      self.registered.age
    )
  }

  pub fn picture_url(&self) -> Option<Url> {
    Url::parse(&self.picture.large).ok()
  }

  /// Case-insensitive substring match against full name or email.
  pub fn matches(&self, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    self.full_name().to_lowercase().contains(&needle) || self.email.to_lowercase().contains(&needle)
  }
}

/// Render an ISO-8601 date as "Jan 1, 1990", keeping the raw text if it doesn't parse.
fn format_date(raw: &str) -> String {
  match DateTime::parse_from_rfc3339(raw) {
    Ok(dt) => dt.format("%b %-d, %Y").to_string(),
    Err(_) => raw.to_string(),
  }
}

fn capitalize(s: &str) -> String {
  let mut chars = s.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
    None => String::new(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::users::fixtures::mock_user;

  #[test]
  fn test_postcode_decodes_both_shapes() {
    let text: Postcode = serde_json::from_str("\"EC1A 1BB\"").unwrap();
    let number: Postcode = serde_json::from_str("10001").unwrap();

    assert_eq!(text.as_string(), "EC1A 1BB");
    assert_eq!(number.as_string(), "10001");
  }

  #[test]
  fn test_postcode_rejects_other_shapes() {
    assert!(serde_json::from_str::<Postcode>("true").is_err());
    assert!(serde_json::from_str::<Postcode>("null").is_err());
  }

  #[test]
  fn test_postcode_keeps_wire_shape_when_serialized() {
    assert_eq!(serde_json::to_string(&Postcode::from(10001_i64)).unwrap(), "10001");
    assert_eq!(serde_json::to_string(&Postcode::from("H0H")).unwrap(), "\"H0H\"");
  }

  #[test]
  fn test_detail_labels() {
    let user = mock_user(0);

    assert_eq!(user.full_name(), "Mr John Doe0");
    assert_eq!(user.address(), "123 Main St, New York, NY, USA");
    assert_eq!(user.gender_label(), "Male");
    assert_eq!(user.date_of_birth_label(), "Jan 1, 1990 (Age: 33)");
    assert_eq!(user.registration_label(), "Jan 1, 2010 (Duration: 13 years)");
    assert_eq!(
      user.picture_url().map(|u| u.to_string()),
      Some("https://example.com/large0.jpg".to_string())
    );
  }

  #[test]
  fn test_unparseable_date_is_shown_raw() {
    let mut user = mock_user(0);
    user.dob.date = "sometime".to_string();

    assert_eq!(user.date_of_birth_label(), "sometime (Age: 33)");
  }

  #[test]
  fn test_matches_name_or_email_case_insensitively() {
    let user = mock_user(4);

    assert!(user.matches("JOHN"));
    assert!(user.matches("doe4"));
    assert!(user.matches("@EXAMPLE.com"));
    assert!(!user.matches("jane"));
  }
}
