//! Serde-deserializable envelope of the randomuser.me API response.
//!
//! User records themselves decode straight into the domain types; only the
//! wrapper lives here.

use serde::Deserialize;

use super::types::User;

#[derive(Debug, Deserialize)]
pub struct ApiUsersResponse {
  pub results: Vec<User>,
  pub info: ApiInfo,
}

#[derive(Debug, Deserialize)]
pub struct ApiInfo {
  pub seed: String,
  pub results: u32,
  pub page: u32,
  pub version: String,
}
