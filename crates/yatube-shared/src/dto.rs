//! Data Transfer Objects - form bodies and query strings.
//!
//! Every field defaults to empty so a partial submission still binds and
//! the validation layer can report what is missing. Unknown fields are
//! ignored; a post form carrying `author` binds without it. Query strings
//! bind from their raw pairs, so a repeated key takes its last value.

use serde::{Deserialize, Serialize};

/// `?page=N` on feed pages. Kept as a string: malformed values select the
/// first page instead of failing the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<(String, String)>")]
pub struct PageQuery {
    pub page: Option<String>,
}

impl From<Vec<(String, String)>> for PageQuery {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self {
            page: last_value(pairs, "page"),
        }
    }
}

/// `?next=/path/` carried through the login flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<(String, String)>")]
pub struct NextQuery {
    pub next: Option<String>,
}

impl From<Vec<(String, String)>> for NextQuery {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self {
            next: last_value(pairs, "next"),
        }
    }
}

fn last_value(pairs: Vec<(String, String)>, key: &str) -> Option<String> {
    pairs
        .into_iter()
        .filter(|(k, _)| k == key)
        .map(|(_, v)| v)
        .last()
}

/// Post create/edit form body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostFormData {
    pub text: String,
    pub group: Option<String>,
}

/// Signup form body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignupFormData {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

/// Login form body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginFormData {
    pub username: String,
    pub password: String,
    pub next: Option<String>,
}

/// Password change form body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordChangeFormData {
    pub old_password: String,
    pub new_password1: String,
    pub new_password2: String,
}
