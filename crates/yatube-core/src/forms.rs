//! Form binding and validation.
//!
//! A form holds the raw submitted strings so it can be re-rendered as typed.
//! `clean` either yields the validated values or a [`FormErrors`] keyed by
//! field name. Checks that need the store (username taken, old password
//! wrong) are added by the caller through [`FormErrors::add`].

use std::collections::BTreeMap;

use crate::domain::{Group, PostChanges};

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_GROUP: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";
pub const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";
pub const WRONG_OLD_PASSWORD: &str =
    "Your old password was entered incorrectly. Please enter it again.";

pub const USERNAME_MAX_CHARS: usize = 150;
pub const NAME_MAX_CHARS: usize = 150;
pub const PASSWORD_MIN_CHARS: usize = 8;

/// Errors collected while validating a form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<&'static str, Vec<String>>,
    non_field: Vec<String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.entry(field).or_default().push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn field(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, name: &str) -> bool {
        !self.field(name).is_empty()
    }

    pub fn non_field(&self) -> &[String] {
        &self.non_field
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

/// Post create/edit form: text plus an optional group choice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostForm {
    pub text: String,
    pub group: Option<String>,
}

impl PostForm {
    pub fn new(text: impl Into<String>, group: Option<String>) -> Self {
        Self {
            text: text.into(),
            group,
        }
    }

    /// Pre-fill from the current state of a post.
    pub fn from_changes(changes: &PostChanges) -> Self {
        Self {
            text: changes.text.clone(),
            group: changes.group_id.map(|id| id.to_string()),
        }
    }

    /// The chosen group id as submitted, if any.
    pub fn selected_group(&self) -> Option<&str> {
        self.group
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Validate against the groups that may be chosen.
    pub fn clean(&self, choices: &[Group]) -> Result<PostChanges, FormErrors> {
        let mut errors = FormErrors::new();

        let text = self.text.trim();
        if text.is_empty() {
            errors.add("text", REQUIRED);
        }

        let group_id = match self.selected_group() {
            None => None,
            Some(raw) => {
                let found = raw
                    .parse::<i32>()
                    .ok()
                    .filter(|id| choices.iter().any(|group| group.id == *id));
                if found.is_none() {
                    errors.add("group", INVALID_GROUP);
                }
                found
            }
        };

        errors.into_result(|| PostChanges {
            text: text.to_string(),
            group_id,
        })
    }
}

/// Validated signup values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signup {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupForm {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

impl SignupForm {
    pub fn clean(&self) -> Result<Signup, FormErrors> {
        let mut errors = FormErrors::new();

        let username = self.username.trim();
        for message in validate_username(username) {
            errors.add("username", message);
        }

        let first_name = self.first_name.trim();
        let last_name = self.last_name.trim();
        if first_name.chars().count() > NAME_MAX_CHARS {
            errors.add("first_name", too_long(NAME_MAX_CHARS));
        }
        if last_name.chars().count() > NAME_MAX_CHARS {
            errors.add("last_name", too_long(NAME_MAX_CHARS));
        }

        let email = self.email.trim();
        if !email.is_empty() && !looks_like_email(email) {
            errors.add("email", "Enter a valid email address.");
        }

        check_new_password(
            &mut errors,
            ("password1", &self.password1),
            ("password2", &self.password2),
            username,
        );

        errors.into_result(|| Signup {
            username: username.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            password: self.password1.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    /// Presence checks only; credentials are verified by the caller.
    pub fn clean(&self) -> Result<(String, String), FormErrors> {
        let mut errors = FormErrors::new();
        let username = self.username.trim();
        if username.is_empty() {
            errors.add("username", REQUIRED);
        }
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.into_result(|| (username.to_string(), self.password.clone()))
    }
}

/// Validated password change: the old password still needs verifying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordChangeForm {
    pub old_password: String,
    pub new_password1: String,
    pub new_password2: String,
}

impl PasswordChangeForm {
    pub fn clean(&self, username: &str) -> Result<PasswordChange, FormErrors> {
        let mut errors = FormErrors::new();
        if self.old_password.is_empty() {
            errors.add("old_password", REQUIRED);
        }
        check_new_password(
            &mut errors,
            ("new_password1", &self.new_password1),
            ("new_password2", &self.new_password2),
            username,
        );
        errors.into_result(|| PasswordChange {
            old_password: self.old_password.clone(),
            new_password: self.new_password1.clone(),
        })
    }
}

fn check_new_password(
    errors: &mut FormErrors,
    (first_field, first): (&'static str, &str),
    (second_field, second): (&'static str, &str),
    username: &str,
) {
    if first.is_empty() {
        errors.add(first_field, REQUIRED);
    }
    if second.is_empty() {
        errors.add(second_field, REQUIRED);
        return;
    }
    if first != second {
        errors.add(second_field, PASSWORD_MISMATCH);
        return;
    }
    for message in validate_password(second, username) {
        errors.add(second_field, message);
    }
}

/// Username rules: required, bounded, letters, digits and `@.+-_` only.
pub fn validate_username(username: &str) -> Vec<String> {
    if username.is_empty() {
        return vec![REQUIRED.to_string()];
    }
    let mut messages = Vec::new();
    if username.chars().count() > USERNAME_MAX_CHARS {
        messages.push(too_long(USERNAME_MAX_CHARS));
    }
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if !username.chars().all(allowed) {
        messages.push(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .to_string(),
        );
    }
    messages
}

/// Password strength rules shared by signup and password change.
pub fn validate_password(password: &str, username: &str) -> Vec<String> {
    let mut messages = Vec::new();
    if password.chars().count() < PASSWORD_MIN_CHARS {
        messages.push(format!(
            "This password is too short. It must contain at least {PASSWORD_MIN_CHARS} characters."
        ));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        messages.push("This password is entirely numeric.".to_string());
    }
    if !username.is_empty() && password.to_lowercase() == username.to_lowercase() {
        messages.push("The password is too similar to the username.".to_string());
    }
    messages
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

fn too_long(max: usize) -> String {
    format!("Ensure this value has at most {max} characters.")
}
