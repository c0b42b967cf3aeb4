//! # Yatube Shared
//!
//! Wire shapes of the HTML forms and query strings the server accepts.

pub mod dto;

pub use dto::{
    LoginFormData, NextQuery, PageQuery, PasswordChangeFormData, PostFormData, SignupFormData,
};
