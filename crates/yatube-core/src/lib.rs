//! # Yatube Core
//!
//! The domain layer of Yatube.
//! This crate contains the records, form validation and pagination rules of
//! the blog with zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod forms;
pub mod pagination;
pub mod ports;

pub use error::DomainError;
pub use pagination::{POSTS_PER_PAGE, Page, PageLink, Paginator};
