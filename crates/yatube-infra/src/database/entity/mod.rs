//! SeaORM entities mirroring the `migration` crate's schema.

pub mod group;
pub mod post;
pub mod user;
