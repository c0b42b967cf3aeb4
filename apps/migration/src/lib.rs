//! Schema migrations for Yatube.

pub use sea_orm_migration::prelude::*;

mod m20220823_000001_create_users;
mod m20220823_000002_create_groups;
mod m20220823_000003_create_posts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20220823_000001_create_users::Migration),
            Box::new(m20220823_000002_create_groups::Migration),
            Box::new(m20220823_000003_create_posts::Migration),
        ]
    }
}
