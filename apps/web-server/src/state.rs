//! Application state - shared across all handlers.

use std::sync::Arc;

use yatube_core::ports::{
    GroupRepository, PasswordService, PostRepository, TokenService, UserRepository,
};
use yatube_infra::{Argon2PasswordService, InMemoryStore, JwtTokenService};

use crate::config::AppConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    pub secure_cookies: bool,
    /// Which store backs the repositories, reported by the health check.
    pub storage: &'static str,
}

/// The three repositories over one store.
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub storage: &'static str,
}

impl Repositories {
    pub fn in_memory() -> Self {
        let store = InMemoryStore::new();
        Self {
            users: Arc::new(store.users()),
            groups: Arc::new(store.groups()),
            posts: Arc::new(store.posts()),
            storage: "memory",
        }
    }

    #[cfg(feature = "postgres")]
    async fn postgres(
        config: &yatube_infra::database::DatabaseConfig,
        run_migrations: bool,
    ) -> Result<Self, migration::DbErr> {
        use migration::{Migrator, MigratorTrait};
        use yatube_infra::DatabaseConnections;
        use yatube_infra::database::{
            PostgresGroupRepository, PostgresPostRepository, PostgresUserRepository,
        };

        let connections = DatabaseConnections::init(config).await?;
        if run_migrations {
            tracing::info!("Applying pending migrations");
            Migrator::up(&connections.main, None).await?;
        }

        let db = connections.main;
        Ok(Self {
            users: Arc::new(PostgresUserRepository::new(db.clone())),
            groups: Arc::new(PostgresGroupRepository::new(db.clone())),
            posts: Arc::new(PostgresPostRepository::new(db)),
            storage: "postgres",
        })
    }
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        #[cfg(feature = "postgres")]
        let repos = match &config.database {
            Some(db_config) => match Repositories::postgres(db_config, config.run_migrations).await
            {
                Ok(repos) => Some(repos),
                Err(e) => {
                    tracing::error!(
                        "Failed to connect to database: {}. Using in-memory fallback.",
                        e
                    );
                    None
                }
            },
            None => {
                tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
                None
            }
        };

        #[cfg(not(feature = "postgres"))]
        let repos: Option<Repositories> = {
            tracing::info!("Running without postgres feature - using in-memory repositories");
            None
        };

        let repos = repos.unwrap_or_else(Repositories::in_memory);
        tracing::info!(storage = repos.storage, "Application state initialized");

        Self::from_parts(
            repos,
            Arc::new(JwtTokenService::new(config.jwt.clone())),
            Arc::new(Argon2PasswordService::new()),
            config.secure_cookies,
        )
    }

    pub fn from_parts(
        repos: Repositories,
        tokens: Arc<dyn TokenService>,
        passwords: Arc<dyn PasswordService>,
        secure_cookies: bool,
    ) -> Self {
        Self {
            users: repos.users,
            groups: repos.groups,
            posts: repos.posts,
            tokens,
            passwords,
            secure_cookies,
            storage: repos.storage,
        }
    }
}
