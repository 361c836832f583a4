//! Helpers for tests that need a real `PostgreSQL` database.
//!
//! Mock connections cannot raise unique-index violations, so the race tests
//! for the toggle engine run against a throwaway database created here.
//!
//! The suites using these helpers are `#[ignore]`d. Start a server, for
//! example `docker run -d -p 5433:5432 -e POSTGRES_USER=flux_test
//! -e POSTGRES_PASSWORD=flux_test postgres:16`, then run
//! `cargo test -p flux-db -p flux-core -- --ignored`. The `TEST_DB_*`
//! variables override the connection settings.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Set,
    Statement,
};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::entities::{post, user};
use crate::migrations::Migrator;

/// Connection settings for the test server, read from `TEST_DB_*`.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

fn env_or(key: &str, fallback: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| fallback.to_string())
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            host: env_or("TEST_DB_HOST", "localhost"),
            port: std::env::var("TEST_DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5433),
            username: env_or("TEST_DB_USER", "flux_test"),
            password: env_or("TEST_DB_PASSWORD", "flux_test"),
            database: env_or("TEST_DB_NAME", "flux_test"),
        }
    }
}

impl TestDbConfig {
    /// URL of the configured database.
    #[must_use]
    pub fn database_url(&self) -> String {
        self.url_for(&self.database)
    }

    /// URL of the maintenance database used to create and drop test databases.
    #[must_use]
    pub fn admin_url(&self) -> String {
        self.url_for("postgres")
    }

    fn url_for(&self, database: &str) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, database
        )
    }
}

/// A freshly created, migrated database that is dropped by [`Self::teardown`].
pub struct TestDatabase {
    pub conn: Arc<DatabaseConnection>,
    pub config: TestDbConfig,
}

impl TestDatabase {
    /// Create a uniquely named database and apply every migration.
    pub async fn create_migrated() -> Result<Self, DbErr> {
        let mut config = TestDbConfig::default();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        config.database = format!("flux_test_{}", &suffix[..12]);

        let admin = Database::connect(&config.admin_url()).await?;
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("CREATE DATABASE \"{}\"", config.database),
            ))
            .await?;
        admin.close().await?;

        let conn = Database::connect(&config.database_url()).await?;
        Migrator::up(&conn, None).await?;

        info!(database = %config.database, "Created test database");
        Ok(Self {
            conn: Arc::new(conn),
            config,
        })
    }

    /// Get a shared handle to the connection pool.
    #[must_use]
    pub fn connection(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.conn)
    }

    /// Insert a user with a bearer token equal to `token-{id}`.
    pub async fn seed_user(&self, id: &str, username: &str) -> Result<user::Model, DbErr> {
        user::ActiveModel {
            id: Set(id.to_string()),
            username: Set(username.to_string()),
            token: Set(Some(format!("token-{id}"))),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.conn.as_ref())
        .await
    }

    /// Insert a live post with zeroed counters.
    pub async fn seed_post(&self, id: &str, author_id: &str) -> Result<post::Model, DbErr> {
        post::ActiveModel {
            id: Set(id.to_string()),
            user_id: Set(author_id.to_string()),
            text: Set(Some("seeded".to_string())),
            like_count: Set(0),
            share_count: Set(0),
            is_deleted: Set(false),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.conn.as_ref())
        .await
    }

    /// Close the pool and drop the database.
    ///
    /// Handles still held by services keep their pool open; those backends are
    /// terminated before the drop.
    pub async fn teardown(self) -> Result<(), DbErr> {
        if let Ok(conn) = Arc::try_unwrap(self.conn) {
            conn.close().await?;
        }

        let admin = Database::connect(&self.config.admin_url()).await?;
        // Stray pool connections would block the drop
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!(
                    "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{}'",
                    self.config.database
                ),
            ))
            .await
            .ok();
        admin
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                format!("DROP DATABASE IF EXISTS \"{}\"", self.config.database),
            ))
            .await?;
        admin.close().await?;

        info!(database = %self.config.database, "Dropped test database");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let config = TestDbConfig {
            host: "db".to_string(),
            port: 5433,
            username: "u".to_string(),
            password: "p".to_string(),
            database: "flux_x".to_string(),
        };
        assert_eq!(config.database_url(), "postgres://u:p@db:5433/flux_x");
        assert_eq!(config.admin_url(), "postgres://u:p@db:5433/postgres");
    }
}
