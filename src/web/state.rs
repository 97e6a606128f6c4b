use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;
use uuid::Uuid;

use crate::{config::AppConfig, web::access::AccessLevel, web::storage::ObjectStore};

#[derive(Clone)]
pub struct AppState {
    pool: PgPool,
    config: Arc<AppConfig>,
    store: ObjectStore,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("failed to connect to Postgres")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run database migrations")?;

        let state = Self::from_parts(pool, config);
        state
            .store
            .ensure_root()
            .await
            .context("failed to prepare object store")?;

        Ok(state)
    }

    pub fn from_parts(pool: PgPool, config: AppConfig) -> Self {
        let store = ObjectStore::new(config.storage_root.clone(), config.public_base_url.clone());
        Self {
            pool,
            config: Arc::new(config),
            store,
        }
    }

    pub async fn ensure_seed_admin(&self) -> Result<()> {
        let has_admin: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE access_level = 'admin')",
        )
        .fetch_one(&self.pool)
        .await
        .context("failed to verify admin presence")?;

        if !has_admin {
            let email = self.config.seed_admin_email.trim().to_lowercase();
            let password_hash = crate::web::auth::hash_password(&self.config.seed_admin_password)
                .map_err(|err| anyhow!("failed to hash seed admin password: {err}"))?;

            sqlx::query(
                "INSERT INTO users (id, email, display_name, password_hash, access_level, active)
                 VALUES ($1, $2, $3, $4, $5, TRUE)
                 ON CONFLICT DO NOTHING",
            )
            .bind(Uuid::new_v4())
            .bind(&email)
            .bind("Coordenação")
            .bind(password_hash)
            .bind(AccessLevel::Admin.as_str())
            .execute(&self.pool)
            .await
            .context("failed to insert seed admin user")?;

            info!(%email, "seeded default coordinator account; change its password promptly");
        }

        Ok(())
    }

    pub fn pool_ref(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }
}
