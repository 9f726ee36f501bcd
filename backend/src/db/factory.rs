//! Store factory for dependency injection.
//!
//! Picks a product store implementation from runtime configuration: an
//! explicit [`RepositoryType`], the environment, or a `repository.toml` file.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use super::repo_config::RepositoryConfig;
use super::repositories::LocalStore;
#[cfg(feature = "postgres-repo")]
use super::repositories::PostgresStore;
use super::repository::{DataStore, RepositoryError, RepositoryResult};
use super::PostgresConfig;
use crate::models::Product;

/// Shared product store handle used by the HTTP layer.
pub type ProductStore = Arc<dyn DataStore<Product>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryType {
    /// Postgres + Diesel implementation
    Postgres,
    /// In-memory local store
    Local,
}

impl FromStr for RepositoryType {
    type Err = String;

    /// Accepts `postgres`, `pg` and `local`, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "local" => Ok(Self::Local),
            _ => Err(format!("Unknown repository type: {}", s)),
        }
    }
}

impl RepositoryType {
    /// `REPOSITORY_TYPE` if set and valid, else Postgres when a database URL
    /// is present, else Local.
    pub fn from_env() -> Self {
        if let Ok(val) = std::env::var("REPOSITORY_TYPE") {
            match val.parse() {
                Ok(repo_type) => return repo_type,
                Err(e) => log::warn!("{}, falling back to detection", e),
            }
        }

        if std::env::var("DATABASE_URL").is_ok() || std::env::var("PG_DATABASE_URL").is_ok() {
            Self::Postgres
        } else {
            Self::Local
        }
    }
}

#[cfg(not(feature = "postgres-repo"))]
fn postgres_disabled() -> RepositoryError {
    RepositoryError::configuration("Postgres repository feature not enabled")
}

/// Factory for product stores.
///
/// ```ignore
/// use skistore::db::{RepositoryType, StoreFactory};
///
/// let store = StoreFactory::create(RepositoryType::Local, None).await?;
/// let repo = store.begin();
/// ```
pub struct StoreFactory;

impl StoreFactory {
    /// Create a store of the given type.
    ///
    /// `postgres_config` is required for [`RepositoryType::Postgres`] and
    /// ignored otherwise.
    pub async fn create(
        repo_type: RepositoryType,
        postgres_config: Option<&PostgresConfig>,
    ) -> RepositoryResult<ProductStore> {
        match repo_type {
            RepositoryType::Local => Ok(Self::create_local()),
            RepositoryType::Postgres => {
                #[cfg(feature = "postgres-repo")]
                {
                    let config = postgres_config.ok_or_else(|| {
                        RepositoryError::configuration(
                            "Postgres repository requires PostgresConfig",
                        )
                    })?;
                    let pg = Self::create_postgres(config).await?;
                    Ok(pg as ProductStore)
                }
                #[cfg(not(feature = "postgres-repo"))]
                {
                    let _ = postgres_config;
                    Err(postgres_disabled())
                }
            }
        }
    }

    /// Connect to Postgres and run migrations.
    #[cfg(feature = "postgres-repo")]
    pub async fn create_postgres(config: &PostgresConfig) -> RepositoryResult<Arc<PostgresStore>> {
        let config = config.clone();
        let store = tokio::task::spawn_blocking(move || PostgresStore::new(config))
            .await
            .map_err(|e| RepositoryError::internal(format!("Task join error: {}", e)))??;
        Ok(Arc::new(store))
    }

    /// Create an empty in-memory store.
    pub fn create_local() -> ProductStore {
        Arc::new(LocalStore::<Product>::new())
    }

    /// Create a store from `REPOSITORY_TYPE` / `DATABASE_URL` and the `PG_*`
    /// pool variables.
    pub async fn from_env() -> RepositoryResult<ProductStore> {
        match RepositoryType::from_env() {
            RepositoryType::Local => Ok(Self::create_local()),
            RepositoryType::Postgres => {
                #[cfg(feature = "postgres-repo")]
                {
                    let config =
                        PostgresConfig::from_env().map_err(RepositoryError::configuration)?;
                    let pg = Self::create_postgres(&config).await?;
                    Ok(pg as ProductStore)
                }
                #[cfg(not(feature = "postgres-repo"))]
                {
                    Err(postgres_disabled())
                }
            }
        }
    }

    /// Create a store from a `repository.toml` file.
    pub async fn from_config_file<P: AsRef<Path>>(config_path: P) -> RepositoryResult<ProductStore> {
        let config = RepositoryConfig::from_file(config_path)?;
        Self::from_repository_config(&config).await
    }

    /// Create a store from the first `repository.toml` found in the default
    /// locations.
    pub async fn from_default_config() -> RepositoryResult<ProductStore> {
        let config = RepositoryConfig::from_default_location()?;
        Self::from_repository_config(&config).await
    }

    pub async fn from_repository_config(config: &RepositoryConfig) -> RepositoryResult<ProductStore> {
        StoreBuilder::new().config(config)?.build().await
    }
}

/// Fluent configuration for store creation.
///
/// ```ignore
/// let store = StoreBuilder::new()
///     .repository_type(RepositoryType::Postgres)
///     .postgres_config(PostgresConfig::from_env()?)
///     .build()
///     .await?;
/// ```
pub struct StoreBuilder {
    repo_type: RepositoryType,
    #[cfg(feature = "postgres-repo")]
    postgres_config: Option<PostgresConfig>,
}

impl StoreBuilder {
    /// Start from [`RepositoryType::from_env`].
    pub fn new() -> Self {
        Self {
            repo_type: RepositoryType::from_env(),
            #[cfg(feature = "postgres-repo")]
            postgres_config: None,
        }
    }

    pub fn repository_type(mut self, repo_type: RepositoryType) -> Self {
        self.repo_type = repo_type;
        self
    }

    #[cfg(feature = "postgres-repo")]
    pub fn postgres_config(mut self, config: PostgresConfig) -> Self {
        self.postgres_config = Some(config);
        self
    }

    /// Take the backend type and Postgres settings from the environment.
    pub fn from_env(mut self) -> RepositoryResult<Self> {
        self.repo_type = RepositoryType::from_env();
        if self.repo_type == RepositoryType::Postgres {
            #[cfg(feature = "postgres-repo")]
            {
                let config = PostgresConfig::from_env().map_err(RepositoryError::configuration)?;
                self.postgres_config = Some(config);
            }
            #[cfg(not(feature = "postgres-repo"))]
            {
                return Err(postgres_disabled());
            }
        }
        Ok(self)
    }

    /// Take the backend type and Postgres settings from a parsed config file.
    pub fn config(mut self, config: &RepositoryConfig) -> RepositoryResult<Self> {
        self.repo_type = config.repository_type()?;
        if self.repo_type == RepositoryType::Postgres {
            #[cfg(feature = "postgres-repo")]
            {
                self.postgres_config = config.to_postgres_config()?;
            }
            #[cfg(not(feature = "postgres-repo"))]
            {
                return Err(postgres_disabled());
            }
        }
        Ok(self)
    }

    pub fn from_config_file<P: AsRef<Path>>(self, config_path: P) -> RepositoryResult<Self> {
        let config = RepositoryConfig::from_file(config_path)?;
        self.config(&config)
    }

    pub async fn build(self) -> RepositoryResult<ProductStore> {
        #[cfg(feature = "postgres-repo")]
        let pg_config = self.postgres_config.as_ref();
        #[cfg(not(feature = "postgres-repo"))]
        let pg_config = None;

        StoreFactory::create(self.repo_type, pg_config).await
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
