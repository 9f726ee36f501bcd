//! Postgres repository implementation using Diesel.
//!
//! [`PostgresStore`] owns the r2d2 pool and runs the embedded migrations on
//! start-up; each request opens a [`PostgresRepository`] that stages changes
//! locally and flushes them in a single transaction on commit.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tokio::task;

use crate::db::repository::{
    DataStore, ErrorContext, Repository, RepositoryError, RepositoryResult,
};
use crate::db::specification::{self, Specification};
use crate::db::unit_of_work::{Change, ChangeSet};
use crate::models::{Entity, Product, ScalarValue};

mod models;
mod query;
mod schema;

use models::{NewProductRow, ProductChangeset, ProductRow};
use schema::products;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub database_url: String,
    pub max_pool_size: u32,
    pub min_pool_size: u32,
    pub connection_timeout_sec: u64,
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

/// Parse an optional numeric environment variable, ignoring garbage.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl PostgresConfig {
    /// Create configuration from the `DATABASE_URL` / `PG_*` environment
    /// variables listed in the module docs.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let defaults = Self::default();
        Ok(Self {
            database_url,
            max_pool_size: env_or("PG_POOL_MAX", defaults.max_pool_size),
            min_pool_size: env_or("PG_POOL_MIN", defaults.min_pool_size),
            connection_timeout_sec: env_or("PG_CONN_TIMEOUT_SEC", defaults.connection_timeout_sec),
            idle_timeout_sec: env_or("PG_IDLE_TIMEOUT_SEC", defaults.idle_timeout_sec),
            max_retries: env_or("PG_MAX_RETRIES", defaults.max_retries),
            retry_delay_ms: env_or("PG_RETRY_DELAY_MS", defaults.retry_delay_ms),
        })
    }

    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Pool health statistics.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    pub connections_in_use: u32,
    pub idle_connections: u32,
    pub total_connections: u32,
    pub max_size: u32,
    /// Total queries executed, successful or not
    pub total_queries: u64,
    pub failed_queries: u64,
    pub retried_operations: u64,
}

#[derive(Debug, Default)]
struct QueryCounters {
    total: AtomicU64,
    failed: AtomicU64,
    retried: AtomicU64,
}

/// Shared Postgres-backed product store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    config: PostgresConfig,
    counters: Arc<QueryCounters>,
}

impl PostgresStore {
    /// Build the pool and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
                RepositoryError::internal_with_context(
                    format!("Migration failed: {}", e),
                    ErrorContext::new("run_migrations"),
                )
            })?;
        }

        log::info!(
            "Postgres product store ready (pool max={}, min={})",
            config.max_pool_size,
            config.min_pool_size
        );

        Ok(Self {
            pool,
            config,
            counters: Arc::new(QueryCounters::default()),
        })
    }

    /// Run `f` on a pooled connection inside `spawn_blocking`, retrying
    /// retryable failures with exponential backoff.
    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: Fn(&mut PgConnection) -> RepositoryResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let mut retry_delay = Duration::from_millis(self.config.retry_delay_ms);
        let counters = Arc::clone(&self.counters);

        task::spawn_blocking(move || {
            let mut attempt = 0;
            loop {
                let result = pool
                    .get()
                    .map_err(|e| {
                        RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1)),
                        )
                    })
                    .and_then(|mut conn| {
                        counters.total.fetch_add(1, Ordering::Relaxed);
                        f(&mut conn)
                    });

                match result {
                    Ok(value) => return Ok(value),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        attempt += 1;
                        counters.retried.fetch_add(1, Ordering::Relaxed);
                        log::warn!(
                            "{} failed (attempt {}/{}), retrying in {:?}: {}",
                            operation,
                            attempt,
                            max_retries + 1,
                            retry_delay,
                            e
                        );
                        std::thread::sleep(retry_delay);
                        retry_delay *= 2;
                    }
                    Err(e) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        return Err(e.with_operation(operation).with_entity(Product::NAME));
                    }
                }
            }
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }

    /// Current pool state and query counters.
    pub fn pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections_in_use: state.connections - state.idle_connections,
            idle_connections: state.idle_connections,
            total_connections: state.connections,
            max_size: self.config.max_pool_size,
            total_queries: self.counters.total.load(Ordering::Relaxed),
            failed_queries: self.counters.failed.load(Ordering::Relaxed),
            retried_operations: self.counters.retried.load(Ordering::Relaxed),
        }
    }

    /// Open a typed unit of work. [`DataStore::begin`] boxes the same thing.
    pub fn repository(&self) -> PostgresRepository {
        PostgresRepository {
            store: self.clone(),
            changes: ChangeSet::new(),
            inserted: Vec::new(),
        }
    }
}

#[async_trait]
impl DataStore<Product> for PostgresStore {
    fn begin(&self) -> Box<dyn Repository<Product>> {
        Box::new(self.repository())
    }

    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn("health_check", |conn| {
            sql_query("SELECT 1").execute(conn)?;
            Ok(true)
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

/// Request-scoped product repository over a [`PostgresStore`].
pub struct PostgresRepository {
    store: PostgresStore,
    changes: ChangeSet<Product>,
    inserted: Vec<Product>,
}

fn vanished(kind: &str, id: i32) -> RepositoryError {
    RepositoryError::transaction_with_context(
        format!("Cannot {} {} {}: row does not exist", kind, Product::NAME, id),
        ErrorContext::new("commit")
            .with_entity(Product::NAME)
            .with_entity_id(id),
    )
}

/// Apply staged changes inside an open transaction, returning the affected
/// row count and the inserted rows.
fn apply_changes(
    conn: &mut PgConnection,
    changes: &[Change<Product>],
) -> RepositoryResult<(usize, Vec<Product>)> {
    let mut affected = 0;
    let mut inserted = Vec::new();

    for change in changes {
        match change {
            Change::Added(product) => {
                let row = diesel::insert_into(products::table)
                    .values(NewProductRow::from(product))
                    .returning(ProductRow::as_returning())
                    .get_result::<ProductRow>(conn)?;
                inserted.push(Product::from(row));
                affected += 1;
            }
            Change::Updated(product) => {
                let updated = diesel::update(products::table.find(product.id))
                    .set(ProductChangeset::from(product))
                    .execute(conn)?;
                if updated == 0 {
                    return Err(vanished("update", product.id));
                }
                affected += updated;
            }
            Change::Removed(product) => {
                let deleted = diesel::delete(products::table.find(product.id)).execute(conn)?;
                if deleted == 0 {
                    return Err(vanished("remove", product.id));
                }
                affected += deleted;
            }
        }
    }

    Ok((affected, inserted))
}

#[async_trait]
impl Repository<Product> for PostgresRepository {
    async fn get_by_id(&self, id: i32) -> RepositoryResult<Option<Product>> {
        self.store
            .with_conn("get_by_id", move |conn| {
                let row = products::table
                    .find(id)
                    .select(ProductRow::as_select())
                    .first::<ProductRow>(conn)
                    .optional()?;
                Ok(row.map(Product::from))
            })
            .await
    }

    async fn get_all(&self) -> RepositoryResult<Vec<Product>> {
        self.store
            .with_conn("get_all", |conn| {
                let rows = products::table
                    .order_by(products::id.asc())
                    .select(ProductRow::as_select())
                    .load::<ProductRow>(conn)?;
                Ok(rows.into_iter().map(Product::from).collect())
            })
            .await
    }

    async fn get_one_with_spec(
        &self,
        spec: &Specification<Product>,
    ) -> RepositoryResult<Option<Product>> {
        let spec = spec.clone();
        self.store
            .with_conn("get_one_with_spec", move |conn| {
                let row = query::rows_query(&spec)
                    .select(ProductRow::as_select())
                    .first::<ProductRow>(conn)
                    .optional()?;
                Ok(row.map(Product::from))
            })
            .await
    }

    async fn get_all_with_spec(
        &self,
        spec: &Specification<Product>,
    ) -> RepositoryResult<Vec<Product>> {
        if !spec.includes().is_empty() {
            log::debug!(
                "products have no relations to join, ignoring include hints {:?}",
                spec.includes()
            );
        }
        let spec = spec.clone();
        self.store
            .with_conn("get_all_with_spec", move |conn| {
                let rows = query::rows_query(&spec)
                    .select(ProductRow::as_select())
                    .load::<ProductRow>(conn)?;
                Ok(rows.into_iter().map(Product::from).collect())
            })
            .await
    }

    async fn select_with_spec(
        &self,
        spec: &Specification<Product>,
    ) -> RepositoryResult<Vec<ScalarValue>> {
        let Some(field) = spec.selector() else {
            return Err(RepositoryError::validation_with_context(
                "Specification has no selector",
                ErrorContext::new("select_with_spec").with_entity(Product::NAME),
            ));
        };

        let spec = spec.clone();
        self.store
            .with_conn("select_with_spec", move |conn| {
                if let (true, Some(order)) = (query::distinct_in_sql(&spec), spec.ordering()) {
                    return Ok(query::load_distinct(conn, &spec, field, order.direction)?);
                }
                let rows = query::rows_query(&spec)
                    .select(ProductRow::as_select())
                    .load::<ProductRow>(conn)?;
                Ok(specification::distinct(
                    rows.into_iter().map(|row| Product::from(row).value_of(field)),
                ))
            })
            .await
    }

    async fn count_with_spec(&self, spec: &Specification<Product>) -> RepositoryResult<usize> {
        let criteria = spec.criteria().cloned();
        self.store
            .with_conn("count_with_spec", move |conn| {
                let mut count_query = products::table.into_boxed();
                if let Some(filter) = criteria.as_ref().and_then(query::predicate) {
                    count_query = count_query.filter(filter);
                }
                let total = count_query.count().get_result::<i64>(conn)?;
                Ok(total.max(0) as usize)
            })
            .await
    }

    fn add(&mut self, entity: Product) {
        self.changes.stage_add(entity);
    }

    fn update(&mut self, entity: Product) {
        self.changes.stage_update(entity);
    }

    fn remove(&mut self, entity: Product) {
        self.changes.stage_remove(entity);
    }

    async fn exists(&self, id: i32) -> RepositoryResult<bool> {
        self.store
            .with_conn("exists", move |conn| {
                let found = diesel::select(diesel::dsl::exists(products::table.find(id)))
                    .get_result::<bool>(conn)?;
                Ok(found)
            })
            .await
    }

    async fn commit(&mut self) -> RepositoryResult<bool> {
        self.inserted.clear();
        if self.changes.is_empty() {
            return Ok(false);
        }

        let changes: Arc<Vec<Change<Product>>> = Arc::new(self.changes.take());
        let (affected, inserted) = self
            .store
            .with_conn("commit", move |conn| {
                conn.transaction::<_, RepositoryError, _>(|tx| apply_changes(tx, &changes))
            })
            .await?;

        log::debug!("Committed {} product row(s)", affected);
        self.inserted = inserted;
        Ok(affected > 0)
    }

    fn inserted(&self) -> &[Product] {
        &self.inserted
    }
}
