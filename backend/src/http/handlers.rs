//! HTTP handlers for the REST API.
//!
//! Each handler receives its own [`Catalog`] unit of work. Validation always
//! runs before the store is touched, and every mutation ends in exactly one
//! commit whose `false` result is reported as a 400.

use axum::{
    extract::State,
    http::{header, HeaderName, StatusCode},
    response::IntoResponse,
    Json,
};

use super::dto::{HealthResponse, TOTAL_COUNT_HEADER};
use super::error::AppError;
use super::extract::{Catalog, ListQuery, ProductBody, ProductId};
use super::state::AppState;
use crate::catalog::{brand_spec, product_count_spec, product_spec, type_spec};
use crate::db::repository::Repository;
use crate::db::specification::Specification;
use crate::models::{Product, ScalarValue};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// Path of a single product, used for `Location` headers.
pub fn product_location(id: i32) -> String {
    format!("/api/products/{}", id)
}

fn product_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Product {} does not exist", id))
}

async fn commit_or_bad_request(
    repo: &mut dyn Repository<Product>,
    what: &str,
) -> Result<(), AppError> {
    if repo.commit().await? {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Product was not {}", what)))
    }
}

async fn distinct_text(
    repo: &dyn Repository<Product>,
    spec: &Specification<Product>,
) -> HandlerResult<Vec<String>> {
    let values = repo.select_with_spec(spec).await?;
    Ok(Json(
        values.into_iter().filter_map(ScalarValue::into_text).collect(),
    ))
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let database = match state.store.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        backend: state.store.backend_name().to_string(),
    }))
}

// =============================================================================
// Products
// =============================================================================

/// GET /api/products
///
/// One page of products plus the unpaged match count in `X-Total-Count`.
pub async fn list_products(
    Catalog(repo): Catalog,
    ListQuery(params): ListQuery,
) -> Result<impl IntoResponse, AppError> {
    let products = repo.get_all_with_spec(&product_spec(&params)).await?;
    let total = repo.count_with_spec(&product_count_spec(&params)).await?;
    tracing::debug!(returned = products.len(), total, "Listed products");

    Ok((
        [(HeaderName::from_static(TOTAL_COUNT_HEADER), total.to_string())],
        Json(products),
    ))
}

/// GET /api/products/{id}
pub async fn get_product(
    Catalog(repo): Catalog,
    ProductId(id): ProductId,
) -> HandlerResult<Product> {
    repo.get_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| product_not_found(id))
}

/// POST /api/products
///
/// Any id in the body is ignored; the store assigns one.
pub async fn create_product(
    Catalog(mut repo): Catalog,
    ProductBody(product): ProductBody,
) -> Result<impl IntoResponse, AppError> {
    product
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    repo.add(product);
    commit_or_bad_request(repo.as_mut(), "created").await?;

    let created = repo
        .inserted()
        .first()
        .cloned()
        .ok_or_else(|| AppError::Internal("Commit returned no inserted product".to_string()))?;
    tracing::info!(id = created.id, name = %created.name, "Created product");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, product_location(created.id))],
        Json(created),
    ))
}

/// PUT /api/products/{id}
///
/// Full replace. The body id must equal the path id; that check never
/// reaches the store.
pub async fn update_product(
    Catalog(mut repo): Catalog,
    ProductId(id): ProductId,
    ProductBody(product): ProductBody,
) -> Result<StatusCode, AppError> {
    product
        .validate()
        .map_err(|e| AppError::BadRequest(format!("Product is not valid: {}", e)))?;

    if product.id != id {
        return Err(AppError::BadRequest(format!(
            "Id {} does not match the product id {}",
            id, product.id
        )));
    }

    if !repo.exists(id).await? {
        return Err(product_not_found(id));
    }

    repo.update(product);
    commit_or_bad_request(repo.as_mut(), "updated").await?;
    tracing::info!(id, "Updated product");

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/products/{id}
pub async fn delete_product(
    Catalog(mut repo): Catalog,
    ProductId(id): ProductId,
) -> Result<StatusCode, AppError> {
    let product = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| product_not_found(id))?;

    repo.remove(product);
    commit_or_bad_request(repo.as_mut(), "deleted").await?;
    tracing::info!(id, "Deleted product");

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/products/brands
pub async fn list_brands(Catalog(repo): Catalog) -> HandlerResult<Vec<String>> {
    distinct_text(repo.as_ref(), &brand_spec()).await
}

/// GET /api/products/types
pub async fn list_types(Catalog(repo): Catalog) -> HandlerResult<Vec<String>> {
    distinct_text(repo.as_ref(), &type_spec()).await
}
