//! Request extractors for the catalog endpoints.
//!
//! Rejections are turned into [`AppError`]s so every failure carries the
//! same JSON error body.

use std::convert::Infallible;

use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::Json;

use super::error::AppError;
use super::state::AppState;
use crate::catalog::ProductSpecParams;
use crate::db::repository::Repository;
use crate::models::Product;

/// A unit of work opened for the current request.
///
/// Dropped with the handler, so staged changes that were never committed
/// simply disappear.
pub struct Catalog(pub Box<dyn Repository<Product>>);

impl FromRequestParts<AppState> for Catalog {
    type Rejection = Infallible;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Catalog(state.store.begin()))
    }
}

/// Integer product id from the path. Anything else is an unknown route.
pub struct ProductId(pub i32);

impl<S: Send + Sync> FromRequestParts<S> for ProductId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i32>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::NotFound(rejection.body_text()))?;
        Ok(ProductId(id))
    }
}

/// Listing query string.
pub struct ListQuery(pub ProductSpecParams);

impl<S: Send + Sync> FromRequestParts<S> for ListQuery {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<ProductSpecParams>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(ListQuery(params))
    }
}

/// JSON product body. Malformed JSON, a wrong content type or a non-object
/// payload are all plain 400s.
pub struct ProductBody(pub Product);

impl<S: Send + Sync> FromRequest<S> for ProductBody {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(product) = Json::<Product>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(ProductBody(product))
    }
}
