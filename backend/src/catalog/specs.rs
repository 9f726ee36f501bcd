//! Named product specifications used by the catalog endpoints.

use super::spec_params::{ProductSort, ProductSpecParams};
use crate::db::specification::{Criterion, Specification};
use crate::models::{Product, ProductField};

/// Filter shared by the listing and its total count.
fn product_filter(params: &ProductSpecParams) -> Specification<Product> {
    let mut spec = Specification::new();

    if let Some(term) = params.search() {
        spec = spec.filter(Criterion::Contains(ProductField::Name, term));
    }

    let brands = params.brands();
    if !brands.is_empty() {
        spec = spec.filter(Criterion::In(
            ProductField::Brand,
            brands.into_iter().map(Into::into).collect(),
        ));
    }

    let types = params.types();
    if !types.is_empty() {
        spec = spec.filter(Criterion::In(
            ProductField::Type,
            types.into_iter().map(Into::into).collect(),
        ));
    }

    spec
}

/// Filtered, sorted page of products.
pub fn product_spec(params: &ProductSpecParams) -> Specification<Product> {
    let spec = product_filter(params);
    let spec = match params.sort() {
        ProductSort::NameAsc => spec.order_by(ProductField::Name),
        ProductSort::PriceAsc => spec.order_by(ProductField::Price),
        ProductSort::PriceDesc => spec.order_by_descending(ProductField::Price),
    };
    spec.page(params.skip(), params.page_size())
}

/// Same filter as [`product_spec`], without ordering or paging.
pub fn product_count_spec(params: &ProductSpecParams) -> Specification<Product> {
    product_filter(params)
}

/// Distinct brands, alphabetically.
pub fn brand_spec() -> Specification<Product> {
    Specification::new()
        .order_by(ProductField::Brand)
        .select(ProductField::Brand)
}

/// Distinct product types, alphabetically.
pub fn type_spec() -> Specification<Product> {
    Specification::new()
        .order_by(ProductField::Type)
        .select(ProductField::Type)
}
