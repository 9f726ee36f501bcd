use diesel::prelude::*;

use super::schema::products;
use crate::models::Product;

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub picture_url: String,
    pub product_type: String,
    pub brand: String,
    pub price: f64,
    pub quantity_in_stock: i32,
}

/// Insert payload; the id comes from the `SERIAL` column.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = products)]
pub struct NewProductRow {
    pub name: String,
    pub description: String,
    pub picture_url: String,
    pub product_type: String,
    pub brand: String,
    pub price: f64,
    pub quantity_in_stock: i32,
}

/// Full-replace update payload.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = products)]
pub struct ProductChangeset {
    pub name: String,
    pub description: String,
    pub picture_url: String,
    pub product_type: String,
    pub brand: String,
    pub price: f64,
    pub quantity_in_stock: i32,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            description: row.description,
            picture_url: row.picture_url,
            product_type: row.product_type,
            brand: row.brand,
            price: row.price,
            quantity_in_stock: row.quantity_in_stock,
        }
    }
}

impl From<&Product> for NewProductRow {
    fn from(product: &Product) -> Self {
        NewProductRow {
            name: product.name.clone(),
            description: product.description.clone(),
            picture_url: product.picture_url.clone(),
            product_type: product.product_type.clone(),
            brand: product.brand.clone(),
            price: product.price,
            quantity_in_stock: product.quantity_in_stock,
        }
    }
}

impl From<&Product> for ProductChangeset {
    fn from(product: &Product) -> Self {
        ProductChangeset {
            name: product.name.clone(),
            description: product.description.clone(),
            picture_url: product.picture_url.clone(),
            product_type: product.product_type.clone(),
            brand: product.brand.clone(),
            price: product.price,
            quantity_in_stock: product.quantity_in_stock,
        }
    }
}
