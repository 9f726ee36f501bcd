//! The catalog `Product` entity.

use serde::{Deserialize, Serialize};

use super::entity::{Entity, ScalarValue};

/// A product listed in the store catalog.
///
/// Every field defaults when absent from a JSON payload so that incomplete
/// bodies reach [`Product::validate`] and are rejected there, rather than
/// failing deserialization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub picture_url: String,
    /// Category tag, e.g. "Skis" or "Boots".
    #[serde(rename = "type")]
    pub product_type: String,
    pub brand: String,
    pub price: f64,
    pub quantity_in_stock: i32,
}

/// Columns of [`Product`] addressable from a specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductField {
    Id,
    Name,
    Description,
    PictureUrl,
    Type,
    Brand,
    Price,
    QuantityInStock,
}

impl ProductField {
    /// Name of the backing database column.
    pub fn column_name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Description => "description",
            Self::PictureUrl => "picture_url",
            Self::Type => "product_type",
            Self::Brand => "brand",
            Self::Price => "price",
            Self::QuantityInStock => "quantity_in_stock",
        }
    }
}

/// Reasons a product payload is rejected before touching the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductValidationError {
    #[error("Product {0} must not be empty")]
    EmptyField(&'static str),
    #[error("Product price must be greater than zero")]
    NonPositivePrice,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        picture_url: impl Into<String>,
        product_type: impl Into<String>,
        brand: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: description.into(),
            picture_url: picture_url.into(),
            product_type: product_type.into(),
            brand: brand.into(),
            price,
            quantity_in_stock: 0,
        }
    }

    /// Set the stock level.
    pub fn with_stock(mut self, quantity: i32) -> Self {
        self.quantity_in_stock = quantity;
        self
    }

    /// Check the boundary invariants. The first failing rule is reported.
    pub fn validate(&self) -> Result<(), ProductValidationError> {
        let required = [
            ("name", &self.name),
            ("description", &self.description),
            ("pictureUrl", &self.picture_url),
            ("type", &self.product_type),
            ("brand", &self.brand),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.is_empty()) {
            return Err(ProductValidationError::EmptyField(*field));
        }

        // NaN fails this comparison too.
        if !(self.price > 0.0) {
            return Err(ProductValidationError::NonPositivePrice);
        }

        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl Entity for Product {
    type Field = ProductField;

    const NAME: &'static str = "product";

    fn id(&self) -> i32 {
        self.id
    }

    fn set_id(&mut self, id: i32) {
        self.id = id;
    }

    fn value_of(&self, field: ProductField) -> ScalarValue {
        match field {
            ProductField::Id => self.id.into(),
            ProductField::Name => self.name.as_str().into(),
            ProductField::Description => self.description.as_str().into(),
            ProductField::PictureUrl => self.picture_url.as_str().into(),
            ProductField::Type => self.product_type.as_str().into(),
            ProductField::Brand => self.brand.as_str().into(),
            ProductField::Price => self.price.into(),
            ProductField::QuantityInStock => self.quantity_in_stock.into(),
        }
    }
}
