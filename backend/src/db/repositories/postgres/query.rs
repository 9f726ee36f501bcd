//! Translation of product specifications into boxed Diesel queries.
//!
//! Every translation here must agree with the in-memory evaluator in
//! `db::specification`: a filter that can never match there (for example a
//! text value compared against a numeric column) matches nothing here too.
//! Text columns sort under the `"C"` collation, which is the byte order
//! [`ScalarValue::compare`] uses.

use diesel::dsl::sql;
use diesel::expression::SqlLiteral;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::{Bool, Text};

use super::schema::products;
use crate::db::specification::{Criterion, OrderBy, SortDirection, Specification};
use crate::models::{Product, ProductField, ScalarValue};

pub type ProductPredicate = Box<dyn BoxableExpression<products::table, Pg, SqlType = Bool>>;

pub type BoxedProducts<'a> = products::BoxedQuery<'a, Pg>;

/// SQL predicate for `criterion`. `None` means "no restriction".
pub fn predicate(criterion: &Criterion<ProductField>) -> Option<ProductPredicate> {
    match criterion {
        Criterion::Eq(field, value) => Some(in_predicate(*field, std::slice::from_ref(value))),
        Criterion::In(field, values) => Some(in_predicate(*field, values)),
        Criterion::Contains(field, needle) => Some(contains_predicate(*field, needle)),
        Criterion::All(parts) => parts
            .iter()
            .filter_map(predicate)
            .reduce(|acc, next| Box::new(acc.and(next))),
    }
}

fn match_nothing() -> ProductPredicate {
    Box::new(sql::<Bool>("FALSE"))
}

fn in_predicate(field: ProductField, values: &[ScalarValue]) -> ProductPredicate {
    match field {
        ProductField::Id => Box::new(products::id.eq_any(int_values(values))),
        ProductField::QuantityInStock => {
            Box::new(products::quantity_in_stock.eq_any(int_values(values)))
        }
        ProductField::Price => Box::new(products::price.eq_any(float_values(values))),
        ProductField::Name => Box::new(products::name.eq_any(text_values(values))),
        ProductField::Description => Box::new(products::description.eq_any(text_values(values))),
        ProductField::PictureUrl => Box::new(products::picture_url.eq_any(text_values(values))),
        ProductField::Type => Box::new(products::product_type.eq_any(text_values(values))),
        ProductField::Brand => Box::new(products::brand.eq_any(text_values(values))),
    }
}

fn contains_predicate(field: ProductField, needle: &str) -> ProductPredicate {
    let pattern = format!("%{}%", escape_like(needle));
    match field {
        ProductField::Name => Box::new(products::name.ilike(pattern)),
        ProductField::Description => Box::new(products::description.ilike(pattern)),
        ProductField::PictureUrl => Box::new(products::picture_url.ilike(pattern)),
        ProductField::Type => Box::new(products::product_type.ilike(pattern)),
        ProductField::Brand => Box::new(products::brand.ilike(pattern)),
        ProductField::Id | ProductField::Price | ProductField::QuantityInStock => match_nothing(),
    }
}

/// Integer candidates for an `INT4` column. Fractional or out-of-range
/// numbers can never be equal to a row value and are dropped.
fn int_values(values: &[ScalarValue]) -> Vec<i32> {
    values
        .iter()
        .filter_map(|value| match value {
            ScalarValue::Int(v) => i32::try_from(*v).ok(),
            ScalarValue::Float(v) if v.fract() == 0.0 => i32::try_from(*v as i64).ok(),
            _ => None,
        })
        .collect()
}

fn float_values(values: &[ScalarValue]) -> Vec<f64> {
    values.iter().filter_map(ScalarValue::as_f64).collect()
}

fn text_values(values: &[ScalarValue]) -> Vec<String> {
    values
        .iter()
        .filter_map(|value| value.as_text().map(str::to_string))
        .collect()
}

/// Escape `LIKE` metacharacters so user input matches literally.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

macro_rules! order_column {
    ($query:expr, $column:expr, $direction:expr) => {
        match $direction {
            SortDirection::Ascending => $query.order_by($column.asc()),
            SortDirection::Descending => $query.order_by($column.desc()),
        }
    };
}

/// `column COLLATE "C"` for a text column.
fn byte_ordered(field: ProductField) -> SqlLiteral<Text> {
    sql::<Text>(&format!(
        "\"products\".\"{}\" COLLATE \"C\"",
        field.column_name()
    ))
}

fn apply_order<'a>(
    query: BoxedProducts<'a>,
    order: Option<&OrderBy<ProductField>>,
) -> BoxedProducts<'a> {
    let Some(order) = order else {
        return query.order_by(products::id.asc());
    };
    let query = match order.field {
        ProductField::Id => order_column!(query, products::id, order.direction),
        ProductField::Name
        | ProductField::Description
        | ProductField::PictureUrl
        | ProductField::Type
        | ProductField::Brand => order_column!(query, byte_ordered(order.field), order.direction),
        ProductField::Price => order_column!(query, products::price, order.direction),
        ProductField::QuantityInStock => {
            order_column!(query, products::quantity_in_stock, order.direction)
        }
    };
    // Ties fall back to id order, like the in-memory stable sort.
    query.then_order_by(products::id.asc())
}

/// Full row query for `spec`: filter, order, then paging.
pub fn rows_query(spec: &Specification<Product>) -> BoxedProducts<'static> {
    let mut query = products::table.into_boxed();
    if let Some(filter) = spec.criteria().and_then(predicate) {
        query = query.filter(filter);
    }
    let mut query = apply_order(query, spec.ordering());
    if let Some(paging) = spec.paging() {
        // A window starting past i64::MAX is empty anyway.
        query = query
            .offset(i64::try_from(paging.skip).unwrap_or(i64::MAX))
            .limit(i64::try_from(paging.take).unwrap_or(i64::MAX));
    }
    query
}

/// Whether a projection can be answered with `SELECT DISTINCT column ...
/// ORDER BY column` and still return the same values as the in-memory
/// evaluator.
pub fn distinct_in_sql(spec: &Specification<Product>) -> bool {
    match (spec.selector(), spec.ordering()) {
        (Some(field), Some(order)) => order.field == field && spec.paging().is_none(),
        _ => false,
    }
}

macro_rules! distinct_column {
    ($conn:expr, $spec:expr, $column:expr, $direction:expr, $ty:ty) => {{
        let mut query = products::table.select($column).distinct().into_boxed();
        if let Some(filter) = $spec.criteria().and_then(predicate) {
            query = query.filter(filter);
        }
        let query = order_column!(query, $column, $direction);
        query
            .load::<$ty>($conn)?
            .into_iter()
            .map(ScalarValue::from)
            .collect::<Vec<ScalarValue>>()
    }};
}

/// Run a projection that [`distinct_in_sql`] accepted.
///
/// `SELECT DISTINCT` only allows ordering by the selected column itself, so
/// the database collation decides the order; the values are re-sorted here to
/// match the in-memory evaluator.
pub fn load_distinct(
    conn: &mut PgConnection,
    spec: &Specification<Product>,
    field: ProductField,
    direction: SortDirection,
) -> QueryResult<Vec<ScalarValue>> {
    let mut values = match field {
        ProductField::Id => distinct_column!(conn, spec, products::id, direction, i32),
        ProductField::Name => distinct_column!(conn, spec, products::name, direction, String),
        ProductField::Description => {
            distinct_column!(conn, spec, products::description, direction, String)
        }
        ProductField::PictureUrl => {
            distinct_column!(conn, spec, products::picture_url, direction, String)
        }
        ProductField::Type => {
            distinct_column!(conn, spec, products::product_type, direction, String)
        }
        ProductField::Brand => distinct_column!(conn, spec, products::brand, direction, String),
        ProductField::Price => distinct_column!(conn, spec, products::price, direction, f64),
        ProductField::QuantityInStock => {
            distinct_column!(conn, spec, products::quantity_in_stock, direction, i32)
        }
    };
    values.sort_by(|a, b| match direction {
        SortDirection::Ascending => a.compare(b),
        SortDirection::Descending => b.compare(a),
    });
    Ok(values)
}
