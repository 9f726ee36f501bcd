//! Catalog queries built on the generic repository.
//!
//! - [`spec_params`]: listing query parameters with defaults and clamping
//! - [`specs`]: the named specifications behind each endpoint
//! - [`seed`]: optional start-up data

pub mod seed;
pub mod spec_params;
pub mod specs;

pub use spec_params::{ProductSort, ProductSpecParams, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use specs::{brand_spec, product_count_spec, product_spec, type_spec};
