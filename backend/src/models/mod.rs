pub mod entity;
pub mod product;

pub use entity::*;
pub use product::*;
