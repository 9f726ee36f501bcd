//! Shared helpers for integration tests.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use skistore::models::Product;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Run `f` with environment variables temporarily changed.
///
/// Tests run in parallel and the environment is process-global, so calls are
/// serialized. Previous values come back when `f` returns or panics.
///
/// `Some(v)` sets a variable, `None` removes it.
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _restore = EnvRestore::apply(changes);
    f()
}

struct EnvRestore {
    previous: Vec<(String, Option<String>)>,
}

impl EnvRestore {
    fn apply(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(key, _)| *key).collect();
        let previous = keys
            .into_iter()
            .map(|key| (key.to_string(), std::env::var(key).ok()))
            .collect();

        for (key, value) in changes {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }

        Self { previous }
    }
}

impl Drop for EnvRestore {
    fn drop(&mut self) {
        for (key, value) in self.previous.drain(..) {
            match value {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}

/// A valid product that has never been stored.
pub fn product(name: &str, product_type: &str, brand: &str, price: f64) -> Product {
    Product::new(
        name,
        format!("{} description", name),
        format!("images/{}.png", name.to_lowercase().replace(' ', "-")),
        product_type,
        brand,
        price,
    )
}

/// Small mixed catalog; ids 1..=6 once seeded in order.
pub fn catalog() -> Vec<Product> {
    vec![
        product("Race Skis", "Skis", "Atomic", 650.0).with_stock(3),
        product("Park Skis", "Skis", "Salomon", 420.0).with_stock(5),
        product("Touring Boots", "Boots", "Atomic", 380.0).with_stock(2),
        product("Race Boots", "Boots", "Salomon", 510.0).with_stock(1),
        product("Carbon Poles", "Poles", "Leki", 90.0).with_stock(10),
        product("Junior Skis", "Skis", "Atomic", 199.0).with_stock(7),
    ]
}
