//! Query parameters accepted by the product listing.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 6;
pub const MAX_PAGE_SIZE: usize = 50;

/// Listing order selected by the `sort` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    NameAsc,
    PriceAsc,
    PriceDesc,
}

impl ProductSort {
    /// Unknown or missing keys sort by name.
    pub fn from_key(key: Option<&str>) -> Self {
        match key.map(str::trim) {
            Some("priceAsc") => Self::PriceAsc,
            Some("priceDesc") => Self::PriceDesc,
            _ => Self::NameAsc,
        }
    }
}

/// Raw `GET /api/products` query string.
///
/// Fields are kept as received; the accessors apply defaults and clamping,
/// so an out-of-range number never turns into an error.
///
/// | key        | meaning                                    |
/// |------------|--------------------------------------------|
/// | `brands`   | comma-separated brand names                |
/// | `types`    | comma-separated type names                 |
/// | `sort`     | `priceAsc`, `priceDesc`, otherwise by name |
/// | `pageIndex`| 1-based page, default 1                    |
/// | `pageSize` | default 6, at most 50                      |
/// | `search`   | case-insensitive name substring            |
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductSpecParams {
    pub brands: Option<String>,
    pub types: Option<String>,
    pub sort: Option<String>,
    pub page_index: Option<i64>,
    pub page_size: Option<i64>,
    pub search: Option<String>,
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

impl ProductSpecParams {
    pub fn brands(&self) -> Vec<String> {
        split_list(self.brands.as_deref())
    }

    pub fn types(&self) -> Vec<String> {
        split_list(self.types.as_deref())
    }

    pub fn sort(&self) -> ProductSort {
        ProductSort::from_key(self.sort.as_deref())
    }

    /// 1-based page index; anything below 1 is page 1.
    pub fn page_index(&self) -> usize {
        self.page_index
            .map_or(1, |index| index.max(1))
            .try_into()
            .unwrap_or(usize::MAX)
    }

    /// Page size in `1..=MAX_PAGE_SIZE`.
    pub fn page_size(&self) -> usize {
        match self.page_size {
            None => DEFAULT_PAGE_SIZE,
            Some(size) => size.clamp(1, MAX_PAGE_SIZE as i64) as usize,
        }
    }

    /// Rows skipped before the current page.
    pub fn skip(&self) -> usize {
        self.page_size().saturating_mul(self.page_index() - 1)
    }

    /// Lower-cased search term, if a non-blank one was given.
    pub fn search(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase)
    }
}
