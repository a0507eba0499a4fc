use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::inventory::Product;
use crate::store::StoreError;

// ============================================================================
// Product Query Builder - keyword, category, price range, pagination
// ============================================================================

pub const DEFAULT_PAGE_SIZE: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Invalid price range: minimum {min} is above maximum {max}")]
    InvalidPriceRange { min: Decimal, max: Decimal },

    #[error("Page numbers start at 1")]
    InvalidPage,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price_min: Option<Decimal>,
    #[serde(default)]
    pub price_max: Option<Decimal>,
    /// 1-based
    #[serde(default)]
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total_matches: usize,
    pub page: u32,
    pub per_page: usize,
}

impl ProductQuery {
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn price_between(mut self, min: Decimal, max: Decimal) -> Self {
        self.price_min = Some(min);
        self.price_max = Some(max);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if let (Some(min), Some(max)) = (self.price_min, self.price_max) {
            if min > max {
                return Err(CatalogError::InvalidPriceRange { min, max });
            }
        }
        if self.page == Some(0) {
            return Err(CatalogError::InvalidPage);
        }
        Ok(())
    }

    /// Case-insensitive substring match on name, exact category, inclusive price bounds
    pub fn matches(&self, product: &Product) -> bool {
        let keyword_ok = match self.keyword.as_deref().map(str::trim) {
            Some(keyword) if !keyword.is_empty() => {
                product.name.to_lowercase().contains(&keyword.to_lowercase())
            }
            _ => true,
        };
        let category_ok = self
            .category
            .as_deref()
            .map_or(true, |category| product.category.eq_ignore_ascii_case(category));
        let min_ok = self.price_min.map_or(true, |min| product.price >= min);
        let max_ok = self.price_max.map_or(true, |max| product.price <= max);

        keyword_ok && category_ok && min_ok && max_ok
    }

    /// Filter, order by name, and cut out the requested page
    pub fn run(&self, products: Vec<Product>, per_page: usize) -> Result<ProductPage, CatalogError> {
        self.validate()?;

        let per_page = per_page.max(1);
        let page = self.page.unwrap_or(1);

        let mut matching: Vec<Product> = products.into_iter().filter(|p| self.matches(p)).collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        let total_matches = matching.len();
        let skip = (page as usize - 1).saturating_mul(per_page);
        let products = matching.into_iter().skip(skip).take(per_page).collect();

        Ok(ProductPage { products, total_matches, page, per_page })
    }
}

/// Read side of the product catalog
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn all_products(&self) -> Result<Vec<Product>, StoreError>;

    async fn search(&self, query: &ProductQuery, per_page: usize) -> Result<ProductPage, CatalogError> {
        query.validate()?;
        let products = self.all_products().await?;
        query.run(products, per_page)
    }
}
