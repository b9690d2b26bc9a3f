//! Product Model (storefront slice)
//!
//! Catalog CRUD lives elsewhere; the order core only reads products and
//! adjusts the stock counter.

use serde::{Deserialize, Serialize};

/// Physical format of a publication
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ProductFormat {
    Print,
    Digital,
    Bundle,
}

impl ProductFormat {
    /// Print products are the only ones backed by the stock counter
    pub fn tracks_stock(&self) -> bool {
        matches!(self, ProductFormat::Print)
    }

    /// Digital and bundle products carry a downloadable file
    pub fn has_digital_component(&self) -> bool {
        matches!(self, ProductFormat::Digital | ProductFormat::Bundle)
    }
}

/// Product publication status
///
/// OutOfStock is derived from the stock counter (Print only) and flips back
/// to Published when stock rises above zero.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum ProductStatus {
    Published,
    OutOfStock,
    Unpublished,
}

/// Product entity (order-core slice)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub format: ProductFormat,
    pub status: ProductStatus,
    /// Price in currency unit
    pub price: f64,
    /// Discounted price in currency unit (takes effect when set)
    pub discount_price: Option<f64>,
    /// Stock counter (meaningful for Print only)
    pub stock_quantity: i64,
    /// Logical path of the downloadable file (Digital/Bundle)
    pub digital_file_path: Option<String>,
    /// Per-product download cap override
    pub max_downloads: Option<i64>,
    /// Per-product hard-expiry override in days
    pub download_expiry_days: Option<i64>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    /// Effective unit price at order time (discount price wins when set)
    pub fn effective_price(&self) -> f64 {
        self.discount_price.unwrap_or(self.price)
    }

    /// Whether the requested quantity can be ordered right now.
    ///
    /// Digital and bundle products are always available while published;
    /// print products additionally require sufficient stock.
    pub fn is_available(&self, quantity: i64) -> bool {
        if !self.is_active || self.status == ProductStatus::Unpublished {
            return false;
        }
        match self.format {
            ProductFormat::Print => self.stock_quantity >= quantity,
            ProductFormat::Digital | ProductFormat::Bundle => true,
        }
    }

    /// Whether a digital file is attached
    pub fn has_digital_file(&self) -> bool {
        self.format.has_digital_component()
            && self.digital_file_path.as_deref().is_some_and(|p| !p.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(format: ProductFormat, stock: i64) -> Product {
        Product {
            id: 1,
            name: "Field Guide".to_string(),
            format,
            status: ProductStatus::Published,
            price: 25.0,
            discount_price: None,
            stock_quantity: stock,
            digital_file_path: Some("books/field-guide.pdf".to_string()),
            max_downloads: None,
            download_expiry_days: None,
            is_active: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_print_availability_follows_stock() {
        let p = product(ProductFormat::Print, 2);
        assert!(p.is_available(2));
        assert!(!p.is_available(3));
    }

    #[test]
    fn test_digital_always_available() {
        let p = product(ProductFormat::Digital, 0);
        assert!(p.is_available(100));
    }

    #[test]
    fn test_unpublished_never_available() {
        let mut p = product(ProductFormat::Digital, 0);
        p.status = ProductStatus::Unpublished;
        assert!(!p.is_available(1));
    }

    #[test]
    fn test_effective_price_prefers_discount() {
        let mut p = product(ProductFormat::Print, 1);
        assert_eq!(p.effective_price(), 25.0);
        p.discount_price = Some(19.5);
        assert_eq!(p.effective_price(), 19.5);
    }

    #[test]
    fn test_has_digital_file() {
        let mut p = product(ProductFormat::Bundle, 1);
        assert!(p.has_digital_file());
        p.digital_file_path = None;
        assert!(!p.has_digital_file());
        let print = product(ProductFormat::Print, 1);
        assert!(!print.has_digital_file());
    }
}
