//! Catalog entities and their validated input payloads.

use chrono::{DateTime, Utc};
use common::{CategoryId, Money, ProductId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A product grouping visible in the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Creates a category with a fresh id.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: CategoryId::new(),
            name: name.into(),
            description: description.into(),
            created_at: Utc::now(),
        }
    }
}

/// Validated input for creating a category.
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub description: String,
}

impl NewCategory {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let (name, description) = validate_display_fields(name, description)?;
        Ok(Self { name, description })
    }
}

/// Validated input for replacing a category's display fields.
#[derive(Debug, Clone)]
pub struct CategoryUpdate {
    pub name: String,
    pub description: String,
}

impl CategoryUpdate {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let (name, description) = validate_display_fields(name, description)?;
        Ok(Self { name, description })
    }
}

/// A purchasable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub category_id: CategoryId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Creates a product with a fresh id.
    pub fn new(
        category_id: CategoryId,
        name: impl Into<String>,
        description: impl Into<String>,
        price: Money,
    ) -> Self {
        Self {
            id: ProductId::new(),
            category_id,
            name: name.into(),
            description: description.into(),
            price,
            created_at: Utc::now(),
        }
    }
}

/// Validated input for creating a product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub category_id: CategoryId,
    pub name: String,
    pub description: String,
    pub price: Money,
}

impl NewProduct {
    pub fn new(
        category_id: CategoryId,
        name: impl Into<String>,
        description: impl Into<String>,
        price: Money,
    ) -> Result<Self, DomainError> {
        let (name, description) = validate_display_fields(name, description)?;
        validate_price(price)?;
        Ok(Self {
            category_id,
            name,
            description,
            price,
        })
    }
}

/// Validated input for updating a product.
///
/// The owning category is fixed at creation time and cannot be changed.
#[derive(Debug, Clone)]
pub struct ProductUpdate {
    pub name: String,
    pub description: String,
    pub price: Money,
}

impl ProductUpdate {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        price: Money,
    ) -> Result<Self, DomainError> {
        let (name, description) = validate_display_fields(name, description)?;
        validate_price(price)?;
        Ok(Self {
            name,
            description,
            price,
        })
    }
}

fn validate_display_fields(
    name: impl Into<String>,
    description: impl Into<String>,
) -> Result<(String, String), DomainError> {
    let name = name.into().trim().to_string();
    let description = description.into().trim().to_string();
    if name.is_empty() {
        return Err(DomainError::EmptyName);
    }
    Ok((name, description))
}

fn validate_price(price: Money) -> Result<(), DomainError> {
    if price.cents() < 0 {
        return Err(DomainError::NegativePrice);
    }
    Ok(())
}
