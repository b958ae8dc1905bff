//! Keyword seed file structures (categories, products, keywords).

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Priority, normalize_query};

/// Root seed data structure used to populate the keyword registry.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Seed {
    #[serde(default)]
    pub categories: Vec<SeedCategory>,
}

impl Seed {
    /// Load seed data from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate that seed data is importable.
    pub fn validate(&self) -> Result<()> {
        if self.keyword_count() == 0 {
            return Err(AppError::validation("No keywords defined in seed data"));
        }

        for category in &self.categories {
            if category.name.trim().is_empty() {
                return Err(AppError::validation("Category with empty name"));
            }
            for product in &category.products {
                if product.name.trim().is_empty() {
                    return Err(AppError::validation(format!(
                        "Product with empty name in category '{}'",
                        category.name
                    )));
                }

                let mut seen = HashSet::new();
                for keyword in &product.keywords {
                    if keyword.query.trim().is_empty() {
                        return Err(AppError::validation(format!(
                            "Empty keyword query in product '{}'",
                            product.name
                        )));
                    }
                    if !seen.insert(normalize_query(&keyword.query)) {
                        return Err(AppError::validation(format!(
                            "Duplicate keyword '{}' in product '{}'",
                            keyword.query, product.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn keyword_count(&self) -> usize {
        self.categories
            .iter()
            .flat_map(|c| &c.products)
            .map(|p| p.keywords.len())
            .sum()
    }
}

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedCategory {
    pub name: String,

    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

/// A product owning tracked keywords.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedProduct {
    pub name: String,

    #[serde(default)]
    pub keywords: Vec<SeedKeyword>,
}

/// A keyword entry in the seed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedKeyword {
    pub query: String,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub target_url: Option<String>,
}
