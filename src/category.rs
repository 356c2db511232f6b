//! PII categories
//!
//! A category is one kind of personal data the masking service can redact.
//! The session keeps them in an ordered, append-only registry keyed by a
//! normalized id, so user-added categories sit alongside the defaults.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

/// A selectable PII category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Normalized slug sent to the masking service
    pub id: String,
    /// Display name
    pub label: String,
    /// Whether this category is included in the next mask request
    pub active: bool,
    /// Whether the user added this category during the session
    pub custom: bool,
}

impl Category {
    fn builtin(id: &str, label: &str) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            active: true,
            custom: false,
        }
    }
}

/// Reasons a custom category is not added
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CategoryRejected {
    #[error("category name is empty")]
    Empty,
    #[error("category '{0}' already exists")]
    Duplicate(String),
}

/// Derive a category id from a user-typed label: trim, NFC, lowercase.
pub fn normalize_category_id(raw_label: &str) -> String {
    raw_label.trim().nfc().collect::<String>().to_lowercase()
}

/// Ordered collection of categories with unique ids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRegistry {
    categories: Vec<Category>,
}

impl CategoryRegistry {
    /// Registry holding the built-in categories, all active
    pub fn with_defaults() -> Self {
        Self {
            categories: vec![
                Category::builtin("name", "Name"),
                Category::builtin("phone", "Phone"),
                Category::builtin("email", "Email"),
                Category::builtin("address", "Address"),
                Category::builtin("id_number", "ID Number"),
                Category::builtin("bank_card", "Bank Card"),
                Category::builtin("social_media", "Social Media"),
            ],
        }
    }

    /// Registry with no categories at all
    pub fn empty() -> Self {
        Self { categories: Vec::new() }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Flip `active` on the category with `id`. Returns the new state, or
    /// `None` when no such category exists.
    pub fn toggle(&mut self, id: &str) -> Option<bool> {
        let category = self.categories.iter_mut().find(|c| c.id == id)?;
        category.active = !category.active;
        Some(category.active)
    }

    /// Set `active` on the category with `id`. Returns false when absent.
    pub fn set_active(&mut self, id: &str, active: bool) -> bool {
        match self.categories.iter_mut().find(|c| c.id == id) {
            Some(category) => {
                category.active = active;
                true
            }
            None => false,
        }
    }

    /// Append a user-defined category, active, labelled with the trimmed
    /// input. Rejected when the label is blank or its id is already taken.
    pub fn add(&mut self, raw_label: &str) -> Result<&Category, CategoryRejected> {
        let label = raw_label.trim();
        if label.is_empty() {
            return Err(CategoryRejected::Empty);
        }

        let id = normalize_category_id(label);
        if self.contains(&id) {
            return Err(CategoryRejected::Duplicate(id));
        }

        self.categories.push(Category {
            id,
            label: label.to_string(),
            active: true,
            custom: true,
        });
        let idx = self.categories.len() - 1;
        Ok(&self.categories[idx])
    }

    /// Ids of the active categories, in insertion order
    pub fn active_ids(&self) -> Vec<String> {
        self.categories
            .iter()
            .filter(|c| c.active)
            .map(|c| c.id.clone())
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.categories.iter().filter(|c| c.active).count()
    }
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
