//! Cheque categories: classification plus default accounts.

use crate::error::{ChequeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryId(pub u32);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Maps a cheque classification to the accounts its postings hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub parent: Option<CategoryId>,
    pub debit_account: String,
    pub credit_account: String,
    pub journal: String,
    pub active: bool,
}

impl Category {
    pub fn new(
        id: CategoryId,
        name: impl Into<String>,
        debit_account: impl Into<String>,
        credit_account: impl Into<String>,
        journal: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
            debit_account: debit_account.into(),
            credit_account: credit_account.into(),
            journal: journal.into(),
            active: true,
        }
    }

    pub fn with_parent(mut self, parent: CategoryId) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Category hierarchy. Rejects unknown parents and cycles on insert.
#[derive(Clone, Debug, Default)]
pub struct CategoryTree {
    categories: BTreeMap<CategoryId, Category>,
}

impl CategoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: Category) -> Result<()> {
        if category.name.trim().is_empty() {
            return Err(ChequeError::validation("category name is required"));
        }
        if category.debit_account.is_empty() || category.credit_account.is_empty() {
            return Err(ChequeError::validation(format!(
                "category '{}' needs both a debit and a credit account",
                category.name
            )));
        }
        if let Some(parent) = category.parent {
            if !self.categories.contains_key(&parent) {
                return Err(ChequeError::not_found("category", parent));
            }
            if self.ancestors(parent).any(|id| id == category.id) {
                return Err(ChequeError::validation(format!(
                    "category '{}' would create a recursive hierarchy",
                    category.name
                )));
            }
        }
        self.categories.insert(category.id, category);
        Ok(())
    }

    pub fn get(&self, id: CategoryId) -> Result<&Category> {
        self.categories
            .get(&id)
            .ok_or_else(|| ChequeError::not_found("category", id))
    }

    /// `"Parent / Child"` display path.
    pub fn complete_name(&self, id: CategoryId) -> Result<String> {
        let leaf = self.get(id)?;
        let mut names = vec![leaf.name.as_str()];
        for ancestor in self.ancestors(id).skip(1) {
            if let Some(category) = self.categories.get(&ancestor) {
                names.push(category.name.as_str());
            }
        }
        names.reverse();
        Ok(names.join(" / "))
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    // Walks from `start` up through its parents, bounded by the tree size.
    fn ancestors(&self, start: CategoryId) -> impl Iterator<Item = CategoryId> + '_ {
        let mut current = Some(start);
        let mut remaining = self.categories.len() + 1;
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            let id = current?;
            current = self.categories.get(&id).and_then(|c| c.parent);
            Some(id)
        })
    }
}
