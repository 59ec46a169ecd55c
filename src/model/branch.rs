//! Branches and inter-branch transfer permissions.

use crate::error::{ChequeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub code: String,
    pub name: String,
    pub transit_account: String,
    pub default_journal: String,
    /// Recipient for transfer notifications.
    pub manager: Option<String>,
    pub parent: Option<String>,
    pub allowed_transfers: BTreeSet<String>,
}

impl Branch {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        transit_account: impl Into<String>,
        default_journal: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            transit_account: transit_account.into(),
            default_journal: default_journal.into(),
            manager: None,
            parent: None,
            allowed_transfers: BTreeSet::new(),
        }
    }

    pub fn with_manager(mut self, manager: impl Into<String>) -> Self {
        self.manager = Some(manager.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn allow_transfer_to(mut self, code: impl Into<String>) -> Self {
        self.allowed_transfers.insert(code.into());
        self
    }

    /// `[CODE] Name`
    pub fn display_name(&self) -> String {
        format!("[{}] {}", self.code, self.name)
    }
}

/// Where a cheque is in an inter-branch hand-over.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    #[default]
    None,
    Outgoing,
    Completed,
}

#[derive(Clone, Debug, Default)]
pub struct BranchDirectory {
    branches: BTreeMap<String, Branch>,
}

impl BranchDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a branch. Codes are unique; parents must exist and
    /// must not loop back to the branch.
    pub fn insert(&mut self, branch: Branch) -> Result<()> {
        if branch.code.trim().is_empty() {
            return Err(ChequeError::validation("branch code is required"));
        }
        if let Some(parent) = &branch.parent {
            if !self.branches.contains_key(parent) {
                return Err(ChequeError::not_found("branch", parent));
            }
            let mut cursor = Some(parent.clone());
            let mut hops = self.branches.len() + 1;
            while let Some(code) = cursor {
                if code == branch.code {
                    return Err(ChequeError::validation(format!(
                        "branch '{}' would create a recursive hierarchy",
                        branch.code
                    )));
                }
                hops -= 1;
                if hops == 0 {
                    break;
                }
                cursor = self.branches.get(&code).and_then(|b| b.parent.clone());
            }
        }
        self.branches.insert(branch.code.clone(), branch);
        Ok(())
    }

    pub fn get(&self, code: &str) -> Result<&Branch> {
        self.branches
            .get(code)
            .ok_or_else(|| ChequeError::not_found("branch", code))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.branches.contains_key(code)
    }

    pub fn can_transfer(&self, from: &str, to: &str) -> bool {
        self.branches
            .get(from)
            .is_some_and(|b| b.allowed_transfers.contains(to))
            && self.branches.contains_key(to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> BranchDirectory {
        let mut dir = BranchDirectory::new();
        dir.insert(Branch::new("TEH", "Tehran", "1900", "BNK").allow_transfer_to("ISF"))
            .unwrap();
        dir.insert(Branch::new("ISF", "Isfahan", "1901", "BNK").with_parent("TEH"))
            .unwrap();
        dir
    }

    #[test]
    fn transfer_permissions_are_directional() {
        let dir = directory();
        assert!(dir.can_transfer("TEH", "ISF"));
        assert!(!dir.can_transfer("ISF", "TEH"));
        assert!(!dir.can_transfer("TEH", "MSH"));
    }

    #[test]
    fn display_name_includes_code() {
        let dir = directory();
        assert_eq!(dir.get("ISF").unwrap().display_name(), "[ISF] Isfahan");
    }

    #[test]
    fn recursive_parent_is_rejected() {
        let mut dir = directory();
        let err = dir
            .insert(Branch::new("TEH", "Tehran", "1900", "BNK").with_parent("ISF"))
            .unwrap_err();
        assert!(matches!(err, ChequeError::Validation { .. }));
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let mut dir = BranchDirectory::new();
        assert!(dir
            .insert(Branch::new("MSH", "Mashhad", "1902", "BNK").with_parent("XXX"))
            .is_err());
    }
}
