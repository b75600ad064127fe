//! # In-Memory Label Store
//!
//! Account and label persistence backed by `DashMap`, with one mutex per
//! account. Every label mutation follows the same sequence:
//!
//! 1. Validate and normalize the input (rejections never commit).
//! 2. Enforce `(account, key, scope)` uniqueness.
//! 3. Commit the label change.
//! 4. Run the [`Recomputer`] while the account lock is still held, so two
//!    mutations on the same account never interleave their recomputations.
//!
//! Mutations on different accounts take different locks and proceed
//! independently.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use ident_core::{
    Account, AccountId, Label, LabelId, LabelKey, LabelScope, LabelValue, ValidationError,
};
use parking_lot::Mutex;
use thiserror::Error;

use crate::facts::FactProjection;
use crate::recompute::{AccountRecord, LabelMutation, RecomputeError, RecomputeOutcome, Recomputer};

/// Store operation failure.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No account with this identifier.
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    /// No label with this identifier on the account.
    #[error("label not found: {0}")]
    LabelNotFound(LabelId),

    /// Input failed label validation. Nothing was committed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The account already has a label with this key in this scope.
    /// Nothing was committed.
    #[error("key {key} has already been taken in scope {scope}")]
    Duplicate {
        /// Conflicting key.
        key: LabelKey,
        /// Conflicting scope.
        scope: LabelScope,
    },

    /// The label change committed but state/level recomputation failed.
    #[error("label committed for account {account} but recomputation failed: {source}")]
    Recompute {
        /// Affected account.
        account: AccountId,
        /// Underlying failure.
        #[source]
        source: RecomputeError,
    },
}

/// Result of a committed label mutation.
#[derive(Debug, Clone)]
pub struct LabelCommit {
    /// The label as committed (for destroys, as it was).
    pub label: Label,
    /// What the recomputation trigger did.
    pub outcome: RecomputeOutcome,
}

/// Fields to change on an existing label. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct LabelUpdate {
    /// New raw value.
    pub value: Option<String>,
    /// New scope.
    pub scope: Option<LabelScope>,
}

#[derive(Debug)]
struct AccountRow {
    account: Account,
    labels: Vec<Label>,
}

impl AccountRow {
    fn conflicts(&self, key: &LabelKey, scope: LabelScope, except: Option<LabelId>) -> bool {
        self.labels
            .iter()
            .any(|l| &l.key == key && l.scope == scope && Some(l.id) != except)
    }
}

impl AccountRecord for AccountRow {
    fn account_id(&self) -> AccountId {
        self.account.id
    }

    fn current_private_facts(&self) -> FactProjection {
        FactProjection::from_labels(&self.labels)
    }

    fn state(&self) -> &str {
        &self.account.state
    }

    fn level(&self) -> u32 {
        self.account.level
    }

    fn set_state(&mut self, state: &str) {
        self.account.state = state.to_string();
        self.account.updated_at = Utc::now();
    }

    fn set_level(&mut self, level: u32) {
        self.account.level = level;
        self.account.updated_at = Utc::now();
    }

    fn event_payload(&self) -> serde_json::Value {
        self.account.event_payload()
    }
}

/// In-memory accounts and labels, driving recomputation after each commit.
#[derive(Debug)]
pub struct LabelStore {
    accounts: DashMap<AccountId, Arc<Mutex<AccountRow>>>,
    recomputer: Recomputer,
}

impl LabelStore {
    /// Empty store using `recomputer` as its post-commit hook.
    pub fn new(recomputer: Recomputer) -> Self {
        Self {
            accounts: DashMap::new(),
            recomputer,
        }
    }

    fn row(&self, id: AccountId) -> Result<Arc<Mutex<AccountRow>>, StoreError> {
        self.accounts
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(StoreError::AccountNotFound(id))
    }

    fn commit(&self, row: &mut AccountRow, mutation: LabelMutation) -> Result<LabelCommit, StoreError> {
        let account = row.account.id;
        let outcome = self
            .recomputer
            .on_label_committed(row, &mutation)
            .map_err(|source| StoreError::Recompute { account, source })?;
        let label = match mutation {
            LabelMutation::Created(label) | LabelMutation::Destroyed(label) => label,
            LabelMutation::Updated { label, .. } => label,
        };
        Ok(LabelCommit { label, outcome })
    }

    /// Register an account.
    pub fn insert_account(&self, account: Account) -> Account {
        let row = AccountRow {
            account: account.clone(),
            labels: Vec::new(),
        };
        self.accounts.insert(account.id, Arc::new(Mutex::new(row)));
        tracing::debug!(account = %account.id, uid = %account.uid, "account created");
        account
    }

    /// Create and register a new `pending` account.
    pub fn create_account(&self, email: impl Into<String>) -> Account {
        self.insert_account(Account::new(email))
    }

    /// Snapshot of an account.
    pub fn account(&self, id: AccountId) -> Result<Account, StoreError> {
        Ok(self.row(id)?.lock().account.clone())
    }

    /// Remove an account and, with it, every label it owns.
    ///
    /// Returns the removed labels.
    pub fn destroy_account(&self, id: AccountId) -> Result<Vec<Label>, StoreError> {
        let (_, row) = self
            .accounts
            .remove(&id)
            .ok_or(StoreError::AccountNotFound(id))?;
        let labels = std::mem::take(&mut row.lock().labels);
        tracing::debug!(account = %id, labels = labels.len(), "account destroyed");
        Ok(labels)
    }

    /// Labels of an account, optionally restricted to one scope.
    pub fn labels(&self, id: AccountId, scope: Option<LabelScope>) -> Result<Vec<Label>, StoreError> {
        let row = self.row(id)?;
        let guard = row.lock();
        Ok(guard
            .labels
            .iter()
            .filter(|l| scope.map_or(true, |s| l.scope == s))
            .cloned()
            .collect())
    }

    /// Look up a label by key and scope.
    pub fn find_label(
        &self,
        id: AccountId,
        key: &str,
        scope: LabelScope,
    ) -> Result<Option<Label>, StoreError> {
        let key = LabelKey::new(key)?;
        let row = self.row(id)?;
        let guard = row.lock();
        Ok(guard
            .labels
            .iter()
            .find(|l| l.key == key && l.scope == scope)
            .cloned())
    }

    /// Private facts of an account as of now.
    pub fn private_facts(&self, id: AccountId) -> Result<FactProjection, StoreError> {
        Ok(self.row(id)?.lock().current_private_facts())
    }

    /// Create a label and run the post-commit trigger.
    pub fn create_label(
        &self,
        id: AccountId,
        key: &str,
        value: &str,
        scope: LabelScope,
    ) -> Result<LabelCommit, StoreError> {
        let row = self.row(id)?;
        let mut guard = row.lock();

        let label = Label::new(id, key, value, scope)?;
        if guard.conflicts(&label.key, scope, None) {
            return Err(StoreError::Duplicate {
                key: label.key,
                scope,
            });
        }
        guard.labels.push(label.clone());

        self.commit(&mut guard, LabelMutation::Created(label))
    }

    /// Change a label's value and/or scope and run the post-commit trigger.
    pub fn update_label(
        &self,
        id: AccountId,
        label_id: LabelId,
        update: LabelUpdate,
    ) -> Result<LabelCommit, StoreError> {
        let row = self.row(id)?;
        let mut guard = row.lock();

        let pos = guard
            .labels
            .iter()
            .position(|l| l.id == label_id)
            .ok_or(StoreError::LabelNotFound(label_id))?;

        let current = &guard.labels[pos];
        let previous_scope = current.scope;
        let value = match update.value {
            Some(raw) => LabelValue::new(raw)?,
            None => current.value.clone(),
        };
        let scope = update.scope.unwrap_or(previous_scope);
        let key = current.key.clone();
        if scope != previous_scope && guard.conflicts(&key, scope, Some(label_id)) {
            return Err(StoreError::Duplicate { key, scope });
        }

        let label = &mut guard.labels[pos];
        label.value = value;
        label.scope = scope;
        label.updated_at = Utc::now();
        let label = label.clone();

        self.commit(
            &mut guard,
            LabelMutation::Updated {
                label,
                previous_scope,
            },
        )
    }

    /// Destroy a label and run the post-commit trigger.
    pub fn destroy_label(&self, id: AccountId, label_id: LabelId) -> Result<LabelCommit, StoreError> {
        let row = self.row(id)?;
        let mut guard = row.lock();

        let pos = guard
            .labels
            .iter()
            .position(|l| l.id == label_id)
            .ok_or(StoreError::LabelNotFound(label_id))?;
        let label = guard.labels.remove(pos);

        self.commit(&mut guard, LabelMutation::Destroyed(label))
    }

    /// Re-run resolution for an account without a mutation, e.g. after the
    /// policy changed.
    pub fn reconcile(&self, id: AccountId) -> Result<RecomputeOutcome, StoreError> {
        let row = self.row(id)?;
        let mut guard = row.lock();
        self.recomputer
            .reconcile(&mut *guard)
            .map_err(|source| StoreError::Recompute { account: id, source })
    }
}
