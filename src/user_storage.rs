use std::{collections::HashMap, sync::Mutex};

use serde::{Deserialize, Serialize};

use crate::StorageError;

/// Decision persisted for a `(user, campaign)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStorageData {
    pub user_id: String,
    pub campaign_key: String,
    pub variation_name: String,
    /// Comma-joined identifiers of goals already tracked for this decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_identifiers: Option<String>,
}

impl UserStorageData {
    pub fn new(
        user_id: impl Into<String>,
        campaign_key: impl Into<String>,
        variation_name: impl Into<String>,
    ) -> Self {
        UserStorageData {
            user_id: user_id.into(),
            campaign_key: campaign_key.into(),
            variation_name: variation_name.into(),
            goal_identifiers: None,
        }
    }

    pub fn has_goal(&self, goal_identifier: &str) -> bool {
        self.goal_identifiers
            .as_deref()
            .is_some_and(|goals| goals.split(',').any(|goal| goal == goal_identifier))
    }

    /// Append `goal_identifier`. Returns `false` if it was already recorded.
    pub fn add_goal(&mut self, goal_identifier: &str) -> bool {
        if self.has_goal(goal_identifier) {
            return false;
        }
        self.goal_identifiers = Some(match self.goal_identifiers.take() {
            Some(goals) if !goals.is_empty() => format!("{goals},{goal_identifier}"),
            _ => goal_identifier.to_owned(),
        });
        true
    }
}

/// Host-provided persistence for sticky decisions.
///
/// Errors are never fatal: a failed `get` is treated as "nothing stored" and a failed `set` only
/// loses stickiness for the next call.
pub trait UserStorage {
    fn get(
        &self,
        user_id: &str,
        campaign_key: &str,
    ) -> Result<Option<UserStorageData>, StorageError>;

    fn set(&self, data: &UserStorageData) -> Result<(), StorageError>;
}

/// In-process [`UserStorage`] keyed by `(user_id, campaign_key)`.
#[derive(Default)]
pub struct InMemoryUserStorage {
    data: Mutex<HashMap<(String, String), UserStorageData>>,
}

impl InMemoryUserStorage {
    pub fn new() -> Self {
        InMemoryUserStorage::default()
    }
}

impl UserStorage for InMemoryUserStorage {
    fn get(
        &self,
        user_id: &str,
        campaign_key: &str,
    ) -> Result<Option<UserStorageData>, StorageError> {
        let data = self
            .data
            .lock()
            .map_err(|_| StorageError::new("user storage lock poisoned"))?;
        Ok(data
            .get(&(user_id.to_owned(), campaign_key.to_owned()))
            .cloned())
    }

    fn set(&self, value: &UserStorageData) -> Result<(), StorageError> {
        let mut data = self
            .data
            .lock()
            .map_err(|_| StorageError::new("user storage lock poisoned"))?;
        data.insert(
            (value.user_id.clone(), value.campaign_key.clone()),
            value.clone(),
        );
        Ok(())
    }
}

impl<T: UserStorage + ?Sized> UserStorage for std::sync::Arc<T> {
    fn get(
        &self,
        user_id: &str,
        campaign_key: &str,
    ) -> Result<Option<UserStorageData>, StorageError> {
        (**self).get(user_id, campaign_key)
    }

    fn set(&self, data: &UserStorageData) -> Result<(), StorageError> {
        (**self).set(data)
    }
}
