use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::database::manager::DatabaseError;
use crate::database::models::{Property, PropertyId, PublicUser, User, UserId};
use crate::database::repository::{PropertyRepository, UserRepository};
use crate::filter::PropertyFilter;

/// Process-local store. Documents keep insertion order, like the Postgres
/// store's `created_at` ordering.
#[derive(Default)]
pub struct MemoryStore {
    properties: RwLock<Vec<Property>>,
    users: RwLock<HashMap<UserId, User>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user record.
    pub async fn insert_user(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }

    fn select<'a>(
        properties: &'a [Property],
        filter: &PropertyFilter,
    ) -> Result<Vec<&'a Property>, DatabaseError> {
        if filter.is_empty() {
            return Ok(properties.iter().collect());
        }
        let mut selected = Vec::new();
        for property in properties {
            let document = serde_json::to_value(property)?;
            if filter.matches(&document) {
                selected.push(property);
            }
        }
        Ok(selected)
    }
}

#[async_trait]
impl PropertyRepository for MemoryStore {
    async fn find(&self, filter: &PropertyFilter) -> Result<Vec<Property>, DatabaseError> {
        let properties = self.properties.read().await;
        Ok(Self::select(&properties, filter)?.into_iter().cloned().collect())
    }

    async fn count(&self, filter: &PropertyFilter) -> Result<i64, DatabaseError> {
        let properties = self.properties.read().await;
        Ok(Self::select(&properties, filter)?.len() as i64)
    }

    async fn find_by_id(&self, id: &PropertyId) -> Result<Option<Property>, DatabaseError> {
        let properties = self.properties.read().await;
        Ok(properties.iter().find(|p| p.id == *id).cloned())
    }

    async fn insert(&self, property: &Property) -> Result<(), DatabaseError> {
        self.properties.write().await.push(property.clone());
        Ok(())
    }

    async fn update_fields(
        &self,
        id: &PropertyId,
        owner: &UserId,
        changes: &Map<String, Value>,
    ) -> Result<Option<Property>, DatabaseError> {
        let mut properties = self.properties.write().await;
        let Some(stored) = properties.iter_mut().find(|p| p.id == *id && p.is_owned_by(owner)) else {
            return Ok(None);
        };
        *stored = stored.merge_fields(changes)?;
        Ok(Some(stored.clone()))
    }

    async fn toggle_bookmark(
        &self,
        id: &PropertyId,
        user: &UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<Property>, DatabaseError> {
        let mut properties = self.properties.write().await;
        let Some(stored) = properties.iter_mut().find(|p| p.id == *id && !p.is_owned_by(user)) else {
            return Ok(None);
        };
        stored.toggle_bookmark(*user);
        stored.updated_at = at;
        Ok(Some(stored.clone()))
    }

    async fn delete(&self, id: &PropertyId, owner: &UserId) -> Result<bool, DatabaseError> {
        let mut properties = self.properties.write().await;
        let before = properties.len();
        properties.retain(|p| !(p.id == *id && p.is_owned_by(owner)));
        Ok(properties.len() != before)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_public(&self, ids: &[UserId]) -> Result<Vec<PublicUser>, DatabaseError> {
        let users = self.users.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| users.get(id))
            .cloned()
            .map(PublicUser::from)
            .collect())
    }
}
