use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::database::manager::DatabaseError;
use crate::database::models::{Property, PropertyId, PublicUser, UserId};
use crate::filter::PropertyFilter;

/// Storage for property documents.
///
/// Updates touch only the fields they name and run as a single atomic write,
/// so concurrent writers to different fields of one document both land.
/// Writers to the same field are last-write-wins. Every write keeps the owner
/// out of the bookmark set.
#[async_trait]
pub trait PropertyRepository: Send + Sync {
    async fn find(&self, filter: &PropertyFilter) -> Result<Vec<Property>, DatabaseError>;

    async fn count(&self, filter: &PropertyFilter) -> Result<i64, DatabaseError>;

    async fn find_by_id(&self, id: &PropertyId) -> Result<Option<Property>, DatabaseError>;

    async fn insert(&self, property: &Property) -> Result<(), DatabaseError>;

    /// Overlay `changes` onto the top-level fields of a document owned by
    /// `owner`. `None` if there is no such document or someone else owns it.
    async fn update_fields(
        &self,
        id: &PropertyId,
        owner: &UserId,
        changes: &Map<String, Value>,
    ) -> Result<Option<Property>, DatabaseError>;

    /// Add `user` to the bookmark set, or remove it if already there.
    /// `None` if there is no such document or `user` owns it.
    async fn toggle_bookmark(
        &self,
        id: &PropertyId,
        user: &UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<Property>, DatabaseError>;

    /// Returns `false` if nothing owned by `owner` was deleted.
    async fn delete(&self, id: &PropertyId, owner: &UserId) -> Result<bool, DatabaseError>;

    async fn health_check(&self) -> Result<(), DatabaseError>;
}

/// Read access to user records, used to embed owners into responses.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Public data for every id that exists. Order is unspecified.
    async fn find_public(&self, ids: &[UserId]) -> Result<Vec<PublicUser>, DatabaseError>;
}
