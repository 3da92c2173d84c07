use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{
    PopulatedProperty, Property, PropertyId, PropertyType, TypeCounts, UserId, ValidationError,
};
use crate::error::ApiError;
use crate::filter::{FilterError, PropertyFilter};

#[derive(Debug, Error)]
pub enum PropertyError {
    #[error("Property not found")]
    NotFound,

    #[error("You are not allowed to update other people's properties")]
    UpdateNotOwner,

    #[error("You are not allowed to delete other people's properties")]
    DeleteNotOwner,

    #[error("You are not allowed to bookmark your own property")]
    OwnBookmark,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<PropertyError> for ApiError {
    fn from(err: PropertyError) -> Self {
        match err {
            PropertyError::NotFound => ApiError::not_found(err.to_string()),
            PropertyError::UpdateNotOwner | PropertyError::DeleteNotOwner | PropertyError::OwnBookmark => {
                ApiError::forbidden(err.to_string())
            }
            PropertyError::Validation(e) => e.into(),
            PropertyError::Filter(e) => e.into(),
            PropertyError::Database(e) => e.into(),
        }
    }
}

/// Property operations over the configured repositories.
#[derive(Clone)]
pub struct PropertyService {
    db: DatabaseManager,
}

impl PropertyService {
    pub fn new(db: DatabaseManager) -> Self {
        Self { db }
    }

    pub async fn list_all(&self) -> Result<Vec<PopulatedProperty>, PropertyError> {
        self.find_populated(&PropertyFilter::all()).await
    }

    pub async fn list_featured(&self) -> Result<Vec<PopulatedProperty>, PropertyError> {
        self.find_populated(&PropertyFilter::featured()).await
    }

    /// Field-level search. An empty filter lists everything.
    pub async fn find(&self, filter: &PropertyFilter) -> Result<Vec<PopulatedProperty>, PropertyError> {
        self.find_populated(filter).await
    }

    pub async fn type_counts(&self) -> Result<TypeCounts, PropertyError> {
        let mut counts = TypeCounts::default();
        for kind in PropertyType::ALL {
            let count = self.db.properties.count(&PropertyFilter::of_type(kind)).await?;
            counts.set(kind, count);
        }
        Ok(counts)
    }

    pub async fn list_owned(&self, user: &UserId) -> Result<Vec<Property>, PropertyError> {
        Ok(self.db.properties.find(&PropertyFilter::owned_by(user)).await?)
    }

    pub async fn list_bookmarked(&self, user: &UserId) -> Result<Vec<Property>, PropertyError> {
        Ok(self.db.properties.find(&PropertyFilter::bookmarked_by(user)).await?)
    }

    pub async fn get(&self, id: &str) -> Result<PopulatedProperty, PropertyError> {
        let property = self.load(id).await?;
        let mut populated = self.populate(vec![property]).await?;
        populated.pop().ok_or(PropertyError::NotFound)
    }

    pub async fn create(&self, user: UserId, body: Value) -> Result<Property, PropertyError> {
        let property = Property::from_draft(body, user)?;
        self.db.properties.insert(&property).await?;
        info!("Property {} created by {}", property.id, user);
        Ok(property)
    }

    pub async fn update(&self, user: &UserId, id: &str, body: Value) -> Result<Property, PropertyError> {
        let property = self.load(id).await?;
        if !property.is_owned_by(user) {
            return Err(PropertyError::UpdateNotOwner);
        }

        let changes = property.patch_changes(body)?;
        match self.db.properties.update_fields(&property.id, user, &changes).await? {
            Some(updated) => {
                info!("Property {} updated by {}", updated.id, user);
                Ok(updated)
            }
            None => Err(self.refusal(&property.id, PropertyError::UpdateNotOwner).await?),
        }
    }

    pub async fn toggle_bookmark(&self, user: UserId, id: &str) -> Result<Property, PropertyError> {
        let property = self.load(id).await?;
        if property.is_owned_by(&user) {
            return Err(PropertyError::OwnBookmark);
        }

        match self.db.properties.toggle_bookmark(&property.id, &user, Utc::now()).await? {
            Some(updated) => {
                debug!(
                    "Property {} bookmarked={} for {}",
                    updated.id,
                    updated.bookmarked_users.contains(&user),
                    user
                );
                Ok(updated)
            }
            None => Err(self.refusal(&property.id, PropertyError::OwnBookmark).await?),
        }
    }

    pub async fn delete(&self, user: &UserId, id: &str) -> Result<(), PropertyError> {
        let property = self.load(id).await?;
        if !property.is_owned_by(user) {
            return Err(PropertyError::DeleteNotOwner);
        }

        if !self.db.properties.delete(&property.id, user).await? {
            return Err(self.refusal(&property.id, PropertyError::DeleteNotOwner).await?);
        }
        info!("Property {} deleted by {}", property.id, user);
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        self.db.properties.health_check().await
    }

    /// Fetch by raw path id. An id that is not a UUID cannot exist.
    async fn load(&self, id: &str) -> Result<Property, PropertyError> {
        let id: PropertyId = id.parse().map_err(|_| PropertyError::NotFound)?;
        self.db
            .properties
            .find_by_id(&id)
            .await?
            .ok_or(PropertyError::NotFound)
    }

    /// Why a guarded write matched nothing: the document is gone, or its
    /// ownership changed since it was loaded.
    async fn refusal(&self, id: &PropertyId, denied: PropertyError) -> Result<PropertyError, PropertyError> {
        Ok(match self.db.properties.find_by_id(id).await? {
            Some(_) => denied,
            None => PropertyError::NotFound,
        })
    }

    async fn find_populated(&self, filter: &PropertyFilter) -> Result<Vec<PopulatedProperty>, PropertyError> {
        let properties = self.db.properties.find(filter).await?;
        self.populate(properties).await
    }

    /// Replace each owner id with the owner's public data.
    async fn populate(&self, properties: Vec<Property>) -> Result<Vec<PopulatedProperty>, PropertyError> {
        let mut owner_ids: Vec<UserId> = properties.iter().map(|p| p.current_owner).collect();
        owner_ids.sort();
        owner_ids.dedup();

        let owners: HashMap<UserId, _> = self
            .db
            .users
            .find_public(&owner_ids)
            .await?
            .into_iter()
            .map(|user| (user.id, user))
            .collect();

        Ok(properties
            .into_iter()
            .map(|property| {
                let owner = owners.get(&property.current_owner).cloned();
                property.populate(owner)
            })
            .collect())
    }
}
