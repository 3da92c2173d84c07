pub mod ids;
pub mod property;
pub mod user;

pub use ids::{PropertyId, UserId};
pub use property::{Property, PropertyType, PopulatedProperty, TypeCounts, ValidationError};
pub use user::{PublicUser, User};
