pub mod error;
pub mod property_filter;

pub use error::FilterError;
pub use property_filter::{Condition, PropertyFilter};
