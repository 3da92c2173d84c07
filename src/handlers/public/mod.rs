// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Listing, search, category counts and detail reads. Owner data is embedded
// into every property these return.

pub mod health;
pub mod property;

pub use health::health;
pub use property::{find, find_by_id, find_featured, find_types, get_all};
