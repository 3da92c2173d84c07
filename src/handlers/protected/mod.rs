// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// Every route here sits behind jwt_auth_middleware, so handlers can rely on
// an AuthUser extension being present.

pub mod property;

pub use property::{
    create, delete, find_bookmarked_properties, find_my_properties, toggle_bookmark, update,
};
