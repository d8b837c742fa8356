//! HTTP handlers of the JSON API
//!
//! Account routes live in [`crate::user_auth::handlers`].

pub mod health;
pub mod location;
pub mod places;

pub use health::{HealthResponse, health_check};
pub use location::{location, primary_language};
pub use places::{places_by_address, update};
