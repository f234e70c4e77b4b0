//! HTTP API handlers for wardrobe-closet

pub mod health;
pub mod items;
pub mod suggestions;

pub use health::health_routes;
pub use items::item_routes;
pub use suggestions::suggestion_routes;
