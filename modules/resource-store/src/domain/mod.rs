pub mod assets;
pub mod authorize;
pub mod definition;
pub mod error;
pub mod expiration;
pub mod model;
pub mod notify;
pub mod registry;
pub mod repos;
pub mod schema;
pub mod service;
