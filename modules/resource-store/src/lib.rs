//! Multi-tenant resource store: dynamic per-app resource types with JSON
//! Schema validation, a restricted OData query surface, layered role
//! authorization, asset attachment and post-commit notification hooks.
//!
//! The domain layer is storage-agnostic; [`infra::storage`] provides the
//! `SeaORM` implementation of its ports.

pub mod config;
pub mod domain;
pub mod infra;

pub use config::ResourceStoreConfig;
pub use domain::definition::{ActionKind, AppDefinition};
pub use domain::error::{ErrorBody, ResourceError};
pub use domain::model::{AssetUpload, QueryParams, Resource};
pub use domain::notify::{Notification, NotificationDispatcher, PushDelivery};
pub use domain::registry::ResourceTypeRegistry;
pub use domain::service::ResourceService;
pub use infra::storage::SeaOrmStorage;
pub use infra::storage::migrations::Migrator;
