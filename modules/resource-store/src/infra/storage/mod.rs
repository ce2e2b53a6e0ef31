pub mod entity;
pub mod migrations;
pub mod translate;

mod assets_sea_repo;
mod resources_sea_repo;
mod subscriptions_sea_repo;
mod teams_sea_repo;

/// `SeaORM`-backed implementation of every storage port.
///
/// Stateless; all state lives in the connection handed to each call.
#[derive(Clone, Debug, Default)]
pub struct SeaOrmStorage;

impl SeaOrmStorage {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}
