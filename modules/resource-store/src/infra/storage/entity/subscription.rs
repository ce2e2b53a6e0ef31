use sea_orm::entity::prelude::*;
use uuid::Uuid;

/// One subscription flag: "send `action` notifications for `resource_type`
/// (optionally narrowed to one resource) to `endpoint`". A row's existence
/// is the flag being on.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "resource_subscriptions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub app_id: Uuid,
    pub endpoint: String,
    pub user_id: Option<Uuid>,
    pub resource_type: String,
    pub action: String,
    pub resource_id: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
