use async_trait::async_trait;
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::domain::definition::SubscribePolicy;
use crate::domain::error::ResourceError;
use crate::domain::repos::SubscriptionsRepository;

use super::SeaOrmStorage;
use super::entity::subscription;

#[async_trait]
impl SubscriptionsRepository for SeaOrmStorage {
    async fn recipients<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        type_name: &str,
        action: &str,
        resource_id: i64,
        author_id: Option<Uuid>,
        policy: SubscribePolicy,
    ) -> Result<Vec<String>, ResourceError> {
        let narrowing = match policy {
            SubscribePolicy::All => {
                Condition::all().add(subscription::Column::ResourceId.is_null())
            }
            SubscribePolicy::Both => Condition::any()
                .add(subscription::Column::ResourceId.is_null())
                .add(subscription::Column::ResourceId.eq(resource_id)),
            SubscribePolicy::Author => {
                let Some(author) = author_id else {
                    return Ok(Vec::new());
                };
                Condition::all()
                    .add(subscription::Column::ResourceId.is_null())
                    .add(subscription::Column::UserId.eq(author))
            }
        };

        let endpoints: Vec<String> = subscription::Entity::find()
            .select_only()
            .column(subscription::Column::Endpoint)
            .filter(subscription::Column::AppId.eq(app_id))
            .filter(subscription::Column::ResourceType.eq(type_name))
            .filter(subscription::Column::Action.eq(action))
            .filter(narrowing)
            .into_tuple()
            .all(conn)
            .await?;

        // Distinct endpoints, stable order.
        let unique: BTreeSet<String> = endpoints.into_iter().collect();
        Ok(unique.into_iter().collect())
    }
}
