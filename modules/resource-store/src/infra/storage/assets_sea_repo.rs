use async_trait::async_trait;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set};
use uuid::Uuid;

use crate::domain::error::ResourceError;
use crate::domain::model::NewAsset;
use crate::domain::repos::AssetsRepository;

use super::SeaOrmStorage;
use super::entity::asset;

#[async_trait]
impl AssetsRepository for SeaOrmStorage {
    async fn ids_for_resource<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        resource_id: i64,
    ) -> Result<Vec<Uuid>, ResourceError> {
        let ids = asset::Entity::find()
            .select_only()
            .column(asset::Column::Id)
            .filter(asset::Column::AppId.eq(app_id))
            .filter(asset::Column::ResourceId.eq(resource_id))
            .into_tuple::<Uuid>()
            .all(conn)
            .await?;
        Ok(ids)
    }

    async fn insert_many<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        resource_id: i64,
        assets: Vec<NewAsset>,
    ) -> Result<(), ResourceError> {
        if assets.is_empty() {
            return Ok(());
        }
        let models = assets.into_iter().map(|a| asset::ActiveModel {
            id: Set(a.id),
            app_id: Set(app_id),
            resource_id: Set(Some(resource_id)),
            mime: Set(a.mime),
            filename: Set(a.filename),
            data: Set(a.data),
        });
        asset::Entity::insert_many(models).exec(conn).await?;
        Ok(())
    }

    async fn delete_by_ids<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        ids: &[Uuid],
    ) -> Result<(), ResourceError> {
        if ids.is_empty() {
            return Ok(());
        }
        asset::Entity::delete_many()
            .filter(asset::Column::AppId.eq(app_id))
            .filter(asset::Column::Id.is_in(ids.iter().copied()))
            .exec(conn)
            .await?;
        Ok(())
    }

    async fn delete_for_resource<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        resource_id: i64,
    ) -> Result<(), ResourceError> {
        asset::Entity::delete_many()
            .filter(asset::Column::AppId.eq(app_id))
            .filter(asset::Column::ResourceId.eq(resource_id))
            .exec(conn)
            .await?;
        Ok(())
    }
}
