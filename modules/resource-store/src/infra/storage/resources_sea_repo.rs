use async_trait::async_trait;
use resource_odata::ResourceQuery;
use resource_security::AccessScope;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, EntityTrait, NotSet, PaginatorTrait, QueryFilter,
    QuerySelect, Set,
};
use std::collections::BTreeSet;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::error::ResourceError;
use crate::domain::model::{NewResource, Resource, ResourceUpdate};
use crate::domain::repos::ResourcesRepository;

use super::SeaOrmStorage;
use super::entity::resource;
use super::translate::{
    apply_order, base_condition, expiration_condition, filter_condition, scope_condition,
    team_condition,
};

fn to_domain(model: resource::Model) -> Resource {
    Resource {
        id: model.id,
        app_id: model.app_id,
        resource_type: model.resource_type,
        data: model.data,
        author_id: model.author_id,
        author_name: model.author_name,
        clonable: model.clonable,
        created_at: model.created_at,
        updated_at: model.updated_at,
        expires_at: model.expires_at,
    }
}

fn read_condition(
    app_id: Uuid,
    type_name: &str,
    scope: &AccessScope,
    query: &ResourceQuery,
    team_authors: Option<&BTreeSet<Uuid>>,
    now: OffsetDateTime,
) -> sea_orm::Condition {
    let mut cond = base_condition(app_id, type_name)
        .add(expiration_condition(now))
        .add(scope_condition(scope));
    if let Some(filter) = &query.filter {
        cond = cond.add(filter_condition(filter));
    }
    if let Some(authors) = team_authors {
        cond = cond.add(team_condition(authors));
    }
    cond
}

#[async_trait]
impl ResourcesRepository for SeaOrmStorage {
    async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        type_name: &str,
        id: i64,
        now: OffsetDateTime,
    ) -> Result<Option<Resource>, ResourceError> {
        let found = resource::Entity::find()
            .filter(
                base_condition(app_id, type_name)
                    .add(Expr::col(resource::Column::Id).eq(id))
                    .add(expiration_condition(now)),
            )
            .one(conn)
            .await?;
        Ok(found.map(to_domain))
    }

    async fn search<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        type_name: &str,
        scope: &AccessScope,
        query: &ResourceQuery,
        team_authors: Option<&BTreeSet<Uuid>>,
        now: OffsetDateTime,
    ) -> Result<Vec<Resource>, ResourceError> {
        let mut select = resource::Entity::find()
            .filter(read_condition(app_id, type_name, scope, query, team_authors, now));
        select = apply_order(select, &query.order);
        if let Some(top) = query.top {
            select = select.limit(top);
        }
        let rows = select.all(conn).await?;
        Ok(rows.into_iter().map(to_domain).collect())
    }

    async fn count<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        type_name: &str,
        scope: &AccessScope,
        query: &ResourceQuery,
        team_authors: Option<&BTreeSet<Uuid>>,
        now: OffsetDateTime,
    ) -> Result<u64, ResourceError> {
        let count = resource::Entity::find()
            .filter(read_condition(app_id, type_name, scope, query, team_authors, now))
            .count(conn)
            .await?;
        Ok(count)
    }

    async fn insert<C: ConnectionTrait>(
        &self,
        conn: &C,
        resource: NewResource,
    ) -> Result<Resource, ResourceError> {
        let model = resource::ActiveModel {
            id: NotSet,
            app_id: Set(resource.app_id),
            resource_type: Set(resource.resource_type),
            data: Set(resource.data),
            author_id: Set(resource.author_id),
            author_name: Set(resource.author_name),
            clonable: Set(resource.clonable),
            created_at: Set(resource.created_at),
            updated_at: Set(resource.updated_at),
            expires_at: Set(resource.expires_at),
        };
        let inserted = model.insert(conn).await?;
        Ok(to_domain(inserted))
    }

    async fn update<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        type_name: &str,
        id: i64,
        update: ResourceUpdate,
    ) -> Result<(), ResourceError> {
        resource::Entity::update_many()
            .col_expr(resource::Column::Data, Expr::value(update.data))
            .col_expr(resource::Column::Clonable, Expr::value(update.clonable))
            .col_expr(resource::Column::UpdatedAt, Expr::value(update.updated_at))
            .col_expr(resource::Column::ExpiresAt, Expr::value(update.expires_at))
            .filter(
                base_condition(app_id, type_name).add(Expr::col(resource::Column::Id).eq(id)),
            )
            .exec(conn)
            .await?;
        Ok(())
    }

    async fn delete<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        type_name: &str,
        id: i64,
    ) -> Result<bool, ResourceError> {
        let result = resource::Entity::delete_many()
            .filter(
                base_condition(app_id, type_name).add(Expr::col(resource::Column::Id).eq(id)),
            )
            .exec(conn)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn exists<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        type_name: &str,
        id: i64,
        now: OffsetDateTime,
    ) -> Result<bool, ResourceError> {
        Ok(self
            .find_by_id(conn, app_id, type_name, id, now)
            .await?
            .is_some())
    }
}
