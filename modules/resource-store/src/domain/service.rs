//! The resource service: orchestration of the six actions.
//!
//! Each mutation owns one transaction covering the resource row and its
//! assets; notification dispatch happens strictly after commit and can never
//! fail the request. Row-level actions prefetch the target resource first,
//! then authorize against its author.

use std::sync::Arc;

use resource_odata::ResourceQuery;
use resource_security::RequesterContext;
use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::instrument;

use crate::domain::assets::resolve_references;
use crate::domain::authorize::{AuthTarget, authorize};
use crate::domain::definition::ActionKind;
use crate::domain::error::ResourceError;
use crate::domain::expiration::resolve_expires_at;
use crate::domain::model::{
    AssetUpload, NewResource, QueryParams, Resource, ResourceUpdate, TeamFilter, TeamView,
    WritePayload, shape_output,
};
use crate::domain::notify::{NotificationDispatcher, render_messages};
use crate::domain::registry::{RegisteredType, ResourceTypeRegistry};
use crate::domain::repos::StorageRepository;

pub struct ResourceService<R: StorageRepository> {
    db: DatabaseConnection,
    repo: Arc<R>,
    dispatcher: Option<NotificationDispatcher>,
}

impl<R: StorageRepository> ResourceService<R> {
    pub fn new(db: DatabaseConnection, repo: Arc<R>) -> Self {
        Self {
            db,
            repo,
            dispatcher: None,
        }
    }

    /// Attach the post-commit notification queue.
    #[must_use]
    pub fn with_notifications(mut self, dispatcher: NotificationDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    #[instrument(skip(self, registry, ctx, params), fields(app_id = %registry.app_id(), resource_type = type_name))]
    pub async fn query(
        &self,
        registry: &ResourceTypeRegistry,
        ctx: &RequesterContext,
        type_name: &str,
        params: &QueryParams,
    ) -> Result<Vec<Value>, ResourceError> {
        let resource_type = registry.resource_type(type_name)?;
        let (query, team_param) = parse_params(params)?;
        let now = OffsetDateTime::now_utc();

        let view = self
            .team_view(registry, resource_type, ActionKind::Query, ctx, team_param)
            .await?;
        let scope = authorize(
            registry,
            resource_type,
            ActionKind::Query,
            ctx,
            &view,
            AuthTarget::RowSet,
        )?;
        let team_authors = team_param.map(|f| view.ids_for(f));

        let rows = self
            .repo
            .search(
                &self.db,
                registry.app_id(),
                type_name,
                &scope,
                &query,
                team_authors,
                now,
            )
            .await?;
        Ok(rows
            .iter()
            .map(|r| shape_output(r, &query.select))
            .collect())
    }

    #[instrument(skip(self, registry, ctx, params), fields(app_id = %registry.app_id(), resource_type = type_name))]
    pub async fn count(
        &self,
        registry: &ResourceTypeRegistry,
        ctx: &RequesterContext,
        type_name: &str,
        params: &QueryParams,
    ) -> Result<u64, ResourceError> {
        let resource_type = registry.resource_type(type_name)?;
        let (query, team_param) = parse_params(params)?;
        let now = OffsetDateTime::now_utc();

        let view = self
            .team_view(registry, resource_type, ActionKind::Count, ctx, team_param)
            .await?;
        let scope = authorize(
            registry,
            resource_type,
            ActionKind::Count,
            ctx,
            &view,
            AuthTarget::RowSet,
        )?;
        let team_authors = team_param.map(|f| view.ids_for(f));

        self.repo
            .count(
                &self.db,
                registry.app_id(),
                type_name,
                &scope,
                &query,
                team_authors,
                now,
            )
            .await
    }

    #[instrument(skip(self, registry, ctx, params), fields(app_id = %registry.app_id(), resource_type = type_name, resource_id = id))]
    pub async fn get(
        &self,
        registry: &ResourceTypeRegistry,
        ctx: &RequesterContext,
        type_name: &str,
        id: i64,
        params: &QueryParams,
    ) -> Result<Value, ResourceError> {
        let resource_type = registry.resource_type(type_name)?;
        let query =
            ResourceQuery::from_params(None, None, params.select.as_deref(), None)?;
        let now = OffsetDateTime::now_utc();

        let resource = self
            .repo
            .find_by_id(&self.db, registry.app_id(), type_name, id, now)
            .await?
            .ok_or_else(ResourceError::resource_not_found)?;

        let view = self
            .team_view(registry, resource_type, ActionKind::Get, ctx, None)
            .await?;
        authorize(
            registry,
            resource_type,
            ActionKind::Get,
            ctx,
            &view,
            AuthTarget::Row {
                author_id: resource.author_id,
            },
        )?;

        Ok(shape_output(&resource, &query.select))
    }

    #[instrument(skip(self, registry, ctx, body, uploads), fields(app_id = %registry.app_id(), resource_type = type_name))]
    pub async fn create(
        &self,
        registry: &ResourceTypeRegistry,
        ctx: &RequesterContext,
        type_name: &str,
        body: Value,
        uploads: Vec<AssetUpload>,
    ) -> Result<Value, ResourceError> {
        let resource_type = registry.resource_type(type_name)?;
        let now = OffsetDateTime::now_utc();

        let view = self
            .team_view(registry, resource_type, ActionKind::Create, ctx, None)
            .await?;
        authorize(
            registry,
            resource_type,
            ActionKind::Create,
            ctx,
            &view,
            AuthTarget::New,
        )?;

        let payload = WritePayload::from_body(body)?;
        let expires_at = resolve_expires_at(resource_type.expires(), payload.expires, now)?;
        resource_type.schema().validate(&payload.data)?;
        let resolved = resolve_references(
            resource_type.schema().binary_fields(),
            payload.data,
            uploads,
            &[],
        )?;

        let txn = self.db.begin().await?;
        self.check_references(&txn, registry, resource_type, &resolved.data, now)
            .await?;
        let resource = self
            .repo
            .insert(
                &txn,
                NewResource {
                    app_id: registry.app_id(),
                    resource_type: type_name.to_owned(),
                    data: resolved.data,
                    author_id: ctx.user_id(),
                    author_name: ctx.display_name().map(str::to_owned),
                    clonable: payload.clonable.unwrap_or(false),
                    created_at: now,
                    updated_at: now,
                    expires_at,
                },
            )
            .await?;
        self.repo
            .insert_many(&txn, registry.app_id(), resource.id, resolved.new_assets)
            .await?;
        txn.commit().await?;

        self.notify(registry, resource_type, ActionKind::Create, &resource)
            .await;
        Ok(shape_output(&resource, &[]))
    }

    #[instrument(skip(self, registry, ctx, body, uploads), fields(app_id = %registry.app_id(), resource_type = type_name, resource_id = id))]
    pub async fn update(
        &self,
        registry: &ResourceTypeRegistry,
        ctx: &RequesterContext,
        type_name: &str,
        id: i64,
        body: Value,
        uploads: Vec<AssetUpload>,
    ) -> Result<Value, ResourceError> {
        let resource_type = registry.resource_type(type_name)?;
        let now = OffsetDateTime::now_utc();

        let existing = self
            .repo
            .find_by_id(&self.db, registry.app_id(), type_name, id, now)
            .await?
            .ok_or_else(ResourceError::resource_not_found)?;

        let view = self
            .team_view(registry, resource_type, ActionKind::Update, ctx, None)
            .await?;
        authorize(
            registry,
            resource_type,
            ActionKind::Update,
            ctx,
            &view,
            AuthTarget::Row {
                author_id: existing.author_id,
            },
        )?;

        let payload = WritePayload::from_body(body)?;
        let expires_at = resolve_expires_at(resource_type.expires(), payload.expires, now)?;
        resource_type.schema().validate(&payload.data)?;

        let txn = self.db.begin().await?;
        let existing_asset_ids = self
            .repo
            .ids_for_resource(&txn, registry.app_id(), id)
            .await?;
        let resolved = resolve_references(
            resource_type.schema().binary_fields(),
            payload.data,
            uploads,
            &existing_asset_ids,
        )?;
        self.check_references(&txn, registry, resource_type, &resolved.data, now)
            .await?;

        let clonable = payload.clonable.unwrap_or(existing.clonable);
        self.repo
            .update(
                &txn,
                registry.app_id(),
                type_name,
                id,
                ResourceUpdate {
                    data: resolved.data.clone(),
                    clonable,
                    updated_at: now,
                    expires_at,
                },
            )
            .await?;
        self.repo
            .delete_by_ids(&txn, registry.app_id(), &resolved.removed_asset_ids)
            .await?;
        self.repo
            .insert_many(&txn, registry.app_id(), id, resolved.new_assets)
            .await?;
        txn.commit().await?;

        let updated = Resource {
            data: resolved.data,
            clonable,
            updated_at: now,
            expires_at,
            ..existing
        };
        self.notify(registry, resource_type, ActionKind::Update, &updated)
            .await;
        Ok(shape_output(&updated, &[]))
    }

    #[instrument(skip(self, registry, ctx), fields(app_id = %registry.app_id(), resource_type = type_name, resource_id = id))]
    pub async fn delete(
        &self,
        registry: &ResourceTypeRegistry,
        ctx: &RequesterContext,
        type_name: &str,
        id: i64,
    ) -> Result<(), ResourceError> {
        let resource_type = registry.resource_type(type_name)?;
        let now = OffsetDateTime::now_utc();

        let existing = self
            .repo
            .find_by_id(&self.db, registry.app_id(), type_name, id, now)
            .await?
            .ok_or_else(ResourceError::resource_not_found)?;

        let view = self
            .team_view(registry, resource_type, ActionKind::Delete, ctx, None)
            .await?;
        authorize(
            registry,
            resource_type,
            ActionKind::Delete,
            ctx,
            &view,
            AuthTarget::Row {
                author_id: existing.author_id,
            },
        )?;

        let txn = self.db.begin().await?;
        self.repo
            .delete_for_resource(&txn, registry.app_id(), id)
            .await?;
        let deleted = self
            .repo
            .delete(&txn, registry.app_id(), type_name, id)
            .await?;
        txn.commit().await?;

        if !deleted {
            return Err(ResourceError::resource_not_found());
        }
        self.notify(registry, resource_type, ActionKind::Delete, &existing)
            .await;
        Ok(())
    }

    /// Load the requester's team neighborhood when the action (or a `$team`
    /// parameter) needs it; an empty view otherwise.
    async fn team_view(
        &self,
        registry: &ResourceTypeRegistry,
        resource_type: &RegisteredType,
        kind: ActionKind,
        ctx: &RequesterContext,
        team_param: Option<TeamFilter>,
    ) -> Result<TeamView, ResourceError> {
        let needed = resource_type.needs_team_view(kind) || team_param.is_some();
        match (needed, ctx.user_id()) {
            (true, Some(user_id)) => {
                self.repo
                    .team_view(&self.db, registry.app_id(), user_id)
                    .await
            }
            _ => Ok(TeamView::default()),
        }
    }

    /// Validate reference fields against live rows of their target types.
    async fn check_references<C: ConnectionTrait>(
        &self,
        conn: &C,
        registry: &ResourceTypeRegistry,
        resource_type: &RegisteredType,
        data: &Value,
        now: OffsetDateTime,
    ) -> Result<(), ResourceError> {
        for (field, reference) in resource_type.references() {
            let Some(value) = data.get(field) else {
                continue;
            };
            let Some(target_id) = value.as_i64() else {
                return Err(ResourceError::invalid_field(
                    field.clone(),
                    format!("must be the id of a {} resource", reference.resource),
                ));
            };
            let found = self
                .repo
                .exists(conn, registry.app_id(), &reference.resource, target_id, now)
                .await?;
            if !found {
                return Err(ResourceError::invalid_field(
                    field.clone(),
                    format!(
                        "does not reference an existing {} resource",
                        reference.resource
                    ),
                ));
            }
        }
        Ok(())
    }

    async fn notify(
        &self,
        registry: &ResourceTypeRegistry,
        resource_type: &RegisteredType,
        kind: ActionKind,
        resource: &Resource,
    ) {
        let Some(dispatcher) = &self.dispatcher else {
            return;
        };
        let Some(hook) = resource_type.notification(kind) else {
            return;
        };
        let endpoints = match self
            .repo
            .recipients(
                &self.db,
                registry.app_id(),
                resource_type.name(),
                kind.as_str(),
                resource.id,
                resource.author_id,
                hook.subscribe,
            )
            .await
        {
            Ok(endpoints) => endpoints,
            Err(error) => {
                tracing::warn!(%error, "Failed to resolve notification recipients (continuing)");
                return;
            }
        };
        for message in render_messages(resource_type.name(), hook, resource, &endpoints) {
            dispatcher.enqueue(message);
        }
    }
}

fn parse_params(
    params: &QueryParams,
) -> Result<(ResourceQuery, Option<TeamFilter>), ResourceError> {
    let query = ResourceQuery::from_params(
        params.filter.as_deref(),
        params.orderby.as_deref(),
        params.select.as_deref(),
        params.top.as_deref(),
    )?;
    let team = params
        .team
        .as_deref()
        .map(TeamFilter::parse)
        .transpose()?;
    Ok((query, team))
}
