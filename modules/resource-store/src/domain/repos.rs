//! Storage ports of the domain layer.
//!
//! Every method is generic over the connection so the service can run the
//! same repository against a pooled connection or an open transaction.

use async_trait::async_trait;
use resource_odata::ResourceQuery;
use resource_security::AccessScope;
use sea_orm::ConnectionTrait;
use std::collections::BTreeSet;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::definition::SubscribePolicy;
use crate::domain::error::ResourceError;
use crate::domain::model::{NewAsset, NewResource, Resource, ResourceUpdate, TeamView};

#[async_trait]
pub trait ResourcesRepository: Send + Sync {
    /// Fetch one live (non-expired) resource.
    async fn find_by_id<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        type_name: &str,
        id: i64,
        now: OffsetDateTime,
    ) -> Result<Option<Resource>, ResourceError>;

    /// Run a translated query under an access scope.
    ///
    /// `team_authors`, when present, narrows rows to those authored by the
    /// given users on top of everything else (the `$team` parameter).
    async fn search<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        type_name: &str,
        scope: &AccessScope,
        query: &ResourceQuery,
        team_authors: Option<&BTreeSet<Uuid>>,
        now: OffsetDateTime,
    ) -> Result<Vec<Resource>, ResourceError>;

    async fn count<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        type_name: &str,
        scope: &AccessScope,
        query: &ResourceQuery,
        team_authors: Option<&BTreeSet<Uuid>>,
        now: OffsetDateTime,
    ) -> Result<u64, ResourceError>;

    async fn insert<C: ConnectionTrait>(
        &self,
        conn: &C,
        resource: NewResource,
    ) -> Result<Resource, ResourceError>;

    async fn update<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        type_name: &str,
        id: i64,
        update: ResourceUpdate,
    ) -> Result<(), ResourceError>;

    async fn delete<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        type_name: &str,
        id: i64,
    ) -> Result<bool, ResourceError>;

    /// Existence check for reference validation (live rows only).
    async fn exists<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        type_name: &str,
        id: i64,
        now: OffsetDateTime,
    ) -> Result<bool, ResourceError>;
}

#[async_trait]
pub trait AssetsRepository: Send + Sync {
    async fn ids_for_resource<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        resource_id: i64,
    ) -> Result<Vec<Uuid>, ResourceError>;

    async fn insert_many<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        resource_id: i64,
        assets: Vec<NewAsset>,
    ) -> Result<(), ResourceError>;

    async fn delete_by_ids<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        ids: &[Uuid],
    ) -> Result<(), ResourceError>;

    async fn delete_for_resource<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        resource_id: i64,
    ) -> Result<(), ResourceError>;
}

#[async_trait]
pub trait TeamsRepository: Send + Sync {
    /// Compute the requester's team neighborhood within one app.
    async fn team_view<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        user_id: Uuid,
    ) -> Result<TeamView, ResourceError>;
}

#[async_trait]
pub trait SubscriptionsRepository: Send + Sync {
    /// Resolve the push endpoints a hook should reach for one mutation.
    async fn recipients<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        type_name: &str,
        action: &str,
        resource_id: i64,
        author_id: Option<Uuid>,
        policy: SubscribePolicy,
    ) -> Result<Vec<String>, ResourceError>;
}

/// Everything the service needs from storage, rolled into one bound.
pub trait StorageRepository:
    ResourcesRepository + AssetsRepository + TeamsRepository + SubscriptionsRepository
{
}

impl<T> StorageRepository for T where
    T: ResourcesRepository + AssetsRepository + TeamsRepository + SubscriptionsRepository
{
}
