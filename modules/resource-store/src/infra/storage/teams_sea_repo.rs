use async_trait::async_trait;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::domain::error::ResourceError;
use crate::domain::model::TeamView;
use crate::domain::repos::TeamsRepository;

use super::SeaOrmStorage;
use super::entity::{team, team_member};

#[async_trait]
impl TeamsRepository for SeaOrmStorage {
    async fn team_view<C: ConnectionTrait>(
        &self,
        conn: &C,
        app_id: Uuid,
        user_id: Uuid,
    ) -> Result<TeamView, ResourceError> {
        let team_ids: Vec<Uuid> = team::Entity::find()
            .select_only()
            .column(team::Column::Id)
            .filter(team::Column::AppId.eq(app_id))
            .into_tuple()
            .all(conn)
            .await?;
        if team_ids.is_empty() {
            return Ok(TeamView::default());
        }

        let memberships = team_member::Entity::find()
            .filter(team_member::Column::TeamId.is_in(team_ids))
            .all(conn)
            .await?;

        let mut by_team: BTreeMap<Uuid, Vec<&team_member::Model>> = BTreeMap::new();
        for row in &memberships {
            by_team.entry(row.team_id).or_default().push(row);
        }

        let mut view = TeamView::default();
        for rows in by_team.values() {
            let Some(own) = rows.iter().find(|r| r.user_id == user_id) else {
                continue;
            };
            let everyone: BTreeSet<Uuid> = rows.iter().map(|r| r.user_id).collect();
            match own.role.as_str() {
                team_member::roles::MANAGER => view.managed_member_ids.extend(everyone),
                _ => view.co_member_ids.extend(everyone),
            }
        }
        Ok(view)
    }
}
