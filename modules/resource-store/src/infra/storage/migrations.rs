//! Schema migrations for the resource store.

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250901_000001_init::Migration)]
    }
}

mod m20250901_000001_init {
    use super::*;

    #[derive(DeriveMigrationName)]
    pub struct Migration;

    #[derive(DeriveIden)]
    enum Resources {
        Table,
        Id,
        AppId,
        ResourceType,
        Data,
        AuthorId,
        AuthorName,
        Clonable,
        CreatedAt,
        UpdatedAt,
        ExpiresAt,
    }

    #[derive(DeriveIden)]
    enum Assets {
        Table,
        Id,
        AppId,
        ResourceId,
        Mime,
        Filename,
        Data,
    }

    #[derive(DeriveIden)]
    enum Teams {
        Table,
        Id,
        AppId,
        Name,
    }

    #[derive(DeriveIden)]
    enum TeamMembers {
        Table,
        TeamId,
        UserId,
        Role,
    }

    #[derive(DeriveIden)]
    enum ResourceSubscriptions {
        Table,
        Id,
        AppId,
        Endpoint,
        UserId,
        ResourceType,
        Action,
        ResourceId,
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Resources::Table)
                        .col(
                            ColumnDef::new(Resources::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Resources::AppId).uuid().not_null())
                        .col(ColumnDef::new(Resources::ResourceType).string().not_null())
                        .col(ColumnDef::new(Resources::Data).json().not_null())
                        .col(ColumnDef::new(Resources::AuthorId).uuid())
                        .col(ColumnDef::new(Resources::AuthorName).string())
                        .col(ColumnDef::new(Resources::Clonable).boolean().not_null())
                        .col(
                            ColumnDef::new(Resources::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Resources::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Resources::ExpiresAt).timestamp_with_time_zone())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_resources_app_type")
                        .table(Resources::Table)
                        .col(Resources::AppId)
                        .col(Resources::ResourceType)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Assets::Table)
                        .col(
                            ColumnDef::new(Assets::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Assets::AppId).uuid().not_null())
                        .col(ColumnDef::new(Assets::ResourceId).big_integer())
                        .col(ColumnDef::new(Assets::Mime).string().not_null())
                        .col(ColumnDef::new(Assets::Filename).string())
                        .col(ColumnDef::new(Assets::Data).blob().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_assets_resource")
                                .from(Assets::Table, Assets::ResourceId)
                                .to(Resources::Table, Resources::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_assets_resource")
                        .table(Assets::Table)
                        .col(Assets::ResourceId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Teams::Table)
                        .col(ColumnDef::new(Teams::Id).uuid().not_null().primary_key())
                        .col(ColumnDef::new(Teams::AppId).uuid().not_null())
                        .col(ColumnDef::new(Teams::Name).string().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(TeamMembers::Table)
                        .col(ColumnDef::new(TeamMembers::TeamId).uuid().not_null())
                        .col(ColumnDef::new(TeamMembers::UserId).uuid().not_null())
                        .col(ColumnDef::new(TeamMembers::Role).string().not_null())
                        .primary_key(
                            Index::create()
                                .col(TeamMembers::TeamId)
                                .col(TeamMembers::UserId),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_team_members_team")
                                .from(TeamMembers::Table, TeamMembers::TeamId)
                                .to(Teams::Table, Teams::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ResourceSubscriptions::Table)
                        .col(
                            ColumnDef::new(ResourceSubscriptions::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ResourceSubscriptions::AppId).uuid().not_null())
                        .col(
                            ColumnDef::new(ResourceSubscriptions::Endpoint)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ResourceSubscriptions::UserId).uuid())
                        .col(
                            ColumnDef::new(ResourceSubscriptions::ResourceType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ResourceSubscriptions::Action)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ResourceSubscriptions::ResourceId).big_integer())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_subscriptions_app_type_action")
                        .table(ResourceSubscriptions::Table)
                        .col(ResourceSubscriptions::AppId)
                        .col(ResourceSubscriptions::ResourceType)
                        .col(ResourceSubscriptions::Action)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ResourceSubscriptions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(TeamMembers::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Teams::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Assets::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Resources::Table).to_owned())
                .await
        }
    }
}
