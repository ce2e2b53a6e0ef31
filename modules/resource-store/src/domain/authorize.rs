//! The authorization evaluator.
//!
//! One call per (requester, type, action). The outcome is either a terminal
//! denial (one of four distinct errors) or an [`AccessScope`]: unconstrained
//! when a request-level token matched, or an OR of row constraints when only
//! row-scoped tokens (`$author`, `$team:*`) did.

use resource_security::{
    AccessScope, CredentialScope, RequesterContext, RoleToken, ScopeConstraint, ScopeFilter,
    scope_properties,
};
use uuid::Uuid;

use crate::domain::definition::ActionKind;
use crate::domain::error::ResourceError;
use crate::domain::model::{TeamFilter, TeamView};
use crate::domain::registry::{RegisteredType, ResourceTypeRegistry};

/// What the action is aimed at.
#[derive(Clone, Copy, Debug)]
pub enum AuthTarget {
    /// Row-set actions (`query`/`count`); the result narrows rows.
    RowSet,
    /// An already-fetched resource (`get`/`update`/`delete`).
    Row { author_id: Option<Uuid> },
    /// A resource being created; the requester becomes its author.
    New,
}

/// Evaluate an action for a requester.
///
/// `team_view` is the precomputed team neighborhood of the requester; pass
/// an empty view when the action's role set carries no `$team:*` token.
pub fn authorize(
    registry: &ResourceTypeRegistry,
    resource_type: &RegisteredType,
    kind: ActionKind,
    ctx: &RequesterContext,
    team_view: &TeamView,
    target: AuthTarget,
) -> Result<AccessScope, ResourceError> {
    if operator_override(ctx, kind) {
        return Ok(AccessScope::allow_all());
    }

    let required = resource_type.roles(kind);
    if required.is_empty() {
        return Err(ResourceError::ActionPrivate);
    }

    let mut constraints: Vec<ScopeConstraint> = Vec::new();
    for token in required {
        match token {
            RoleToken::Public => return Ok(AccessScope::allow_all()),
            RoleToken::None => {
                if ctx.is_anonymous() {
                    return Ok(AccessScope::allow_all());
                }
            }
            RoleToken::Named(name) => {
                if let Some(held) = ctx.app_role()
                    && registry.role_counts_as(held, name)
                {
                    return Ok(AccessScope::allow_all());
                }
            }
            RoleToken::Author => {
                let Some(user_id) = ctx.user_id() else {
                    continue;
                };
                match target {
                    AuthTarget::RowSet => constraints.push(ScopeConstraint::new(vec![
                        ScopeFilter::eq(scope_properties::AUTHOR_ID, user_id),
                    ])),
                    AuthTarget::Row { author_id } => {
                        if author_id == Some(user_id) {
                            return Ok(AccessScope::allow_all());
                        }
                    }
                    AuthTarget::New => return Ok(AccessScope::allow_all()),
                }
            }
            RoleToken::TeamMember | RoleToken::TeamManager => {
                let Some(user_id) = ctx.user_id() else {
                    continue;
                };
                let filter = if *token == RoleToken::TeamMember {
                    TeamFilter::Member
                } else {
                    TeamFilter::Manager
                };
                let ids = team_view.ids_for(filter);
                match target {
                    AuthTarget::RowSet => constraints.push(ScopeConstraint::new(vec![
                        ScopeFilter::r#in(scope_properties::AUTHOR_ID, ids.iter().copied()),
                    ])),
                    AuthTarget::Row { author_id } => {
                        if author_id.is_some_and(|a| ids.contains(&a)) {
                            return Ok(AccessScope::allow_all());
                        }
                    }
                    AuthTarget::New => {
                        if ids.contains(&user_id) {
                            return Ok(AccessScope::allow_all());
                        }
                    }
                }
            }
        }
    }

    if matches!(target, AuthTarget::RowSet) && !constraints.is_empty() {
        return Ok(AccessScope::from_constraints(constraints));
    }
    Err(denial(ctx))
}

/// Studio sessions and client credentials whose organization role reaches
/// the `AppEditor` tier operate on resources unconditionally. Client
/// credentials additionally need the matching `resources:*` scope.
fn operator_override(ctx: &RequesterContext, kind: ActionKind) -> bool {
    let Some(role) = ctx.organization_role() else {
        return false;
    };
    if !role.can_operate_resources() {
        return false;
    }
    let needed = if kind.is_write() {
        CredentialScope::ResourcesWrite
    } else {
        CredentialScope::ResourcesRead
    };
    ctx.allows_scope(needed)
}

fn denial(ctx: &RequesterContext) -> ResourceError {
    match ctx {
        RequesterContext::Anonymous => ResourceError::Unauthenticated,
        RequesterContext::AppMember { .. } => ResourceError::InsufficientPermissions,
        RequesterContext::StudioSession { .. } | RequesterContext::ClientCredentials { .. } => {
            ResourceError::NotAppMember
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::definition::AppDefinition;
    use resource_security::OrganizationRole;
    use serde_json::json;

    fn registry_with(resources: serde_json::Value) -> ResourceTypeRegistry {
        let definition: AppDefinition = serde_json::from_value(json!({
            "roles": {
                "Reader": {},
                "Admin": { "inherits": ["Reader"] }
            },
            "resources": resources,
        }))
        .unwrap();
        ResourceTypeRegistry::build(Uuid::from_u128(1), &definition).unwrap()
    }

    fn member(role: &str) -> RequesterContext {
        RequesterContext::AppMember {
            user_id: Uuid::from_u128(10),
            name: "Alice".to_owned(),
            role: role.to_owned(),
        }
    }

    fn check(
        registry: &ResourceTypeRegistry,
        kind: ActionKind,
        ctx: &RequesterContext,
        target: AuthTarget,
    ) -> Result<AccessScope, ResourceError> {
        let rt = registry.resource_type("note").unwrap();
        authorize(registry, rt, kind, ctx, &TeamView::default(), target)
    }

    #[test]
    fn private_action_denied_for_everyone_without_override() {
        let registry = registry_with(json!({ "note": {} }));
        for ctx in [
            RequesterContext::Anonymous,
            member("Reader"),
            RequesterContext::StudioSession {
                user_id: Uuid::from_u128(2),
                name: "Bob".to_owned(),
                organization_role: Some(OrganizationRole::Member),
            },
        ] {
            let err = check(&registry, ActionKind::Query, &ctx, AuthTarget::RowSet).unwrap_err();
            assert!(matches!(err, ResourceError::ActionPrivate), "for {ctx:?}");
        }
    }

    #[test]
    fn public_token_admits_anonymous() {
        let registry = registry_with(json!({ "note": { "query": { "roles": ["$public"] } } }));
        let scope = check(
            &registry,
            ActionKind::Query,
            &RequesterContext::Anonymous,
            AuthTarget::RowSet,
        )
        .unwrap();
        assert!(scope.is_unconstrained());
    }

    #[test]
    fn none_token_admits_only_the_fully_anonymous() {
        let registry = registry_with(json!({ "note": { "query": { "roles": ["$none"] } } }));
        assert!(
            check(
                &registry,
                ActionKind::Query,
                &RequesterContext::Anonymous,
                AuthTarget::RowSet
            )
            .unwrap()
            .is_unconstrained()
        );
        let err = check(
            &registry,
            ActionKind::Query,
            &member("Reader"),
            AuthTarget::RowSet,
        )
        .unwrap_err();
        assert!(matches!(err, ResourceError::InsufficientPermissions));
    }

    #[test]
    fn named_role_honors_inheritance() {
        let registry = registry_with(json!({ "note": { "get": { "roles": ["Reader"] } } }));
        let target = AuthTarget::Row {
            author_id: Some(Uuid::from_u128(99)),
        };
        assert!(check(&registry, ActionKind::Get, &member("Admin"), target).is_ok());
        assert!(check(&registry, ActionKind::Get, &member("Reader"), target).is_ok());

        let err = check(&registry, ActionKind::Get, &member("Ghost"), target).unwrap_err();
        assert!(matches!(err, ResourceError::InsufficientPermissions));
    }

    #[test]
    fn anonymous_denial_is_401_authenticated_denials_differ() {
        let registry = registry_with(json!({ "note": { "get": { "roles": ["Reader"] } } }));
        let target = AuthTarget::Row { author_id: None };

        let err = check(&registry, ActionKind::Get, &RequesterContext::Anonymous, target)
            .unwrap_err();
        assert!(matches!(err, ResourceError::Unauthenticated));

        let studio = RequesterContext::StudioSession {
            user_id: Uuid::from_u128(3),
            name: "Bob".to_owned(),
            organization_role: None,
        };
        let err = check(&registry, ActionKind::Get, &studio, target).unwrap_err();
        assert!(matches!(err, ResourceError::NotAppMember));
    }

    #[test]
    fn author_token_matches_only_the_author() {
        let registry = registry_with(json!({ "note": { "update": { "roles": ["$author"] } } }));
        let me = member("Anything");
        let mine = AuthTarget::Row {
            author_id: Some(Uuid::from_u128(10)),
        };
        let theirs = AuthTarget::Row {
            author_id: Some(Uuid::from_u128(11)),
        };
        assert!(check(&registry, ActionKind::Update, &me, mine).is_ok());
        assert!(matches!(
            check(&registry, ActionKind::Update, &me, theirs).unwrap_err(),
            ResourceError::InsufficientPermissions
        ));
    }

    #[test]
    fn author_token_narrows_row_sets_to_own_rows() {
        let registry = registry_with(json!({ "note": { "query": { "roles": ["$author"] } } }));
        let scope = check(
            &registry,
            ActionKind::Query,
            &member("Anything"),
            AuthTarget::RowSet,
        )
        .unwrap();
        assert!(!scope.is_unconstrained());
        assert!(scope.contains_value(
            scope_properties::AUTHOR_ID,
            &Uuid::from_u128(10).into()
        ));
    }

    #[test]
    fn team_tokens_are_evaluated_independently() {
        let registry = registry_with(json!({
            "note": { "get": { "roles": ["$team:manager"] } }
        }));
        let rt = registry.resource_type("note").unwrap();
        let author = Uuid::from_u128(50);

        // Requester manages a team containing the author.
        let mut view = TeamView::default();
        view.managed_member_ids.insert(author);
        let granted = authorize(
            &registry,
            rt,
            ActionKind::Get,
            &member("x"),
            &view,
            AuthTarget::Row {
                author_id: Some(author),
            },
        );
        assert!(granted.is_ok());

        // Being a plain co-member does not satisfy $team:manager.
        let mut view = TeamView::default();
        view.co_member_ids.insert(author);
        let denied = authorize(
            &registry,
            rt,
            ActionKind::Get,
            &member("x"),
            &view,
            AuthTarget::Row {
                author_id: Some(author),
            },
        );
        assert!(denied.is_err());
    }

    #[test]
    fn operator_override_ignores_resource_roles() {
        let registry = registry_with(json!({ "note": { "update": { "roles": ["$author"] } } }));
        let editor = RequesterContext::StudioSession {
            user_id: Uuid::from_u128(4),
            name: "Eve".to_owned(),
            organization_role: Some(OrganizationRole::AppEditor),
        };
        let target = AuthTarget::Row {
            author_id: Some(Uuid::from_u128(99)),
        };
        assert!(check(&registry, ActionKind::Update, &editor, target).is_ok());

        // Below the tier the override does not apply; the member falls
        // through to token evaluation and is denied.
        let low = RequesterContext::StudioSession {
            user_id: Uuid::from_u128(4),
            name: "Eve".to_owned(),
            organization_role: Some(OrganizationRole::Member),
        };
        assert!(check(&registry, ActionKind::Update, &low, target).is_err());
    }

    #[test]
    fn client_credentials_override_requires_matching_scope() {
        let registry = registry_with(json!({ "note": {} }));
        let read_only = RequesterContext::ClientCredentials {
            owner_id: Uuid::from_u128(5),
            organization_role: Some(OrganizationRole::Owner),
            scopes: vec![CredentialScope::ResourcesRead],
        };
        assert!(check(&registry, ActionKind::Query, &read_only, AuthTarget::RowSet).is_ok());
        assert!(check(&registry, ActionKind::Create, &read_only, AuthTarget::New).is_err());

        let writer = RequesterContext::ClientCredentials {
            owner_id: Uuid::from_u128(5),
            organization_role: Some(OrganizationRole::Owner),
            scopes: vec![CredentialScope::ResourcesRead, CredentialScope::ResourcesWrite],
        };
        assert!(check(&registry, ActionKind::Create, &writer, AuthTarget::New).is_ok());
    }

    #[test]
    fn count_roles_are_independent_of_query_roles() {
        let registry = registry_with(json!({
            "note": {
                "query": { "roles": ["$public"] },
                "count": { "roles": ["Reader"] }
            }
        }));
        let anon = RequesterContext::Anonymous;
        assert!(check(&registry, ActionKind::Query, &anon, AuthTarget::RowSet).is_ok());
        assert!(matches!(
            check(&registry, ActionKind::Count, &anon, AuthTarget::RowSet).unwrap_err(),
            ResourceError::Unauthenticated
        ));
    }

    #[test]
    fn create_with_author_token_admits_any_authenticated_user() {
        let registry = registry_with(json!({ "note": { "create": { "roles": ["$author"] } } }));
        assert!(check(&registry, ActionKind::Create, &member("x"), AuthTarget::New).is_ok());
        assert!(matches!(
            check(
                &registry,
                ActionKind::Create,
                &RequesterContext::Anonymous,
                AuthTarget::New
            )
            .unwrap_err(),
            ResourceError::Unauthenticated
        ));
    }
}
