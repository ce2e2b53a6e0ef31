//! Per-app resource type registry.
//!
//! Built once when an app definition is loaded. Everything that can be
//! precomputed is: schemas are compiled, `expires` durations parsed, action
//! role lists resolved into [`RoleToken`]s, and the role inheritance graph
//! flattened into a transitive closure so per-request role checks are a set
//! lookup, never a traversal.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use resource_security::RoleToken;
use uuid::Uuid;

use crate::domain::definition::{
    ActionKind, AppDefinition, NotificationHookDef, ReferenceDef, ResourceTypeDef,
};
use crate::domain::error::ResourceError;
use crate::domain::schema::{CompiledSchema, DefinitionError};

const ACTIONS: [ActionKind; 6] = [
    ActionKind::Count,
    ActionKind::Get,
    ActionKind::Query,
    ActionKind::Create,
    ActionKind::Update,
    ActionKind::Delete,
];

#[derive(Debug)]
pub struct ResourceTypeRegistry {
    app_id: Uuid,
    types: BTreeMap<String, RegisteredType>,
    /// role name → every role it counts as (itself plus transitive inherits).
    role_closure: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Debug)]
pub struct RegisteredType {
    name: String,
    schema: CompiledSchema,
    expires: Option<Duration>,
    references: BTreeMap<String, ReferenceDef>,
    roles: BTreeMap<ActionKind, Vec<RoleToken>>,
    notifications: BTreeMap<ActionKind, NotificationHookDef>,
}

impl ResourceTypeRegistry {
    pub fn build(app_id: Uuid, definition: &AppDefinition) -> Result<Self, DefinitionError> {
        let role_closure = flatten_roles(definition)?;

        let mut types = BTreeMap::new();
        for (name, def) in &definition.resources {
            types.insert(name.clone(), RegisteredType::build(name, def)?);
        }

        Ok(Self {
            app_id,
            types,
            role_closure,
        })
    }

    #[must_use]
    pub fn app_id(&self) -> Uuid {
        self.app_id
    }

    pub fn resource_type(&self, name: &str) -> Result<&RegisteredType, ResourceError> {
        self.types
            .get(name)
            .ok_or_else(|| ResourceError::type_not_found(name))
    }

    /// Whether holding `held` satisfies a requirement for `required`,
    /// directly or through inheritance.
    #[must_use]
    pub fn role_counts_as(&self, held: &str, required: &str) -> bool {
        self.role_closure
            .get(held)
            .is_some_and(|closure| closure.contains(required))
    }
}

impl RegisteredType {
    fn build(name: &str, def: &ResourceTypeDef) -> Result<Self, DefinitionError> {
        let schema = CompiledSchema::compile(name, &def.schema)?;

        let expires = def
            .expires
            .as_deref()
            .map(|raw| {
                humantime::parse_duration(raw).map_err(|e| DefinitionError::InvalidExpires {
                    type_name: name.to_owned(),
                    raw: raw.to_owned(),
                    message: e.to_string(),
                })
            })
            .transpose()?;

        let mut roles = BTreeMap::new();
        let mut notifications = BTreeMap::new();
        for kind in ACTIONS {
            let action = def.action(kind);
            let raw = action.roles.as_ref().or(def.roles.as_ref());
            let tokens = raw.map_or_else(Vec::new, |list| {
                list.iter().map(|r| RoleToken::parse(r)).collect()
            });
            roles.insert(kind, tokens);
            if let Some(hook) = &action.notification {
                notifications.insert(kind, hook.clone());
            }
        }

        Ok(Self {
            name: name.to_owned(),
            schema,
            expires,
            references: def.references.clone(),
            roles,
            notifications,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    #[must_use]
    pub fn expires(&self) -> Option<Duration> {
        self.expires
    }

    #[must_use]
    pub fn references(&self) -> &BTreeMap<String, ReferenceDef> {
        &self.references
    }

    /// The role requirement set of an action. Empty means private.
    #[must_use]
    pub fn roles(&self, kind: ActionKind) -> &[RoleToken] {
        self.roles.get(&kind).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn notification(&self, kind: ActionKind) -> Option<&NotificationHookDef> {
        self.notifications.get(&kind)
    }

    /// Whether evaluating this action needs the requester's team view.
    #[must_use]
    pub fn needs_team_view(&self, kind: ActionKind) -> bool {
        self.roles(kind)
            .iter()
            .any(|t| matches!(t, RoleToken::TeamMember | RoleToken::TeamManager))
    }
}

fn flatten_roles(
    definition: &AppDefinition,
) -> Result<BTreeMap<String, BTreeSet<String>>, DefinitionError> {
    let mut closure = BTreeMap::new();
    for name in definition.roles.keys() {
        let mut reached = BTreeSet::new();
        let mut stack = vec![name.clone()];
        while let Some(current) = stack.pop() {
            if !reached.insert(current.clone()) {
                continue;
            }
            let def = definition.roles.get(&current).ok_or_else(|| {
                DefinitionError::UnknownInheritedRole {
                    role: name.clone(),
                    missing: current.clone(),
                }
            })?;
            stack.extend(def.inherits.iter().cloned());
        }
        closure.insert(name.clone(), reached);
    }
    Ok(closure)
}
