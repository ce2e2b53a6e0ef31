//! Deserialized app-definition structures.
//!
//! These mirror the resource-related sections of an app definition as loaded
//! by the (external) definition parser. They stay close to the wire shape;
//! everything derived from them (compiled schemas, flattened role
//! inheritance, parsed durations) lives in the registry.

use std::collections::BTreeMap;

use serde::Deserialize;

/// The slice of an app definition the resource engine consumes.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDefinition {
    /// App-wide role inheritance graph: role name → definition.
    #[serde(default)]
    pub roles: BTreeMap<String, AppRoleDef>,
    /// Resource types keyed by name.
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceTypeDef>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRoleDef {
    #[serde(default)]
    pub inherits: Vec<String>,
}

/// One resource type: schema, per-action rules, lifecycle configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTypeDef {
    /// JSON Schema for the `data` payload (object of scalars; string fields
    /// with `format: binary` are asset pointers).
    #[serde(default = "default_schema")]
    pub schema: serde_json::Value,

    /// Type-level role fallback, applied to actions that declare no roles of
    /// their own.
    #[serde(default)]
    pub roles: Option<Vec<String>>,

    /// Lifetime of instances, as a humantime duration string (`"10m"`).
    #[serde(default)]
    pub expires: Option<String>,

    /// Fields referencing instances of other resource types.
    #[serde(default)]
    pub references: BTreeMap<String, ReferenceDef>,

    #[serde(default)]
    pub count: ActionDef,
    #[serde(default)]
    pub get: ActionDef,
    #[serde(default)]
    pub query: ActionDef,
    #[serde(default)]
    pub create: ActionDef,
    #[serde(default)]
    pub update: ActionDef,
    #[serde(default)]
    pub delete: ActionDef,
}

/// Per-action configuration. Absent roles fall back to the type-level list;
/// absent there too means the action is private.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDef {
    #[serde(default)]
    pub roles: Option<Vec<String>>,
    #[serde(default)]
    pub notification: Option<NotificationHookDef>,
}

/// A field pointing at another resource type by id.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceDef {
    /// Name of the target resource type.
    pub resource: String,
    /// Actions on the target that propagate to rows referencing it.
    #[serde(default)]
    pub trigger_actions: Vec<String>,
}

/// Push-notification hook attached to a mutating action.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationHookDef {
    #[serde(default)]
    pub subscribe: SubscribePolicy,
    /// Title template; `{field}` placeholders resolve against the resource
    /// payload (plus `{id}`). Defaults to the resource type name.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Who receives hook notifications.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubscribePolicy {
    /// Every subscriber with the type-level flag on.
    #[default]
    All,
    /// Subscribers with either the type-level or the per-resource flag on.
    Both,
    /// Only the resource author's own subscriptions.
    Author,
}

/// The six resource actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionKind {
    Count,
    Get,
    Query,
    Create,
    Update,
    Delete,
}

impl ActionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Get => "get",
            Self::Query => "query",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Write actions require the `resources:write` credential scope; reads
    /// require `resources:read`.
    #[must_use]
    pub fn is_write(self) -> bool {
        matches!(self, Self::Create | Self::Update | Self::Delete)
    }
}

impl ResourceTypeDef {
    #[must_use]
    pub fn action(&self, kind: ActionKind) -> &ActionDef {
        match kind {
            ActionKind::Count => &self.count,
            ActionKind::Get => &self.get,
            ActionKind::Query => &self.query,
            ActionKind::Create => &self.create,
            ActionKind::Update => &self.update,
            ActionKind::Delete => &self.delete,
        }
    }
}

fn default_schema() -> serde_json::Value {
    serde_json::json!({ "type": "object" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_a_full_type_definition() {
        let def: ResourceTypeDef = serde_json::from_value(serde_json::json!({
            "schema": {
                "type": "object",
                "required": ["title"],
                "properties": {
                    "title": { "type": "string" },
                    "cover": { "type": "string", "format": "binary" }
                }
            },
            "roles": ["Reader"],
            "expires": "10m",
            "references": {
                "owner": { "resource": "person", "triggerActions": ["delete"] }
            },
            "query": { "roles": ["$public"] },
            "create": {
                "roles": ["$author"],
                "notification": { "subscribe": "both", "title": "New {title}" }
            }
        }))
        .unwrap();

        assert_eq!(def.roles.as_deref(), Some(&["Reader".to_owned()][..]));
        assert_eq!(def.expires.as_deref(), Some("10m"));
        assert_eq!(def.references["owner"].resource, "person");
        assert_eq!(def.references["owner"].trigger_actions, ["delete"]);
        assert_eq!(
            def.action(ActionKind::Query).roles.as_deref(),
            Some(&["$public".to_owned()][..])
        );

        let hook = def.create.notification.as_ref().unwrap();
        assert_eq!(hook.subscribe, SubscribePolicy::Both);
        assert_eq!(hook.title.as_deref(), Some("New {title}"));
        assert!(hook.content.is_none());

        // Actions without explicit config deserialize to the private default.
        assert!(def.action(ActionKind::Delete).roles.is_none());
    }

    #[test]
    fn subscribe_policy_defaults_to_all() {
        let hook: NotificationHookDef = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(hook.subscribe, SubscribePolicy::All);
    }

    #[test]
    fn action_kinds_classify_reads_and_writes() {
        assert!(!ActionKind::Count.is_write());
        assert!(!ActionKind::Get.is_write());
        assert!(!ActionKind::Query.is_write());
        assert!(ActionKind::Create.is_write());
        assert!(ActionKind::Update.is_write());
        assert!(ActionKind::Delete.is_write());
        assert_eq!(ActionKind::Query.as_str(), "query");
    }
}
