use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

/// A user's role within the organization that owns an app.
///
/// Ordered from least to most privileged; `>=` comparisons express
/// "at least this role" checks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum OrganizationRole {
    Member,
    ApiReader,
    ApiWriter,
    AppEditor,
    Maintainer,
    Owner,
}

impl OrganizationRole {
    /// Whether this role carries the organization-operator override for
    /// resource actions.
    #[must_use]
    pub fn can_operate_resources(self) -> bool {
        self >= Self::AppEditor
    }
}

impl fmt::Display for OrganizationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Member => "Member",
            Self::ApiReader => "APIReader",
            Self::ApiWriter => "APIWriter",
            Self::AppEditor => "AppEditor",
            Self::Maintainer => "Maintainer",
            Self::Owner => "Owner",
        };
        f.write_str(s)
    }
}

impl FromStr for OrganizationRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Member" => Ok(Self::Member),
            "APIReader" => Ok(Self::ApiReader),
            "APIWriter" => Ok(Self::ApiWriter),
            "AppEditor" => Ok(Self::AppEditor),
            "Maintainer" => Ok(Self::Maintainer),
            "Owner" => Ok(Self::Owner),
            _ => Err(UnknownRole(s.to_owned())),
        }
    }
}

/// Capability restriction carried by a client-credentials token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CredentialScope {
    ResourcesRead,
    ResourcesWrite,
}

impl fmt::Display for CredentialScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResourcesRead => f.write_str("resources:read"),
            Self::ResourcesWrite => f.write_str("resources:write"),
        }
    }
}

impl FromStr for CredentialScope {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resources:read" => Ok(Self::ResourcesRead),
            "resources:write" => Ok(Self::ResourcesWrite),
            _ => Err(UnknownRole(s.to_owned())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown role or scope: {0}")]
pub struct UnknownRole(pub String);

/// Who is making the request.
///
/// Built by the authentication layer and passed through the whole request
/// lifecycle; the resource authorizer never sees raw credentials, only this.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RequesterContext {
    /// No credentials were presented.
    Anonymous,
    /// A studio user acting on the app from outside; may hold a role in the
    /// organization that owns the app, but is not an app member.
    #[serde(rename_all = "camelCase")]
    StudioSession {
        user_id: Uuid,
        name: String,
        organization_role: Option<OrganizationRole>,
    },
    /// An authenticated member of the app itself, carrying an app-defined
    /// role name.
    #[serde(rename_all = "camelCase")]
    AppMember {
        user_id: Uuid,
        name: String,
        role: String,
    },
    /// A machine client authenticated with OAuth2 client credentials on
    /// behalf of `owner_id`.
    #[serde(rename_all = "camelCase")]
    ClientCredentials {
        owner_id: Uuid,
        organization_role: Option<OrganizationRole>,
        scopes: Vec<CredentialScope>,
    },
}

impl RequesterContext {
    /// The authenticated user behind the request, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Self::Anonymous => None,
            Self::StudioSession { user_id, .. } | Self::AppMember { user_id, .. } => Some(*user_id),
            Self::ClientCredentials { owner_id, .. } => Some(*owner_id),
        }
    }

    /// Display name of the requester, when one is known.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        match self {
            Self::StudioSession { name, .. } | Self::AppMember { name, .. } => Some(name),
            Self::Anonymous | Self::ClientCredentials { .. } => None,
        }
    }

    /// The app-defined role held by the requester, if they are an app member.
    #[must_use]
    pub fn app_role(&self) -> Option<&str> {
        match self {
            Self::AppMember { role, .. } => Some(role),
            _ => None,
        }
    }

    /// The requester's role in the app's owning organization, if any.
    #[must_use]
    pub fn organization_role(&self) -> Option<OrganizationRole> {
        match self {
            Self::StudioSession {
                organization_role, ..
            }
            | Self::ClientCredentials {
                organization_role, ..
            } => *organization_role,
            Self::Anonymous | Self::AppMember { .. } => None,
        }
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Whether a client-credentials token carries the given capability.
    ///
    /// Non-credential requesters are not scope-restricted; for them this
    /// returns `true`.
    #[must_use]
    pub fn allows_scope(&self, scope: CredentialScope) -> bool {
        match self {
            Self::ClientCredentials { scopes, .. } => scopes.contains(&scope),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organization_roles_are_ordered() {
        assert!(OrganizationRole::Owner > OrganizationRole::AppEditor);
        assert!(OrganizationRole::AppEditor > OrganizationRole::ApiWriter);
        assert!(OrganizationRole::Member < OrganizationRole::ApiReader);

        assert!(OrganizationRole::AppEditor.can_operate_resources());
        assert!(OrganizationRole::Owner.can_operate_resources());
        assert!(!OrganizationRole::ApiWriter.can_operate_resources());
    }

    #[test]
    fn roles_round_trip_through_str() {
        for role in [
            OrganizationRole::Member,
            OrganizationRole::ApiReader,
            OrganizationRole::ApiWriter,
            OrganizationRole::AppEditor,
            OrganizationRole::Maintainer,
            OrganizationRole::Owner,
        ] {
            assert_eq!(role.to_string().parse::<OrganizationRole>(), Ok(role));
        }
        assert!("Janitor".parse::<OrganizationRole>().is_err());
    }

    #[test]
    fn credential_scopes_parse() {
        assert_eq!(
            "resources:read".parse::<CredentialScope>(),
            Ok(CredentialScope::ResourcesRead)
        );
        assert_eq!(
            "resources:write".parse::<CredentialScope>(),
            Ok(CredentialScope::ResourcesWrite)
        );
        assert!("resources:delete".parse::<CredentialScope>().is_err());
    }

    #[test]
    fn scope_restriction_only_applies_to_client_credentials() {
        let anon = RequesterContext::Anonymous;
        assert!(anon.allows_scope(CredentialScope::ResourcesWrite));

        let cc = RequesterContext::ClientCredentials {
            owner_id: Uuid::new_v4(),
            organization_role: Some(OrganizationRole::Owner),
            scopes: vec![CredentialScope::ResourcesRead],
        };
        assert!(cc.allows_scope(CredentialScope::ResourcesRead));
        assert!(!cc.allows_scope(CredentialScope::ResourcesWrite));
    }

    #[test]
    fn accessor_shapes() {
        let member = RequesterContext::AppMember {
            user_id: Uuid::new_v4(),
            name: "Alice".to_owned(),
            role: "Reader".to_owned(),
        };
        assert_eq!(member.app_role(), Some("Reader"));
        assert_eq!(member.display_name(), Some("Alice"));
        assert_eq!(member.organization_role(), None);
        assert!(!member.is_anonymous());
        assert!(member.user_id().is_some());

        assert!(RequesterContext::Anonymous.is_anonymous());
        assert_eq!(RequesterContext::Anonymous.user_id(), None);
    }
}
