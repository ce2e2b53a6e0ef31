use std::fmt;

/// One entry in an action's role requirement list.
///
/// The reserved tokens start with `$`; anything else names a role defined by
/// the app's security section.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RoleToken {
    /// `$public` — everyone, authenticated or not.
    Public,
    /// `$none` — only requests with no credentials at all.
    None,
    /// `$author` — the user who created the resource.
    Author,
    /// `$team:member` — members of a team the author also belongs to.
    TeamMember,
    /// `$team:manager` — managers of a team the author belongs to.
    TeamManager,
    /// An app-defined role name.
    Named(String),
}

impl RoleToken {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "$public" => Self::Public,
            "$none" => Self::None,
            "$author" => Self::Author,
            "$team:member" => Self::TeamMember,
            "$team:manager" => Self::TeamManager,
            other => Self::Named(other.to_owned()),
        }
    }

    /// Whether matching this token requires knowing who authored the
    /// resource (per-row evaluation rather than per-request).
    #[must_use]
    pub fn is_row_scoped(&self) -> bool {
        matches!(self, Self::Author | Self::TeamMember | Self::TeamManager)
    }
}

impl fmt::Display for RoleToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => f.write_str("$public"),
            Self::None => f.write_str("$none"),
            Self::Author => f.write_str("$author"),
            Self::TeamMember => f.write_str("$team:member"),
            Self::TeamManager => f.write_str("$team:manager"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_tokens_parse() {
        assert_eq!(RoleToken::parse("$public"), RoleToken::Public);
        assert_eq!(RoleToken::parse("$none"), RoleToken::None);
        assert_eq!(RoleToken::parse("$author"), RoleToken::Author);
        assert_eq!(RoleToken::parse("$team:member"), RoleToken::TeamMember);
        assert_eq!(RoleToken::parse("$team:manager"), RoleToken::TeamManager);
    }

    #[test]
    fn anything_else_is_a_named_role() {
        assert_eq!(
            RoleToken::parse("Reader"),
            RoleToken::Named("Reader".to_owned())
        );
        // Unknown $-prefixed spellings fall through to named roles too;
        // they simply never match a defined role.
        assert_eq!(
            RoleToken::parse("$team:owner"),
            RoleToken::Named("$team:owner".to_owned())
        );
    }

    #[test]
    fn row_scoped_tokens() {
        assert!(RoleToken::Author.is_row_scoped());
        assert!(RoleToken::TeamMember.is_row_scoped());
        assert!(RoleToken::TeamManager.is_row_scoped());
        assert!(!RoleToken::Public.is_row_scoped());
        assert!(!RoleToken::Named("Reader".to_owned()).is_row_scoped());
    }

    #[test]
    fn display_round_trips() {
        for raw in ["$public", "$none", "$author", "$team:member", "Reader"] {
            assert_eq!(RoleToken::parse(raw).to_string(), raw);
        }
    }
}
