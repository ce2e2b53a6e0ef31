//! Security primitives for the resource store.
//!
//! [`RequesterContext`] describes who is making a request (built during
//! authentication, before any resource module runs). [`RoleToken`] is the
//! vocabulary of role requirements attached to resource actions. The
//! authorizer evaluates the two against each other and compiles the outcome
//! into an [`AccessScope`], a declarative row-level predicate the storage
//! layer turns into SQL.

pub mod access_scope;
pub mod context;
pub mod roles;

pub use access_scope::{
    AccessScope, EqScopeFilter, InScopeFilter, ScopeConstraint, ScopeFilter, ScopeValue,
    scope_properties,
};
pub use context::{CredentialScope, OrganizationRole, RequesterContext};
pub use roles::RoleToken;
