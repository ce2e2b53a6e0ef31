use std::fmt;
use std::slice;

use uuid::Uuid;

/// A scalar value appearing in a scope predicate.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ScopeValue {
    /// UUID value (author ids, asset ids).
    Uuid(Uuid),
    /// String value (role names, type names).
    String(String),
    /// Integer value (resource ids).
    Int(i64),
    /// Boolean value.
    Bool(bool),
}

impl fmt::Display for ScopeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid(u) => write!(f, "{u}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<Uuid> for ScopeValue {
    #[inline]
    fn from(u: Uuid) -> Self {
        Self::Uuid(u)
    }
}

impl From<&str> for ScopeValue {
    #[inline]
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for ScopeValue {
    #[inline]
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for ScopeValue {
    #[inline]
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for ScopeValue {
    #[inline]
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Well-known authorization property names.
///
/// Shared between the authorizer (which emits scopes over these names) and
/// the storage condition builder (which resolves them to columns), so the
/// two never drift apart.
pub mod scope_properties {
    /// Resource authorship. Maps to the `author_id` column.
    pub const AUTHOR_ID: &str = "author_id";

    /// Resource identity. Maps to the primary key column.
    pub const RESOURCE_ID: &str = "id";
}

/// Equality scope filter: `property = value`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EqScopeFilter {
    property: String,
    value: ScopeValue,
}

impl EqScopeFilter {
    #[must_use]
    pub fn new(property: impl Into<String>, value: impl Into<ScopeValue>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }
}

/// Set membership scope filter: `property IN (values)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InScopeFilter {
    property: String,
    values: Vec<ScopeValue>,
}

impl InScopeFilter {
    #[must_use]
    pub fn new(property: impl Into<String>, values: Vec<ScopeValue>) -> Self {
        Self {
            property: property.into(),
            values,
        }
    }
}

/// A single typed predicate on a named authorization property.
///
/// Property names are authorization concepts ([`scope_properties`]); only
/// the storage layer knows which column each one maps to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScopeFilter {
    Eq(EqScopeFilter),
    In(InScopeFilter),
}

impl ScopeFilter {
    /// Equality filter (`property = value`).
    #[must_use]
    pub fn eq(property: impl Into<String>, value: impl Into<ScopeValue>) -> Self {
        Self::Eq(EqScopeFilter::new(property, value))
    }

    /// Set membership filter (`property IN (values)`).
    #[must_use]
    pub fn r#in<V: Into<ScopeValue>>(
        property: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::In(InScopeFilter::new(
            property,
            values.into_iter().map(Into::into).collect(),
        ))
    }

    #[must_use]
    pub fn property(&self) -> &str {
        match self {
            Self::Eq(f) => &f.property,
            Self::In(f) => &f.property,
        }
    }

    /// All values of this filter: a one-element slice for `Eq`, the full
    /// set for `In`.
    #[must_use]
    pub fn values(&self) -> &[ScopeValue] {
        match self {
            Self::Eq(f) => slice::from_ref(&f.value),
            Self::In(f) => &f.values,
        }
    }
}

/// A conjunction (AND) of scope filters — one access path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScopeConstraint {
    filters: Vec<ScopeFilter>,
}

impl ScopeConstraint {
    #[must_use]
    pub fn new(filters: Vec<ScopeFilter>) -> Self {
        Self { filters }
    }

    #[inline]
    #[must_use]
    pub fn filters(&self) -> &[ScopeFilter] {
        &self.filters
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// A disjunction (OR) of scope constraints describing which rows a request
/// may touch.
///
/// Each constraint is an independent access path; filters within one are
/// AND-ed. The default is deny-all, so an authorizer that forgets to grant
/// anything grants nothing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessScope {
    constraints: Vec<ScopeConstraint>,
    unconstrained: bool,
}

impl Default for AccessScope {
    fn default() -> Self {
        Self::deny_all()
    }
}

impl AccessScope {
    #[must_use]
    pub fn from_constraints(constraints: Vec<ScopeConstraint>) -> Self {
        Self {
            constraints,
            unconstrained: false,
        }
    }

    #[must_use]
    pub fn single(constraint: ScopeConstraint) -> Self {
        Self::from_constraints(vec![constraint])
    }

    /// An unconstrained scope: no row-level filtering.
    ///
    /// A legitimate authorization outcome (e.g. a `$public` action), not a
    /// bypass.
    #[must_use]
    pub fn allow_all() -> Self {
        Self {
            constraints: Vec::new(),
            unconstrained: true,
        }
    }

    #[must_use]
    pub fn deny_all() -> Self {
        Self {
            constraints: Vec::new(),
            unconstrained: false,
        }
    }

    /// Rows authored by the given user.
    #[must_use]
    pub fn for_author(id: Uuid) -> Self {
        Self::single(ScopeConstraint::new(vec![ScopeFilter::eq(
            scope_properties::AUTHOR_ID,
            id,
        )]))
    }

    /// Rows authored by any of the given users.
    #[must_use]
    pub fn for_authors(ids: Vec<Uuid>) -> Self {
        Self::single(ScopeConstraint::new(vec![ScopeFilter::r#in(
            scope_properties::AUTHOR_ID,
            ids,
        )]))
    }

    /// Rows with the given primary keys.
    #[must_use]
    pub fn for_resource_ids(ids: Vec<i64>) -> Self {
        Self::single(ScopeConstraint::new(vec![ScopeFilter::r#in(
            scope_properties::RESOURCE_ID,
            ids,
        )]))
    }

    /// Union of two scopes: a row passes if either side admits it.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        if self.unconstrained || other.unconstrained {
            return Self::allow_all();
        }
        let mut constraints = self.constraints;
        constraints.extend(other.constraints);
        Self::from_constraints(constraints)
    }

    #[inline]
    #[must_use]
    pub fn constraints(&self) -> &[ScopeConstraint] {
        &self.constraints
    }

    #[inline]
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.unconstrained
    }

    /// A scope is deny-all when it is not unconstrained and has no
    /// constraints.
    #[must_use]
    pub fn is_deny_all(&self) -> bool {
        !self.unconstrained && self.constraints.is_empty()
    }

    /// Check whether any constraint has a filter matching the given property
    /// and value.
    #[must_use]
    pub fn contains_value(&self, property: &str, value: &ScopeValue) -> bool {
        self.constraints.iter().any(|c| {
            c.filters()
                .iter()
                .any(|f| f.property() == property && f.values().contains(value))
        })
    }
}
