use time::OffsetDateTime;

/// A literal value appearing on the right-hand side of a comparison.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Date(OffsetDateTime),
}

impl Literal {
    /// Whether this literal is `null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

/// Binary comparison operators of the `$filter` grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Parse an operator keyword (`eq`, `ne`, ...).
    #[must_use]
    pub fn from_keyword(kw: &str) -> Option<Self> {
        match kw {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "lt" => Some(Self::Lt),
            "le" => Some(Self::Le),
            "gt" => Some(Self::Gt),
            "ge" => Some(Self::Ge),
            _ => None,
        }
    }
}

/// Parsed `$filter` expression tree.
///
/// Property paths are kept verbatim (`foo`, `$author/id`, ...); resolving
/// them to storage columns or JSON paths is the translator's concern.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterExpr {
    /// `path op literal`
    Compare {
        path: String,
        op: CompareOp,
        value: Literal,
    },
    /// `contains(path, 'needle')` — also produced by the legacy
    /// `substringof('needle', path)` spelling.
    Contains { path: String, needle: String },
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
    Not(Box<FilterExpr>),
}

impl FilterExpr {
    pub fn and(self, other: FilterExpr) -> FilterExpr {
        FilterExpr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: FilterExpr) -> FilterExpr {
        FilterExpr::Or(Box::new(self), Box::new(other))
    }
}
