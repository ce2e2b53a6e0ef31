//! Translation of parsed queries and access scopes into `SeaORM` conditions
//! over the resource table.
//!
//! Reserved paths map to real columns; anything else becomes a
//! `json_extract` over the `data` document, so missing properties compare
//! as SQL `NULL`.

use std::collections::BTreeSet;

use resource_odata::{CompareOp, FilterExpr, Literal, OrderBy, SortDir};
use resource_security::{AccessScope, ScopeConstraint, ScopeFilter, ScopeValue, scope_properties};
use sea_orm::sea_query::{Expr, LikeExpr, Order, SimpleExpr};
use sea_orm::{Condition, QueryOrder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::entity::resource;

/// Rows of one type within one app.
pub fn base_condition(app_id: Uuid, type_name: &str) -> Condition {
    Condition::all()
        .add(Expr::col(resource::Column::AppId).eq(app_id))
        .add(Expr::col(resource::Column::ResourceType).eq(type_name))
}

/// The implicit liveness predicate of every read.
pub fn expiration_condition(now: OffsetDateTime) -> Condition {
    Condition::any()
        .add(Expr::col(resource::Column::ExpiresAt).is_null())
        .add(Expr::col(resource::Column::ExpiresAt).gt(now))
}

/// `$team` narrowing: rows authored by one of the given users.
pub fn team_condition(author_ids: &BTreeSet<Uuid>) -> Condition {
    Condition::all().add(
        Expr::col(resource::Column::AuthorId).is_in(author_ids.iter().copied()),
    )
}

fn path_expr(path: &str) -> SimpleExpr {
    match path {
        "$created" => Expr::col(resource::Column::CreatedAt).into(),
        "$updated" => Expr::col(resource::Column::UpdatedAt).into(),
        "$expires" => Expr::col(resource::Column::ExpiresAt).into(),
        "$author" | "$author/id" => Expr::col(resource::Column::AuthorId).into(),
        "id" => Expr::col(resource::Column::Id).into(),
        other => {
            let json_path = format!("$.{}", other.replace('/', "."));
            Expr::cust_with_values(r#"json_extract("data", ?)"#, [json_path])
        }
    }
}

fn literal_value(literal: &Literal) -> sea_orm::Value {
    match literal {
        Literal::Integer(n) => (*n).into(),
        Literal::Float(f) => (*f).into(),
        Literal::String(s) => s.clone().into(),
        Literal::Bool(b) => (*b).into(),
        Literal::Date(d) => (*d).into(),
        // Null never reaches value binding; it is handled structurally.
        Literal::Null => sea_orm::Value::Int(None),
    }
}

/// Compile a filter AST into a condition.
pub fn filter_condition(expr: &FilterExpr) -> Condition {
    match expr {
        FilterExpr::Compare { path, op, value } => compare_condition(path, *op, value),
        FilterExpr::Contains { path, needle } => contains_condition(path, needle),
        FilterExpr::And(a, b) => Condition::all()
            .add(filter_condition(a))
            .add(filter_condition(b)),
        FilterExpr::Or(a, b) => Condition::any()
            .add(filter_condition(a))
            .add(filter_condition(b)),
        FilterExpr::Not(inner) => Condition::all().not().add(filter_condition(inner)),
    }
}

fn compare_condition(path: &str, op: CompareOp, value: &Literal) -> Condition {
    if value.is_null() {
        return match op {
            CompareOp::Eq => Condition::all().add(Expr::expr(path_expr(path)).is_null()),
            CompareOp::Ne => Condition::all().add(Expr::expr(path_expr(path)).is_not_null()),
            // Ordering against null matches nothing.
            _ => deny_all(),
        };
    }

    let v = literal_value(value);
    match op {
        CompareOp::Eq => Condition::all().add(Expr::expr(path_expr(path)).eq(v)),
        // A missing property also counts as "not equal".
        CompareOp::Ne => Condition::any()
            .add(Expr::expr(path_expr(path)).ne(v))
            .add(Expr::expr(path_expr(path)).is_null()),
        CompareOp::Lt => Condition::all().add(Expr::expr(path_expr(path)).lt(v)),
        CompareOp::Le => Condition::all().add(Expr::expr(path_expr(path)).lte(v)),
        CompareOp::Gt => Condition::all().add(Expr::expr(path_expr(path)).gt(v)),
        CompareOp::Ge => Condition::all().add(Expr::expr(path_expr(path)).gte(v)),
    }
}

fn contains_condition(path: &str, needle: &str) -> Condition {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    let pattern = LikeExpr::new(format!("%{escaped}%")).escape('\\');
    Condition::all().add(Expr::expr(path_expr(path)).like(pattern))
}

/// Apply `$orderby` terms (primary key ascending when absent).
pub fn apply_order<Q: QueryOrder>(mut query: Q, order: &[OrderBy]) -> Q {
    if order.is_empty() {
        return query.order_by(resource::Column::Id, Order::Asc);
    }
    for term in order {
        let dir = match term.dir {
            SortDir::Asc => Order::Asc,
            SortDir::Desc => Order::Desc,
        };
        query = query.order_by(path_expr(&term.path), dir);
    }
    query
}

fn deny_all() -> Condition {
    Condition::all().add(Expr::value(false))
}

fn scope_value_to_sea_value(v: &ScopeValue) -> sea_orm::Value {
    match v {
        ScopeValue::Uuid(u) => (*u).into(),
        ScopeValue::String(s) => s.clone().into(),
        ScopeValue::Int(n) => (*n).into(),
        ScopeValue::Bool(b) => (*b).into(),
    }
}

fn resolve_scope_property(property: &str) -> Option<resource::Column> {
    match property {
        p if p == scope_properties::AUTHOR_ID => Some(resource::Column::AuthorId),
        p if p == scope_properties::RESOURCE_ID => Some(resource::Column::Id),
        _ => None,
    }
}

/// Compile an [`AccessScope`] into a row condition.
///
/// Constraints are OR-ed, filters within one AND-ed. Unknown properties fail
/// their constraint; a scope whose constraints all fail compiles to
/// `WHERE false` (fail-closed), as does an explicit deny-all.
pub fn scope_condition(scope: &AccessScope) -> Condition {
    if scope.is_unconstrained() {
        return Condition::all();
    }
    if scope.is_deny_all() {
        return deny_all();
    }

    let compiled: Vec<Condition> = scope
        .constraints()
        .iter()
        .filter_map(constraint_condition)
        .collect();

    match compiled.len() {
        0 => deny_all(),
        1 => compiled.into_iter().next().unwrap_or_else(deny_all),
        _ => {
            let mut any = Condition::any();
            for c in compiled {
                any = any.add(c);
            }
            any
        }
    }
}

fn constraint_condition(constraint: &ScopeConstraint) -> Option<Condition> {
    if constraint.is_empty() {
        return Some(Condition::all());
    }
    let mut all = Condition::all();
    for filter in constraint.filters() {
        let col = resolve_scope_property(filter.property())?;
        match filter {
            ScopeFilter::Eq(_) => {
                let value = scope_value_to_sea_value(&filter.values()[0]);
                all = all.add(Expr::col(col).eq(value));
            }
            ScopeFilter::In(_) => {
                let values: Vec<sea_orm::Value> =
                    filter.values().iter().map(scope_value_to_sea_value).collect();
                all = all.add(Expr::col(col).is_in(values));
            }
        }
    }
    Some(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use resource_odata::parse_filter;

    fn debug_of(cond: &Condition) -> String {
        format!("{cond:?}")
    }

    #[test]
    fn reserved_paths_map_to_columns() {
        let cond = filter_condition(&parse_filter("$created gt 2024-01-01T00:00:00Z").unwrap());
        let repr = debug_of(&cond);
        assert!(repr.contains("created_at"), "{repr}");
        assert!(!repr.contains("json_extract"), "{repr}");

        let cond = filter_condition(&parse_filter("$author/id eq 'x'").unwrap());
        assert!(debug_of(&cond).contains("author_id"));
    }

    #[test]
    fn data_properties_go_through_json_extract() {
        let cond = filter_condition(&parse_filter("foo eq 'bar'").unwrap());
        let repr = debug_of(&cond);
        assert!(repr.contains("json_extract"), "{repr}");
        assert!(repr.contains("$.foo"), "{repr}");

        // Nested segments become dotted JSON paths.
        let cond = filter_condition(&parse_filter("foo/bar eq 1").unwrap());
        assert!(debug_of(&cond).contains("$.foo.bar"));
    }

    #[test]
    fn null_comparisons_become_is_null_checks() {
        let eq = debug_of(&filter_condition(&parse_filter("foo eq null").unwrap()));
        assert!(eq.contains("IsNull") || eq.contains("is_null") || eq.contains("Null"), "{eq}");

        let lt = debug_of(&filter_condition(&parse_filter("foo lt null").unwrap()));
        assert!(lt.contains("Value(Bool(Some(false)))"), "{lt}");
    }

    #[test]
    fn ne_also_matches_missing_properties() {
        let cond = filter_condition(&parse_filter("foo ne 'bar'").unwrap());
        let repr = debug_of(&cond);
        // OR of != and IS NULL.
        assert!(repr.contains("Any"), "{repr}");
    }

    #[test]
    fn contains_escapes_like_metacharacters() {
        let cond = filter_condition(&parse_filter("contains(name, '10%_done')").unwrap());
        let repr = debug_of(&cond);
        // Debug-escaping doubles the backslashes.
        assert!(repr.contains(r"%10\\%\\_done%"), "{repr}");
    }

    #[test]
    fn unconstrained_scope_is_no_filter() {
        let cond = scope_condition(&AccessScope::allow_all());
        assert!(!debug_of(&cond).contains("Value(Bool(Some(false)))"));
    }

    #[test]
    fn deny_all_scope_is_where_false() {
        let cond = scope_condition(&AccessScope::deny_all());
        assert!(debug_of(&cond).contains("Value(Bool(Some(false)))"));
    }

    #[test]
    fn author_scope_filters_on_author_column() {
        let cond = scope_condition(&AccessScope::for_author(Uuid::from_u128(1)));
        let repr = debug_of(&cond);
        assert!(repr.contains("author_id"), "{repr}");
        assert!(!repr.contains("Value(Bool(Some(false)))"), "{repr}");
    }

    #[test]
    fn unknown_scope_property_fails_closed() {
        let scope = AccessScope::single(ScopeConstraint::new(vec![ScopeFilter::eq(
            "tenant_id",
            "nope",
        )]));
        let cond = scope_condition(&scope);
        assert!(debug_of(&cond).contains("Value(Bool(Some(false)))"));
    }
}
