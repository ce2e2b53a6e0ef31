//! Parsed form of the full query-parameter surface.

use crate::ast::FilterExpr;
use crate::error::QuerySyntaxError;
use crate::parser::parse_filter;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

/// One `$orderby` term: a property path plus direction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub path: String,
    pub dir: SortDir,
}

/// The parsed query surface of a resource listing request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceQuery {
    pub filter: Option<FilterExpr>,
    pub order: Vec<OrderBy>,
    pub select: Vec<String>,
    pub top: Option<u64>,
}

impl ResourceQuery {
    /// Parse the raw query parameters as they arrive off the wire.
    ///
    /// `$select` is forgiving (unknown properties are dropped later, at
    /// projection time); `$filter`, `$orderby` and `$top` are strict.
    ///
    /// # Errors
    /// Returns [`QuerySyntaxError`] when any strict parameter is malformed.
    pub fn from_params(
        filter: Option<&str>,
        orderby: Option<&str>,
        select: Option<&str>,
        top: Option<&str>,
    ) -> Result<Self, QuerySyntaxError> {
        let filter = filter.map(parse_filter).transpose()?;
        let order = orderby.map_or_else(|| Ok(Vec::new()), parse_orderby)?;
        let select = select.map_or_else(Vec::new, |s| {
            s.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_owned)
                .collect()
        });
        let top = top
            .map(|raw| {
                raw.trim().parse::<u64>().map_err(|_| {
                    QuerySyntaxError::new(format!("invalid $top value '{raw}'"), 0)
                })
            })
            .transpose()?;
        Ok(Self {
            filter,
            order,
            select,
            top,
        })
    }
}

fn parse_orderby(raw: &str) -> Result<Vec<OrderBy>, QuerySyntaxError> {
    let mut out = Vec::new();
    for term in raw.split(',') {
        let term = term.trim();
        if term.is_empty() {
            return Err(QuerySyntaxError::new("empty $orderby term", 0));
        }
        let mut parts = term.split_whitespace();
        let path = parts
            .next()
            .ok_or_else(|| QuerySyntaxError::new("empty $orderby term", 0))?
            .to_owned();
        let dir = match parts.next() {
            None => SortDir::Asc,
            Some("asc") => SortDir::Asc,
            Some("desc") => SortDir::Desc,
            Some(other) => {
                return Err(QuerySyntaxError::new(
                    format!("invalid sort direction '{other}'"),
                    0,
                ));
            }
        };
        if parts.next().is_some() {
            return Err(QuerySyntaxError::new(
                format!("malformed $orderby term '{term}'"),
                0,
            ));
        }
        out.push(OrderBy { path, dir });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CompareOp, Literal};

    #[test]
    fn parses_full_parameter_set() {
        let q = ResourceQuery::from_params(
            Some("age ge 18"),
            Some("name desc, age"),
            Some("name, age"),
            Some("25"),
        )
        .unwrap();

        assert!(matches!(
            q.filter,
            Some(FilterExpr::Compare {
                op: CompareOp::Ge,
                value: Literal::Integer(18),
                ..
            })
        ));
        assert_eq!(
            q.order,
            vec![
                OrderBy {
                    path: "name".to_owned(),
                    dir: SortDir::Desc,
                },
                OrderBy {
                    path: "age".to_owned(),
                    dir: SortDir::Asc,
                },
            ]
        );
        assert_eq!(q.select, vec!["name", "age"]);
        assert_eq!(q.top, Some(25));
    }

    #[test]
    fn defaults_when_absent() {
        let q = ResourceQuery::from_params(None, None, None, None).unwrap();
        assert_eq!(q, ResourceQuery::default());
    }

    #[test]
    fn rejects_bad_top_and_orderby() {
        assert!(ResourceQuery::from_params(None, None, None, Some("lots")).is_err());
        assert!(ResourceQuery::from_params(None, None, None, Some("-1")).is_err());
        assert!(ResourceQuery::from_params(None, Some("name sideways"), None, None).is_err());
        assert!(ResourceQuery::from_params(None, Some("name desc extra"), None, None).is_err());
    }
}
