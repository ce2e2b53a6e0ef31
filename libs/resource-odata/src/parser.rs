//! Tokenizer and recursive-descent parser for the `$filter` grammar.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::ast::{CompareOp, FilterExpr, Literal};
use crate::error::QuerySyntaxError;

#[derive(Clone, Debug, PartialEq)]
enum Token {
    /// Identifier segment or keyword (`foo`, `$author`, `and`, `eq`, ...).
    Word(String),
    /// Single-quoted string literal, quotes stripped and `''` unescaped.
    Str(String),
    Number(Literal),
    LParen,
    RParen,
    Comma,
    Slash,
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn bump(&mut self, n: usize) {
        self.pos += n;
    }

    fn tokenize(mut self) -> Result<Vec<(Token, usize)>, QuerySyntaxError> {
        let mut out = Vec::new();
        loop {
            let ws = self
                .rest()
                .char_indices()
                .find(|(_, c)| !c.is_whitespace())
                .map_or(self.rest().len(), |(i, _)| i);
            self.bump(ws);

            let start = self.pos;
            let Some(c) = self.rest().chars().next() else {
                return Ok(out);
            };

            let token = match c {
                '(' => {
                    self.bump(1);
                    Token::LParen
                }
                ')' => {
                    self.bump(1);
                    Token::RParen
                }
                ',' => {
                    self.bump(1);
                    Token::Comma
                }
                '/' => {
                    self.bump(1);
                    Token::Slash
                }
                '\'' => self.lex_string()?,
                c if c.is_ascii_digit() || c == '-' || c == '+' => self.lex_number_or_date()?,
                c if c.is_alphabetic() || c == '_' || c == '$' => self.lex_word(),
                other => {
                    return Err(QuerySyntaxError::new(
                        format!("unexpected character '{other}'"),
                        start,
                    ));
                }
            };
            out.push((token, start));
        }
    }

    fn lex_word(&mut self) -> Token {
        let end = self
            .rest()
            .char_indices()
            .find(|&(_, c)| !(c.is_alphanumeric() || c == '_' || c == '$'))
            .map_or(self.rest().len(), |(i, _)| i);
        let word = &self.rest()[..end];
        self.bump(end);
        Token::Word(word.to_owned())
    }

    fn lex_string(&mut self) -> Result<Token, QuerySyntaxError> {
        let start = self.pos;
        self.bump(1); // opening quote
        let mut value = String::new();
        loop {
            let rest = self.rest();
            let Some(quote) = rest.find('\'') else {
                return Err(QuerySyntaxError::new("unterminated string literal", start));
            };
            value.push_str(&rest[..quote]);
            self.bump(quote + 1);
            // '' inside a string is an escaped quote
            if self.rest().starts_with('\'') {
                value.push('\'');
                self.bump(1);
            } else {
                return Ok(Token::Str(value));
            }
        }
    }

    /// Numbers and bare ISO-8601 datetimes share a first character, so both
    /// are lexed here: consume the maximal run of date/number characters and
    /// decide afterwards.
    fn lex_number_or_date(&mut self) -> Result<Token, QuerySyntaxError> {
        let start = self.pos;
        let end = self
            .rest()
            .char_indices()
            .find(|&(_, c)| {
                !(c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | ':' | 'T' | 'Z' | 'z'))
            })
            .map_or(self.rest().len(), |(i, _)| i);
        let raw = &self.rest()[..end];
        self.bump(end);

        if raw.contains('T') || raw.contains('t') {
            let parsed = OffsetDateTime::parse(raw, &Rfc3339).map_err(|_| {
                QuerySyntaxError::new(format!("invalid date literal '{raw}'"), start)
            })?;
            return Ok(Token::Number(Literal::Date(parsed)));
        }
        if let Ok(n) = raw.parse::<i64>() {
            return Ok(Token::Number(Literal::Integer(n)));
        }
        if let Ok(f) = raw.parse::<f64>() {
            return Ok(Token::Number(Literal::Float(f)));
        }
        Err(QuerySyntaxError::new(
            format!("invalid numeric literal '{raw}'"),
            start,
        ))
    }
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    input_len: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.input_len, |&(_, off)| off)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, expected: &Token, what: &str) -> Result<(), QuerySyntaxError> {
        let off = self.offset();
        match self.next() {
            Some(ref t) if t == expected => Ok(()),
            _ => Err(QuerySyntaxError::new(format!("expected {what}"), off)),
        }
    }

    fn parse_expr(&mut self) -> Result<FilterExpr, QuerySyntaxError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<FilterExpr, QuerySyntaxError> {
        let mut left = self.parse_and()?;
        while self.peek_keyword("or") {
            self.pos += 1;
            let right = self.parse_and()?;
            left = left.or(right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<FilterExpr, QuerySyntaxError> {
        let mut left = self.parse_unary()?;
        while self.peek_keyword("and") {
            self.pos += 1;
            let right = self.parse_unary()?;
            left = left.and(right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<FilterExpr, QuerySyntaxError> {
        if self.peek_keyword("not") {
            self.pos += 1;
            let inner = self.parse_unary()?;
            return Ok(FilterExpr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn peek_keyword(&self, kw: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w == kw)
    }

    fn parse_primary(&mut self) -> Result<FilterExpr, QuerySyntaxError> {
        if self.peek() == Some(&Token::LParen) {
            self.pos += 1;
            let inner = self.parse_expr()?;
            self.expect(&Token::RParen, "closing ')'")?;
            return Ok(inner);
        }
        if self.peek_keyword("contains") {
            self.pos += 1;
            self.expect(&Token::LParen, "'(' after contains")?;
            let path = self.parse_path()?;
            self.expect(&Token::Comma, "',' in contains()")?;
            let needle = self.parse_string_literal()?;
            self.expect(&Token::RParen, "closing ')'")?;
            return Ok(FilterExpr::Contains { path, needle });
        }
        // Legacy OData v2 spelling with swapped arguments.
        if self.peek_keyword("substringof") {
            self.pos += 1;
            self.expect(&Token::LParen, "'(' after substringof")?;
            let needle = self.parse_string_literal()?;
            self.expect(&Token::Comma, "',' in substringof()")?;
            let path = self.parse_path()?;
            self.expect(&Token::RParen, "closing ')'")?;
            return Ok(FilterExpr::Contains { path, needle });
        }

        let path = self.parse_path()?;
        let off = self.offset();
        let op = match self.next() {
            Some(Token::Word(ref w)) => CompareOp::from_keyword(w)
                .ok_or_else(|| QuerySyntaxError::new(format!("unknown operator '{w}'"), off))?,
            _ => return Err(QuerySyntaxError::new("expected comparison operator", off)),
        };
        let value = self.parse_literal()?;
        Ok(FilterExpr::Compare { path, op, value })
    }

    fn parse_path(&mut self) -> Result<String, QuerySyntaxError> {
        let off = self.offset();
        let mut path = match self.next() {
            Some(Token::Word(w)) => w,
            _ => return Err(QuerySyntaxError::new("expected property path", off)),
        };
        while self.peek() == Some(&Token::Slash) {
            self.pos += 1;
            let off = self.offset();
            match self.next() {
                Some(Token::Word(w)) => {
                    path.push('/');
                    path.push_str(&w);
                }
                _ => return Err(QuerySyntaxError::new("expected path segment after '/'", off)),
            }
        }
        Ok(path)
    }

    fn parse_string_literal(&mut self) -> Result<String, QuerySyntaxError> {
        let off = self.offset();
        match self.next() {
            Some(Token::Str(s)) => Ok(s),
            _ => Err(QuerySyntaxError::new("expected string literal", off)),
        }
    }

    fn parse_literal(&mut self) -> Result<Literal, QuerySyntaxError> {
        let off = self.offset();
        match self.next() {
            Some(Token::Str(s)) => Ok(Literal::String(s)),
            Some(Token::Number(lit)) => Ok(lit),
            Some(Token::Word(w)) => match w.as_str() {
                "true" => Ok(Literal::Bool(true)),
                "false" => Ok(Literal::Bool(false)),
                "null" => Ok(Literal::Null),
                other => Err(QuerySyntaxError::new(
                    format!("expected literal, found '{other}'"),
                    off,
                )),
            },
            _ => Err(QuerySyntaxError::new("expected literal", off)),
        }
    }
}

/// Parse a `$filter` string into an AST.
///
/// # Errors
/// Returns [`QuerySyntaxError`] on any lexical or grammatical failure,
/// including trailing tokens after a complete expression.
pub fn parse_filter(input: &str) -> Result<FilterExpr, QuerySyntaxError> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        input_len: input.len(),
    };
    let expr = parser.parse_expr()?;
    if parser.peek().is_some() {
        return Err(QuerySyntaxError::new(
            "unexpected trailing input",
            parser.offset(),
        ));
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compare(path: &str, op: CompareOp, value: Literal) -> FilterExpr {
        FilterExpr::Compare {
            path: path.to_owned(),
            op,
            value,
        }
    }

    #[test]
    fn parses_string_equality() {
        let expr = parse_filter("foo eq 'bar'").unwrap();
        assert_eq!(
            expr,
            compare("foo", CompareOp::Eq, Literal::String("bar".to_owned()))
        );
    }

    #[test]
    fn parses_escaped_quote() {
        let expr = parse_filter("foo eq 'it''s'").unwrap();
        assert_eq!(
            expr,
            compare("foo", CompareOp::Eq, Literal::String("it's".to_owned()))
        );
    }

    #[test]
    fn parses_numeric_comparisons() {
        assert_eq!(
            parse_filter("age ge 18").unwrap(),
            compare("age", CompareOp::Ge, Literal::Integer(18))
        );
        assert_eq!(
            parse_filter("score lt 2.5").unwrap(),
            compare("score", CompareOp::Lt, Literal::Float(2.5))
        );
        assert_eq!(
            parse_filter("delta gt -3").unwrap(),
            compare("delta", CompareOp::Gt, Literal::Integer(-3))
        );
    }

    #[test]
    fn parses_bool_and_null() {
        assert_eq!(
            parse_filter("done eq true").unwrap(),
            compare("done", CompareOp::Eq, Literal::Bool(true))
        );
        assert_eq!(
            parse_filter("owner ne null").unwrap(),
            compare("owner", CompareOp::Ne, Literal::Null)
        );
    }

    #[test]
    fn parses_date_literal() {
        let expr = parse_filter("$created gt 2023-01-02T03:04:05Z").unwrap();
        match expr {
            FilterExpr::Compare {
                ref path,
                op: CompareOp::Gt,
                value: Literal::Date(d),
            } => {
                assert_eq!(path, "$created");
                assert_eq!(d.year(), 2023);
                assert_eq!(d.second(), 5);
            }
            other => panic!("unexpected AST: {other:?}"),
        }
    }

    #[test]
    fn parses_author_path() {
        let expr = parse_filter("$author/id eq 'u1'").unwrap();
        assert_eq!(
            expr,
            compare(
                "$author/id",
                CompareOp::Eq,
                Literal::String("u1".to_owned())
            )
        );
    }

    #[test]
    fn parses_boolean_combinators_with_precedence() {
        // a or b and c == a or (b and c)
        let expr = parse_filter("a eq 1 or b eq 2 and c eq 3").unwrap();
        match expr {
            FilterExpr::Or(left, right) => {
                assert_eq!(*left, compare("a", CompareOp::Eq, Literal::Integer(1)));
                assert!(matches!(*right, FilterExpr::And(_, _)));
            }
            other => panic!("unexpected AST: {other:?}"),
        }
    }

    #[test]
    fn parses_not_and_parens() {
        let expr = parse_filter("not (foo eq 'x')").unwrap();
        assert!(matches!(expr, FilterExpr::Not(_)));
    }

    #[test]
    fn parses_contains_and_legacy_substringof() {
        let a = parse_filter("contains(name, 'li')").unwrap();
        let b = parse_filter("substringof('li', name)").unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a,
            FilterExpr::Contains {
                path: "name".to_owned(),
                needle: "li".to_owned(),
            }
        );
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse_filter("foo eq").is_err());
        assert!(parse_filter("foo banana 3").is_err());
        assert!(parse_filter("(foo eq 1").is_err());
        assert!(parse_filter("foo eq 'unterminated").is_err());
        assert!(parse_filter("foo eq 1 bar").is_err());
        assert!(parse_filter("").is_err());
    }

    #[test]
    fn error_carries_offset() {
        let err = parse_filter("foo banana 3").unwrap_err();
        assert_eq!(err.position, 4);
    }
}
