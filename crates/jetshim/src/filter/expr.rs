//! Predicate and sort-key compilation for snapshot filtering.
//!
//! Clauses are parsed with `sqlparser` using a small dialect that accepts the
//! engine's backtick and bracket identifier quoting, then compiled into a
//! tree whose column references are already resolved to row positions. Unknown
//! columns and unsupported constructs are rejected before any row is read.

use std::cmp::Ordering;

use regex::Regex;
use sqlparser::ast::{BinaryOperator, Expr, Ident, OrderByExpr, UnaryOperator, Value as SqlValue};
use sqlparser::dialect::Dialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token;

use crate::core::{ColumnDef, ColumnType, Row, Value};
use crate::error::{Result, ShimError};

type EvalResult<T> = std::result::Result<T, String>;

/// Identifier rules of the desktop engine: `` `name` `` and `[name]`.
#[derive(Debug, Default)]
pub(crate) struct JetDialect;

impl Dialect for JetDialect {
    fn is_delimited_identifier_start(&self, ch: char) -> bool {
        ch == '`' || ch == '['
    }

    fn is_identifier_start(&self, ch: char) -> bool {
        ch.is_alphabetic() || ch == '_'
    }

    fn is_identifier_part(&self, ch: char) -> bool {
        ch.is_alphanumeric() || ch == '_' || ch == '$'
    }
}

fn parser<'a>(dialect: &'a JetDialect, text: &str) -> Result<Parser<'a>> {
    Parser::new(dialect)
        .try_with_sql(text)
        .map_err(|e| ShimError::filter(text, e.to_string()))
}

fn expect_end(parser: &mut Parser<'_>, text: &str) -> Result<()> {
    let next = parser.peek_token().token;
    if next == Token::EOF {
        Ok(())
    } else {
        Err(ShimError::filter(text, format!("unexpected {}", next)))
    }
}

fn find_column(columns: &[ColumnDef], name: &str) -> Option<usize> {
    columns
        .iter()
        .position(|c| c.name.eq_ignore_ascii_case(name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CmpOp {
    fn holds(self, ord: Ordering) -> bool {
        match self {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::NotEq => ord != Ordering::Equal,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::LtEq => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::GtEq => ord != Ordering::Less,
        }
    }
}

#[derive(Debug)]
enum Node {
    Column(usize),
    Literal(Value),
    Neg(Box<Node>),
    Not(Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
    Compare(CmpOp, Box<Node>, Box<Node>),
    IsNull {
        expr: Box<Node>,
        negated: bool,
    },
    IsBool {
        expr: Box<Node>,
        value: bool,
        negated: bool,
    },
    InList {
        expr: Box<Node>,
        list: Vec<Node>,
        negated: bool,
    },
    Between {
        expr: Box<Node>,
        low: Box<Node>,
        high: Box<Node>,
        negated: bool,
    },
    Like {
        expr: Box<Node>,
        pattern: Regex,
        negated: bool,
    },
}

impl Node {
    /// Whether the node can only produce a boolean or NULL.
    fn is_boolean(&self, columns: &[ColumnDef]) -> bool {
        match self {
            Node::Column(i) => columns[*i].data_type == ColumnType::Bool,
            Node::Literal(v) => matches!(v, Value::Bool(_) | Value::Null),
            Node::Neg(_) => false,
            _ => true,
        }
    }

    fn eval(&self, row: &Row) -> EvalResult<Value> {
        match self {
            Node::Column(i) => Ok(row.get(*i).cloned().unwrap_or(Value::Null)),
            Node::Literal(v) => Ok(v.clone()),
            Node::Neg(inner) => match inner.eval(row)? {
                Value::Int(v) => v
                    .checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| format!("cannot negate {}", v)),
                Value::Float(v) => Ok(Value::Float(-v)),
                Value::Null => Ok(Value::Null),
                other => Err(format!("cannot negate {}", type_name(&other))),
            },
            Node::Not(inner) => Ok(from_truth(truth(inner.eval(row)?)?.map(|b| !b))),
            Node::And(left, right) => {
                let left = truth(left.eval(row)?)?;
                if left == Some(false) {
                    return Ok(Value::Bool(false));
                }
                let right = truth(right.eval(row)?)?;
                Ok(match (left, right) {
                    (_, Some(false)) => Value::Bool(false),
                    (Some(true), Some(true)) => Value::Bool(true),
                    _ => Value::Null,
                })
            }
            Node::Or(left, right) => {
                let left = truth(left.eval(row)?)?;
                if left == Some(true) {
                    return Ok(Value::Bool(true));
                }
                let right = truth(right.eval(row)?)?;
                Ok(match (left, right) {
                    (_, Some(true)) => Value::Bool(true),
                    (Some(false), Some(false)) => Value::Bool(false),
                    _ => Value::Null,
                })
            }
            Node::Compare(op, left, right) => {
                let ord = compare(&left.eval(row)?, &right.eval(row)?)?;
                Ok(from_truth(ord.map(|o| op.holds(o))))
            }
            Node::IsNull { expr, negated } => Ok(Value::Bool(expr.eval(row)?.is_null() != *negated)),
            Node::IsBool {
                expr,
                value,
                negated,
            } => {
                let actual = truth(expr.eval(row)?)?;
                Ok(Value::Bool((actual == Some(*value)) != *negated))
            }
            Node::InList {
                expr,
                list,
                negated,
            } => {
                let needle = expr.eval(row)?;
                if needle.is_null() {
                    return Ok(Value::Null);
                }
                let mut saw_null = false;
                for item in list {
                    match compare(&needle, &item.eval(row)?)? {
                        Some(Ordering::Equal) => return Ok(Value::Bool(!negated)),
                        None => saw_null = true,
                        Some(_) => {}
                    }
                }
                Ok(if saw_null {
                    Value::Null
                } else {
                    Value::Bool(*negated)
                })
            }
            Node::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let value = expr.eval(row)?;
                let above = compare(&value, &low.eval(row)?)?;
                let below = compare(&value, &high.eval(row)?)?;
                Ok(match (above, below) {
                    (Some(lo), Some(hi)) => {
                        let inside = lo != Ordering::Less && hi != Ordering::Greater;
                        Value::Bool(inside != *negated)
                    }
                    _ => Value::Null,
                })
            }
            Node::Like {
                expr,
                pattern,
                negated,
            } => match expr.eval(row)? {
                Value::Null => Ok(Value::Null),
                value => Ok(Value::Bool(pattern.is_match(&value.to_string()) != *negated)),
            },
        }
    }
}

fn truth(value: Value) -> EvalResult<Option<bool>> {
    match value {
        Value::Bool(b) => Ok(Some(b)),
        Value::Null => Ok(None),
        other => Err(format!("expected a boolean, found {}", type_name(&other))),
    }
}

fn from_truth(value: Option<bool>) -> Value {
    value.map(Value::Bool).unwrap_or(Value::Null)
}

fn type_name(value: &Value) -> &'static str {
    value.column_type().map(ColumnType::name).unwrap_or("NULL")
}

fn parse_number(text: &str) -> EvalResult<f64> {
    text.trim()
        .parse::<f64>()
        .map_err(|_| format!("cannot convert '{}' to a number", text))
}

fn parse_bool(text: &str) -> EvalResult<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Ok(true),
        "false" | "no" | "off" => Ok(false),
        _ => Err(format!("cannot convert '{}' to a boolean", text)),
    }
}

fn numeric(a: f64, b: f64) -> Option<Ordering> {
    a.partial_cmp(&b)
}

/// Compare two values. `None` when either side is NULL.
///
/// Text compares case-insensitively. Integers and floats compare numerically,
/// and text compared against a number is parsed as one.
fn compare(a: &Value, b: &Value) -> EvalResult<Option<Ordering>> {
    Ok(match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            numeric(a.as_f64().unwrap_or_default(), b.as_f64().unwrap_or_default())
        }
        (Value::Text(x), Value::Text(y)) => Some(x.to_lowercase().cmp(&y.to_lowercase())),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Text(t), Value::Int(_) | Value::Float(_)) => {
            numeric(parse_number(t)?, b.as_f64().unwrap_or_default())
        }
        (Value::Int(_) | Value::Float(_), Value::Text(t)) => {
            numeric(a.as_f64().unwrap_or_default(), parse_number(t)?)
        }
        (Value::Text(t), Value::Bool(y)) => Some(parse_bool(t)?.cmp(y)),
        (Value::Bool(x), Value::Text(t)) => Some(x.cmp(&parse_bool(t)?)),
        _ => {
            return Err(format!(
                "cannot compare {} with {}",
                type_name(a),
                type_name(b)
            ))
        }
    })
}

/// Translate a LIKE pattern (`%`/`*` any run, `_`/`?` one char) into a regex.
fn like_regex(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    let mut source = String::from("(?is)^");
    for c in pattern.chars() {
        match c {
            '%' | '*' => source.push_str(".*"),
            '_' | '?' => source.push('.'),
            other => source.push_str(&regex::escape(&other.to_string())),
        }
    }
    source.push('$');
    Regex::new(&source)
}

struct Compiler<'a> {
    text: &'a str,
    columns: &'a [ColumnDef],
}

impl Compiler<'_> {
    fn error(&self, message: impl Into<String>) -> ShimError {
        ShimError::filter(self.text, message)
    }

    fn column(&self, ident: &Ident) -> Result<usize> {
        find_column(self.columns, &ident.value)
            .ok_or_else(|| self.error(format!("unknown column '{}'", ident.value)))
    }

    fn identifier(&self, ident: &Ident) -> Result<Node> {
        if let Some(index) = find_column(self.columns, &ident.value) {
            return Ok(Node::Column(index));
        }
        // Bare TRUE / FALSE when the parser hands them over as words
        if ident.quote_style.is_none() {
            if ident.value.eq_ignore_ascii_case("true") {
                return Ok(Node::Literal(Value::Bool(true)));
            }
            if ident.value.eq_ignore_ascii_case("false") {
                return Ok(Node::Literal(Value::Bool(false)));
            }
        }
        Err(self.error(format!("unknown column '{}'", ident.value)))
    }

    fn literal(&self, value: &SqlValue) -> Result<Value> {
        match value {
            SqlValue::Number(n, _) => n
                .parse::<i64>()
                .map(Value::Int)
                .or_else(|_| n.parse::<f64>().map(Value::Float))
                .map_err(|_| self.error(format!("invalid number {}", n))),
            SqlValue::SingleQuotedString(s) | SqlValue::DoubleQuotedString(s) => {
                Ok(Value::Text(s.clone()))
            }
            SqlValue::Boolean(b) => Ok(Value::Bool(*b)),
            SqlValue::Null => Ok(Value::Null),
            other => Err(self.error(format!("unsupported literal {}", other))),
        }
    }

    fn boolean_operand(&self, expr: &Expr, operator: &str) -> Result<Box<Node>> {
        let node = self.compile(expr)?;
        if !node.is_boolean(self.columns) {
            return Err(self.error(format!("operand of {} is not a boolean: {}", operator, expr)));
        }
        Ok(Box::new(node))
    }

    fn compile(&self, expr: &Expr) -> Result<Node> {
        match expr {
            Expr::Identifier(ident) => self.identifier(ident),
            Expr::CompoundIdentifier(parts) => match parts.last() {
                Some(ident) => self.column(ident).map(Node::Column),
                None => Err(self.error("empty identifier")),
            },
            Expr::Value(value) => self.literal(value).map(Node::Literal),
            Expr::Nested(inner) => self.compile(inner),
            Expr::UnaryOp { op, expr: inner } => match op {
                UnaryOperator::Not => Ok(Node::Not(self.boolean_operand(inner, "NOT")?)),
                UnaryOperator::Minus => Ok(Node::Neg(Box::new(self.compile(inner)?))),
                UnaryOperator::Plus => self.compile(inner),
                other => Err(self.error(format!("unsupported operator {}", other))),
            },
            Expr::BinaryOp { left, op, right } => {
                let cmp = match op {
                    BinaryOperator::And => {
                        return Ok(Node::And(
                            self.boolean_operand(left, "AND")?,
                            self.boolean_operand(right, "AND")?,
                        ))
                    }
                    BinaryOperator::Or => {
                        return Ok(Node::Or(
                            self.boolean_operand(left, "OR")?,
                            self.boolean_operand(right, "OR")?,
                        ))
                    }
                    BinaryOperator::Eq => CmpOp::Eq,
                    BinaryOperator::NotEq => CmpOp::NotEq,
                    BinaryOperator::Lt => CmpOp::Lt,
                    BinaryOperator::LtEq => CmpOp::LtEq,
                    BinaryOperator::Gt => CmpOp::Gt,
                    BinaryOperator::GtEq => CmpOp::GtEq,
                    other => return Err(self.error(format!("unsupported operator {}", other))),
                };
                Ok(Node::Compare(
                    cmp,
                    Box::new(self.compile(left)?),
                    Box::new(self.compile(right)?),
                ))
            }
            Expr::IsNull(inner) => Ok(Node::IsNull {
                expr: Box::new(self.compile(inner)?),
                negated: false,
            }),
            Expr::IsNotNull(inner) => Ok(Node::IsNull {
                expr: Box::new(self.compile(inner)?),
                negated: true,
            }),
            Expr::IsTrue(inner) => self.is_bool(inner, true, false),
            Expr::IsNotTrue(inner) => self.is_bool(inner, true, true),
            Expr::IsFalse(inner) => self.is_bool(inner, false, false),
            Expr::IsNotFalse(inner) => self.is_bool(inner, false, true),
            Expr::InList {
                expr: inner,
                list,
                negated,
            } => Ok(Node::InList {
                expr: Box::new(self.compile(inner)?),
                list: list
                    .iter()
                    .map(|item| self.compile(item))
                    .collect::<Result<Vec<_>>>()?,
                negated: *negated,
            }),
            Expr::Between {
                expr: inner,
                negated,
                low,
                high,
            } => Ok(Node::Between {
                expr: Box::new(self.compile(inner)?),
                low: Box::new(self.compile(low)?),
                high: Box::new(self.compile(high)?),
                negated: *negated,
            }),
            Expr::Like {
                negated,
                expr: inner,
                pattern,
                ..
            }
            | Expr::ILike {
                negated,
                expr: inner,
                pattern,
                ..
            } => {
                let text = match pattern.as_ref() {
                    Expr::Value(SqlValue::SingleQuotedString(s))
                    | Expr::Value(SqlValue::DoubleQuotedString(s)) => s,
                    other => {
                        return Err(
                            self.error(format!("LIKE pattern must be a string literal: {}", other))
                        )
                    }
                };
                let regex = like_regex(text).map_err(|e| self.error(e.to_string()))?;
                Ok(Node::Like {
                    expr: Box::new(self.compile(inner)?),
                    pattern: regex,
                    negated: *negated,
                })
            }
            other => Err(self.error(format!("unsupported expression {}", other))),
        }
    }

    fn is_bool(&self, inner: &Expr, value: bool, negated: bool) -> Result<Node> {
        Ok(Node::IsBool {
            expr: self.boolean_operand(inner, "IS")?,
            value,
            negated,
        })
    }
}

/// A compiled `WHERE` predicate bound to one column layout.
#[derive(Debug)]
pub(crate) struct Predicate {
    text: String,
    root: Node,
}

impl Predicate {
    pub(crate) fn parse(text: &str, columns: &[ColumnDef]) -> Result<Self> {
        let dialect = JetDialect;
        let mut parser = parser(&dialect, text)?;
        let expr = parser
            .parse_expr()
            .map_err(|e| ShimError::filter(text, e.to_string()))?;
        expect_end(&mut parser, text)?;

        let compiler = Compiler { text, columns };
        let root = compiler.compile(&expr)?;
        if !root.is_boolean(columns) {
            return Err(ShimError::filter(text, "expression is not a boolean condition"));
        }

        Ok(Self {
            text: text.to_string(),
            root,
        })
    }

    /// Evaluate against one row. NULL counts as not matching.
    pub(crate) fn matches(&self, row: &Row) -> Result<bool> {
        let value = self
            .root
            .eval(row)
            .map_err(|message| ShimError::filter(&self.text, message))?;
        match value {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(ShimError::filter(
                &self.text,
                format!("expected a boolean, found {}", type_name(&other)),
            )),
        }
    }
}

/// One `ORDER BY` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SortKey {
    pub column: usize,
    pub descending: bool,
}

pub(crate) fn parse_sort_keys(text: &str, columns: &[ColumnDef]) -> Result<Vec<SortKey>> {
    let dialect = JetDialect;
    let mut parser = parser(&dialect, text)?;
    let exprs = parser
        .parse_comma_separated(Parser::parse_order_by_expr)
        .map_err(|e| ShimError::filter(text, e.to_string()))?;
    expect_end(&mut parser, text)?;

    let compiler = Compiler { text, columns };
    exprs
        .iter()
        .map(|OrderByExpr { expr, asc, .. }| {
            let column = match expr {
                Expr::Identifier(ident) => compiler.column(ident)?,
                Expr::CompoundIdentifier(parts) => match parts.last() {
                    Some(ident) => compiler.column(ident)?,
                    None => return Err(compiler.error("empty sort key")),
                },
                other => return Err(compiler.error(format!("sort key must be a column: {}", other))),
            };
            Ok(SortKey {
                column,
                descending: *asc == Some(false),
            })
        })
        .collect()
}

fn sort_order(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => compare(a, b).ok().flatten().unwrap_or(Ordering::Equal),
    }
}

/// Row ordering for a key list; NULLs first when ascending.
pub(crate) fn compare_rows(a: &Row, b: &Row, keys: &[SortKey]) -> Ordering {
    static NULL: Value = Value::Null;
    for key in keys {
        let left = a.get(key.column).unwrap_or(&NULL);
        let right = b.get(key.column).unwrap_or(&NULL);
        let ord = sort_order(left, right);
        let ord = if key.descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<ColumnDef> {
        vec![
            ColumnDef::new("NAME", ColumnType::Text, false),
            ColumnDef::new("SIZE", ColumnType::Int, true),
            ColumnDef::new("RATIO", ColumnType::Float, true),
            ColumnDef::new("ACTIVE", ColumnType::Bool, false),
        ]
    }

    fn row(name: &str, size: Option<i64>, ratio: Option<f64>, active: bool) -> Row {
        vec![name.into(), size.into(), ratio.into(), active.into()]
    }

    fn check(predicate: &str, row: &Row) -> bool {
        Predicate::parse(predicate, &columns())
            .unwrap()
            .matches(row)
            .unwrap()
    }

    #[test]
    fn test_comparisons_are_case_insensitive_for_text() {
        let r = row("Orders", Some(3), Some(0.5), true);
        assert!(check("NAME = 'orders'", &r));
        assert!(check("`name` <> 'Customers'", &r));
        assert!(check("[Name] > 'A'", &r));
        assert!(!check("NAME < 'a'", &r));
    }

    #[test]
    fn test_numeric_coercion() {
        let r = row("Orders", Some(3), Some(0.5), true);
        assert!(check("SIZE = 3.0", &r));
        assert!(check("RATIO < 1", &r));
        assert!(check("SIZE >= -1", &r));
        assert!(check("SIZE = '3'", &r));
    }

    #[test]
    fn test_boolean_logic_and_nulls() {
        let r = row("Orders", None, None, false);
        assert!(!check("SIZE = 3", &r));
        assert!(!check("NOT (SIZE = 3)", &r));
        assert!(check("SIZE IS NULL AND NOT ACTIVE", &r));
        assert!(check("SIZE = 3 OR NAME = 'ORDERS'", &r));
        assert!(check("ACTIVE = false", &r));
        assert!(check("ACTIVE IS NOT TRUE", &r));
    }

    #[test]
    fn test_in_between_like() {
        let r = row("Order Details", Some(7), Some(2.5), true);
        assert!(check("NAME IN ('Orders', 'order details')", &r));
        assert!(check("SIZE NOT IN (1, 2)", &r));
        assert!(check("SIZE BETWEEN 5 AND 7", &r));
        assert!(!check("RATIO NOT BETWEEN 2 AND 3", &r));
        assert!(check("NAME LIKE 'order%'", &r));
        assert!(check("NAME LIKE 'Order?Details'", &r));
        assert!(check("NAME NOT LIKE '%.%'", &r));
    }

    #[test]
    fn test_non_boolean_predicate_is_rejected() {
        let err = Predicate::parse("SIZE + 1", &columns()).unwrap_err();
        assert!(matches!(err, ShimError::Filter { .. }));
        let err = Predicate::parse("NAME", &columns()).unwrap_err();
        assert!(matches!(err, ShimError::Filter { .. }));
        let err = Predicate::parse("1 AND ACTIVE", &columns()).unwrap_err();
        assert!(matches!(err, ShimError::Filter { .. }));
    }

    #[test]
    fn test_malformed_predicate_is_rejected() {
        for text in ["NAME =", "NAME = 'x' garbage", "MISSING = 1", "(NAME = 'x'"] {
            let err = Predicate::parse(text, &columns()).unwrap_err();
            assert!(matches!(err, ShimError::Filter { .. }), "{text}");
        }
    }

    #[test]
    fn test_type_mismatch_is_filter_error() {
        let predicate = Predicate::parse("NAME = 5", &columns()).unwrap();
        let err = predicate
            .matches(&row("Orders", None, None, true))
            .unwrap_err();
        assert!(err.to_string().contains("cannot convert 'Orders'"));
    }

    #[test]
    fn test_sort_keys() {
        let keys = parse_sort_keys("`SIZE` DESC, name", &columns()).unwrap();
        assert_eq!(
            keys,
            vec![
                SortKey {
                    column: 1,
                    descending: true
                },
                SortKey {
                    column: 0,
                    descending: false
                },
            ]
        );
        assert!(parse_sort_keys("NOPE", &columns()).is_err());
        assert!(parse_sort_keys("SIZE + 1", &columns()).is_err());
    }

    #[test]
    fn test_nulls_sort_first_ascending() {
        let keys = [SortKey {
            column: 1,
            descending: false,
        }];
        let a = row("a", None, None, true);
        let b = row("b", Some(1), None, true);
        assert_eq!(compare_rows(&a, &b, &keys), Ordering::Less);
        assert_eq!(compare_rows(&b, &a, &keys), Ordering::Greater);
    }

    #[test]
    fn test_like_regex_escapes_metacharacters() {
        let re = like_regex("a.b%").unwrap();
        assert!(re.is_match("A.Bcd"));
        assert!(!re.is_match("axb"));
    }
}
