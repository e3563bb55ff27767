//! Composable SQL expressions used for projections and filter chains.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use super::dialect::Dialect;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Literal {
    /// Converts a JSON filter value into a literal. Arrays and objects are
    /// not scalar and are passed through as their JSON text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Literal::Null,
            Value::Bool(b) => Literal::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Literal::Int(i),
                None => n.as_f64().map(Literal::Float).unwrap_or(Literal::Null),
            },
            Value::String(s) => Literal::String(s.clone()),
            other => Literal::String(other.to_string()),
        }
    }

    fn to_sql(&self, dialect: Dialect) -> String {
        match self {
            Literal::Null => "NULL".to_string(),
            Literal::Bool(true) => "TRUE".to_string(),
            Literal::Bool(false) => "FALSE".to_string(),
            Literal::Int(i) => i.to_string(),
            Literal::Float(f) if f.is_finite() => {
                let text = f.to_string();
                if text.contains(['.', 'e', 'E']) {
                    text
                } else {
                    format!("{}.0", text)
                }
            }
            Literal::Float(_) => "NULL".to_string(),
            Literal::String(s) => dialect.quote_string(s),
            Literal::Date(d) => format!("DATE '{}'", d.format("%Y-%m-%d")),
            Literal::Timestamp(ts) => format!("TIMESTAMP '{}'", ts.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Like,
}

impl BinaryOp {
    fn as_sql(self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Like => "LIKE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(String),
    Wildcard,
    Literal(Literal),
    /// Backend random number in `[0, 1)`.
    Random,
    Function {
        name: String,
        args: Vec<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    Alias {
        expr: Box<Expr>,
        alias: String,
    },
}

pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(name.into())
}

pub fn lit(value: impl Into<Literal>) -> Expr {
    Expr::Literal(value.into())
}

pub fn func(name: impl Into<String>, args: Vec<Expr>) -> Expr {
    Expr::Function {
        name: name.into(),
        args,
    }
}

pub fn count_star() -> Expr {
    func("COUNT", vec![Expr::Wildcard])
}

impl Expr {
    fn binary(self, op: BinaryOp, right: Expr) -> Expr {
        Expr::Binary {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    pub fn eq(self, right: Expr) -> Expr {
        self.binary(BinaryOp::Eq, right)
    }

    pub fn neq(self, right: Expr) -> Expr {
        self.binary(BinaryOp::NotEq, right)
    }

    pub fn lt(self, right: Expr) -> Expr {
        self.binary(BinaryOp::Lt, right)
    }

    pub fn lt_eq(self, right: Expr) -> Expr {
        self.binary(BinaryOp::LtEq, right)
    }

    pub fn gt(self, right: Expr) -> Expr {
        self.binary(BinaryOp::Gt, right)
    }

    pub fn gt_eq(self, right: Expr) -> Expr {
        self.binary(BinaryOp::GtEq, right)
    }

    pub fn multiply(self, right: Expr) -> Expr {
        self.binary(BinaryOp::Multiply, right)
    }

    pub fn modulo(self, right: Expr) -> Expr {
        self.binary(BinaryOp::Modulo, right)
    }

    pub fn like(self, pattern: Expr) -> Expr {
        self.binary(BinaryOp::Like, pattern)
    }

    pub fn is_in(self, list: Vec<Expr>) -> Expr {
        Expr::InList {
            expr: Box::new(self),
            list,
            negated: false,
        }
    }

    pub fn is_not_in(self, list: Vec<Expr>) -> Expr {
        Expr::InList {
            expr: Box::new(self),
            list,
            negated: true,
        }
    }

    pub fn between(self, low: Expr, high: Expr) -> Expr {
        Expr::Between {
            expr: Box::new(self),
            low: Box::new(low),
            high: Box::new(high),
        }
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    pub fn is_not_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self),
            negated: true,
        }
    }

    pub fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }

    pub fn alias(self, alias: impl Into<String>) -> Expr {
        Expr::Alias {
            expr: Box::new(self),
            alias: alias.into(),
        }
    }

    /// ANDs two expressions, flattening nested conjunctions.
    pub fn and(self, other: Expr) -> Expr {
        let mut terms = match self {
            Expr::And(terms) => terms,
            expr => vec![expr],
        };
        match other {
            Expr::And(more) => terms.extend(more),
            expr => terms.push(expr),
        }
        Expr::And(terms)
    }

    pub fn or(self, other: Expr) -> Expr {
        let mut terms = match self {
            Expr::Or(terms) => terms,
            expr => vec![expr],
        };
        match other {
            Expr::Or(more) => terms.extend(more),
            expr => terms.push(expr),
        }
        Expr::Or(terms)
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        match self {
            Expr::Column(name) => dialect.quote_ident(name),
            Expr::Wildcard => "*".to_string(),
            Expr::Literal(literal) => literal.to_sql(dialect),
            Expr::Random => dialect.random_function(),
            Expr::Function { name, args } => {
                let args: Vec<String> = args.iter().map(|a| a.to_sql(dialect)).collect();
                format!("{}({})", name, args.join(", "))
            }
            Expr::Binary { left, op, right } => format!(
                "({} {} {})",
                left.to_sql(dialect),
                op.as_sql(),
                right.to_sql(dialect)
            ),
            Expr::And(terms) => join_terms(terms, " AND ", "TRUE", dialect),
            Expr::Or(terms) => join_terms(terms, " OR ", "FALSE", dialect),
            Expr::Not(expr) => format!("(NOT {})", expr.to_sql(dialect)),
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                let items: Vec<String> = list.iter().map(|e| e.to_sql(dialect)).collect();
                format!(
                    "({} {}IN ({}))",
                    expr.to_sql(dialect),
                    if *negated { "NOT " } else { "" },
                    items.join(", ")
                )
            }
            Expr::Between { expr, low, high } => format!(
                "({} BETWEEN {} AND {})",
                expr.to_sql(dialect),
                low.to_sql(dialect),
                high.to_sql(dialect)
            ),
            Expr::IsNull { expr, negated } => format!(
                "({} IS {}NULL)",
                expr.to_sql(dialect),
                if *negated { "NOT " } else { "" }
            ),
            Expr::Alias { expr, alias } => {
                format!("{} AS {}", expr.to_sql(dialect), dialect.quote_ident(alias))
            }
        }
    }
}

fn join_terms(terms: &[Expr], separator: &str, empty: &str, dialect: Dialect) -> String {
    match terms {
        [] => empty.to_string(),
        [single] => single.to_sql(dialect),
        _ => {
            let rendered: Vec<String> = terms.iter().map(|t| t.to_sql(dialect)).collect();
            format!("({})", rendered.join(separator))
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Int(value as i64)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl From<NaiveDate> for Literal {
    fn from(value: NaiveDate) -> Self {
        Literal::Date(value)
    }
}

impl From<NaiveDateTime> for Literal {
    fn from(value: NaiveDateTime) -> Self {
        Literal::Timestamp(value)
    }
}
