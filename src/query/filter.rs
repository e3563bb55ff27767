//! Keyword-style filters supplied by the profiling engine, translated into
//! predicates the runner ANDs into its filter chain.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::expr::{col, Expr, Literal};
use super::select::OrderBy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    NotIn,
    Like,
    IsNull,
    IsNotNull,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub column: String,
    pub op: FilterOp,
    #[serde(default)]
    pub value: Value,
}

impl FilterCondition {
    pub fn new(column: impl Into<String>, op: FilterOp, value: Value) -> Self {
        Self {
            column: column.into(),
            op,
            value,
        }
    }

    fn to_expr(&self) -> Expr {
        let column = col(self.column.as_str());
        let scalar = || Expr::Literal(Literal::from_json(&self.value));
        let list = || -> Vec<Expr> {
            match &self.value {
                Value::Array(items) => items
                    .iter()
                    .map(|v| Expr::Literal(Literal::from_json(v)))
                    .collect(),
                other => vec![Expr::Literal(Literal::from_json(other))],
            }
        };
        match self.op {
            FilterOp::Eq => column.eq(scalar()),
            FilterOp::Ne => column.neq(scalar()),
            FilterOp::Gt => column.gt(scalar()),
            FilterOp::Ge => column.gt_eq(scalar()),
            FilterOp::Lt => column.lt(scalar()),
            FilterOp::Le => column.lt_eq(scalar()),
            FilterOp::In => column.is_in(list()),
            FilterOp::NotIn => column.is_not_in(list()),
            FilterOp::Like => column.like(scalar()),
            FilterOp::IsNull => column.is_null(),
            FilterOp::IsNotNull => column.is_not_null(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QueryFilter {
    #[serde(default)]
    pub filters: Vec<FilterCondition>,
    /// Combine conditions with OR instead of AND.
    #[serde(default)]
    pub or_filter: bool,
}

impl QueryFilter {
    pub fn all(filters: Vec<FilterCondition>) -> Self {
        Self {
            filters,
            or_filter: false,
        }
    }

    pub fn any(filters: Vec<FilterCondition>) -> Self {
        Self {
            filters,
            or_filter: true,
        }
    }

    /// `None` when no condition is set.
    pub fn to_expr(&self) -> Option<Expr> {
        let mut exprs = self.filters.iter().map(FilterCondition::to_expr);
        let first = exprs.next()?;
        Some(exprs.fold(first, |acc, expr| {
            if self.or_filter {
                acc.or(expr)
            } else {
                acc.and(expr)
            }
        }))
    }
}

/// Extra arguments accompanying the projected entities of a fetch.
#[derive(Debug, Clone, Default)]
pub struct QueryArgs {
    pub filter: Option<QueryFilter>,
    pub group_by: Vec<Expr>,
    pub order_by: Vec<OrderBy>,
}

impl QueryArgs {
    pub fn with_filter(filter: QueryFilter) -> Self {
        Self {
            filter: Some(filter),
            ..Default::default()
        }
    }

    pub fn filter_expr(&self) -> Option<Expr> {
        self.filter.as_ref().and_then(QueryFilter::to_expr)
    }
}
