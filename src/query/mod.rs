//! Query objects shaped by the runner and the samplers, rendered to SQL text
//! for the execution handle's dialect.

pub mod dialect;
pub mod expr;
pub mod filter;
pub mod select;

pub use dialect::{Dialect, POLARS_RANDOM_COLUMN};
pub use expr::{col, count_star, func, lit, BinaryOp, Expr, Literal};
pub use filter::{FilterCondition, FilterOp, QueryArgs, QueryFilter};
pub use select::{Cte, FromItem, OrderBy, Select, TableRef, TableSample};
