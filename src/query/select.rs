//! `Select` is the in-process query object handed to an execution handle.
//! It renders to SQL text for a given dialect; nothing here parses SQL.

use super::dialect::Dialect;
use super::expr::Expr;
use crate::metadata::TableHandle;

#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn from_handle(table: &TableHandle) -> Self {
        Self {
            schema: table.schema().map(str::to_string),
            name: table.name().to_string(),
        }
    }

    fn to_sql(&self, dialect: Dialect) -> String {
        match &self.schema {
            Some(schema) => dialect.quote_qualified(&[schema, &self.name]),
            None => dialect.quote_ident(&self.name),
        }
    }
}

/// System-level sampling clause attached to a table in the FROM list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TableSample {
    SystemPercent(f64),
}

impl TableSample {
    fn to_sql(self) -> String {
        match self {
            TableSample::SystemPercent(percent) => {
                format!("TABLESAMPLE SYSTEM ({} PERCENT)", percent)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FromItem {
    Table {
        table: TableRef,
        sample: Option<TableSample>,
    },
    /// Reference to a common table expression declared in the WITH list.
    Cte(String),
    /// Raw query text wrapped as a derived table.
    Subquery { sql: String, alias: String },
}

impl FromItem {
    pub fn table(table: &TableHandle) -> Self {
        FromItem::Table {
            table: TableRef::from_handle(table),
            sample: None,
        }
    }

    fn to_sql(&self, dialect: Dialect) -> String {
        match self {
            FromItem::Table { table, sample } => match sample {
                Some(sample) => format!("{} {}", table.to_sql(dialect), sample.to_sql()),
                None => table.to_sql(dialect),
            },
            FromItem::Cte(name) => dialect.quote_ident(name),
            FromItem::Subquery { sql, alias } => format!("({}) AS {}", sql, alias),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    pub name: String,
    pub query: Select,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expr: Expr,
    pub ascending: bool,
}

impl OrderBy {
    pub fn asc(expr: Expr) -> Self {
        Self {
            expr,
            ascending: true,
        }
    }

    pub fn desc(expr: Expr) -> Self {
        Self {
            expr,
            ascending: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    ctes: Vec<Cte>,
    projection: Vec<Expr>,
    from: Option<FromItem>,
    selection: Option<Expr>,
    group_by: Vec<Expr>,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
}

impl Select {
    /// Starts a query projecting `entities`; an empty list selects `*`.
    pub fn new(entities: Vec<Expr>) -> Self {
        Self {
            projection: entities,
            ..Default::default()
        }
    }

    pub fn from(mut self, from: FromItem) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_ctes(mut self, ctes: impl IntoIterator<Item = Cte>) -> Self {
        self.ctes.extend(ctes);
        self
    }

    /// ANDs `predicate` into the WHERE clause.
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.selection = Some(match self.selection.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    pub fn group_by(mut self, exprs: Vec<Expr>) -> Self {
        self.group_by.extend(exprs);
        self
    }

    pub fn order_by(mut self, order: impl IntoIterator<Item = OrderBy>) -> Self {
        self.order_by.extend(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Attaches a sampling clause to the FROM table. No-op for CTE or
    /// subquery sources, which cannot carry one.
    pub fn with_table_sample(mut self, table_sample: TableSample) -> Self {
        if let Some(FromItem::Table { sample, .. }) = self.from.as_mut() {
            *sample = Some(table_sample);
        }
        self
    }

    pub fn from_item(&self) -> Option<&FromItem> {
        self.from.as_ref()
    }

    pub fn selection(&self) -> Option<&Expr> {
        self.selection.as_ref()
    }

    pub fn ctes(&self) -> &[Cte] {
        &self.ctes
    }

    pub fn get_limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut sql = String::new();

        if !self.ctes.is_empty() {
            let ctes: Vec<String> = self
                .ctes
                .iter()
                .map(|cte| {
                    format!(
                        "{} AS ({})",
                        dialect.quote_ident(&cte.name),
                        cte.query.to_sql(dialect)
                    )
                })
                .collect();
            sql.push_str("WITH ");
            sql.push_str(&ctes.join(", "));
            sql.push(' ');
        }

        sql.push_str("SELECT ");
        if self.projection.is_empty() {
            sql.push('*');
        } else {
            let items: Vec<String> = self.projection.iter().map(|e| e.to_sql(dialect)).collect();
            sql.push_str(&items.join(", "));
        }

        if let Some(from) = &self.from {
            sql.push_str(" FROM ");
            sql.push_str(&from.to_sql(dialect));
        }

        if let Some(selection) = &self.selection {
            sql.push_str(" WHERE ");
            sql.push_str(&selection.to_sql(dialect));
        }

        if !self.group_by.is_empty() {
            let items: Vec<String> = self.group_by.iter().map(|e| e.to_sql(dialect)).collect();
            sql.push_str(" GROUP BY ");
            sql.push_str(&items.join(", "));
        }

        if !self.order_by.is_empty() {
            let items: Vec<String> = self
                .order_by
                .iter()
                .map(|o| {
                    format!(
                        "{} {}",
                        o.expr.to_sql(dialect),
                        if o.ascending { "ASC" } else { "DESC" }
                    )
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&items.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ColumnDescriptor, ColumnType};
    use crate::query::expr::{col, count_star, lit};
    use sqlparser::dialect::{BigQueryDialect, PostgreSqlDialect};
    use sqlparser::parser::Parser;

    fn orders() -> TableHandle {
        TableHandle::new(
            "orders",
            vec![ColumnDescriptor::new("amount", ColumnType::Float)],
        )
        .with_schema("sales")
    }

    #[test]
    fn test_render_full_select() {
        let query = Select::new(vec![col("status"), count_star().alias("n")])
            .from(FromItem::table(&orders()))
            .filter(col("amount").gt(lit(0)))
            .filter(col("status").is_not_null())
            .group_by(vec![col("status")])
            .order_by([OrderBy::desc(col("n"))])
            .limit(5);

        let sql = query.to_sql(Dialect::Postgres);
        assert_eq!(
            sql,
            "SELECT \"status\", COUNT(*) AS \"n\" FROM \"sales\".\"orders\" \
             WHERE ((\"amount\" > 0) AND (\"status\" IS NOT NULL)) \
             GROUP BY \"status\" ORDER BY \"n\" DESC LIMIT 5"
        );
        assert!(Parser::parse_sql(&PostgreSqlDialect {}, &sql).is_ok());
    }

    #[test]
    fn test_render_ctes_and_subquery() {
        let inner = Select::new(vec![]).from(FromItem::table(&orders()));
        let query = Select::new(vec![col("amount")])
            .with_ctes([Cte {
                name: "orders_sample".to_string(),
                query: inner,
            }])
            .from(FromItem::Cte("orders_sample".to_string()));
        let sql = query.to_sql(Dialect::BigQuery);
        assert_eq!(
            sql,
            "WITH `orders_sample` AS (SELECT * FROM `sales`.`orders`) SELECT `amount` FROM `orders_sample`"
        );
        assert!(Parser::parse_sql(&BigQueryDialect {}, &sql).is_ok());

        let wrapped = Select::new(vec![]).from(FromItem::Subquery {
            sql: "SELECT 1 AS x".to_string(),
            alias: "subquery".to_string(),
        });
        assert_eq!(
            wrapped.to_sql(Dialect::Generic),
            "SELECT * FROM (SELECT 1 AS x) AS subquery"
        );
    }

    #[test]
    fn test_table_sample_only_applies_to_tables() {
        let sampled = Select::new(vec![])
            .from(FromItem::table(&orders()))
            .with_table_sample(TableSample::SystemPercent(10.0));
        assert_eq!(
            sampled.to_sql(Dialect::BigQuery),
            "SELECT * FROM `sales`.`orders` TABLESAMPLE SYSTEM (10 PERCENT)"
        );

        let cte = Select::new(vec![])
            .from(FromItem::Cte("x".to_string()))
            .with_table_sample(TableSample::SystemPercent(10.0));
        assert_eq!(cte.to_sql(Dialect::Generic), "SELECT * FROM \"x\"");
    }
}
