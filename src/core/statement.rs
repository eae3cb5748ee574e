//! SQL statement assembly
//!
//! Builders for the five statement shapes the mapper issues. Table and column names are
//! written verbatim; values always travel as bound parameters.

use super::condition::ConditionSpec;
use super::value::{placeholder_name, DatabaseValue, QueryParams};

/// SELECT built from a [`ConditionSpec`]
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    table: String,
    select: String,
    where_clause: String,
    order_by: String,
    limit: String,
}

impl SelectBuilder {
    /// Create a `SELECT * FROM <table>` builder
    ///
    /// # Example
    ///
    /// ```
    /// use rust_record_mapper::core::statement::SelectBuilder;
    ///
    /// let sql = SelectBuilder::new("users").filter("age > 18").limit("10").build();
    /// assert_eq!(sql, "SELECT * FROM users WHERE age > 18 LIMIT 10");
    /// ```
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: "*".to_string(),
            where_clause: String::new(),
            order_by: String::new(),
            limit: String::new(),
        }
    }

    /// Take every fragment from a normalized condition
    pub fn from_condition(table: impl Into<String>, condition: &ConditionSpec) -> Self {
        Self::new(table)
            .columns(condition.select_clause())
            .filter(condition.where_clause())
            .order_by(condition.order_clause())
            .limit(condition.limit_clause())
    }

    /// Column list
    #[must_use]
    pub fn columns(mut self, select: &str) -> Self {
        self.select = if select.trim().is_empty() {
            "*".to_string()
        } else {
            select.to_string()
        };
        self
    }

    /// WHERE body
    #[must_use]
    pub fn filter(mut self, where_clause: &str) -> Self {
        self.where_clause = where_clause.to_string();
        self
    }

    /// ORDER BY body
    #[must_use]
    pub fn order_by(mut self, order: &str) -> Self {
        self.order_by = order.to_string();
        self
    }

    /// LIMIT body
    #[must_use]
    pub fn limit(mut self, limit: &str) -> Self {
        self.limit = limit.to_string();
        self
    }

    /// Build the SQL query string
    pub fn build(&self) -> String {
        let mut sql = format!("SELECT {} FROM {}", self.select, self.table);
        push_clause(&mut sql, "WHERE", &self.where_clause);
        push_clause(&mut sql, "ORDER BY", &self.order_by);
        push_clause(&mut sql, "LIMIT", &self.limit);
        sql
    }
}

fn push_clause(sql: &mut String, keyword: &str, body: &str) {
    if !body.trim().is_empty() {
        sql.push(' ');
        sql.push_str(keyword);
        sql.push(' ');
        sql.push_str(body);
    }
}

/// `SELECT * FROM <table> WHERE <pk> = ? LIMIT 1`
pub fn select_by_primary_key(table: &str, primary_key: &str) -> String {
    SelectBuilder::new(table)
        .filter(&format!("{} = ?", primary_key))
        .limit("1")
        .build()
}

/// COUNT query builder
#[derive(Debug, Clone)]
pub struct CountBuilder {
    table: String,
    where_clause: String,
}

impl CountBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            where_clause: String::new(),
        }
    }

    /// Only the WHERE body of a condition applies to a count
    pub fn from_condition(table: impl Into<String>, condition: &ConditionSpec) -> Self {
        Self::new(table).filter(condition.where_clause())
    }

    #[must_use]
    pub fn filter(mut self, where_clause: &str) -> Self {
        self.where_clause = where_clause.to_string();
        self
    }

    pub fn build(&self) -> String {
        let mut sql = format!("SELECT count(*) FROM {}", self.table);
        push_clause(&mut sql, "WHERE", &self.where_clause);
        sql
    }
}

/// INSERT query builder using named placeholders
#[derive(Debug, Clone)]
pub struct InsertBuilder {
    table: String,
    columns: Vec<String>,
    values: Vec<DatabaseValue>,
}

impl InsertBuilder {
    /// Create a new INSERT query builder
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Add a column value
    #[must_use]
    pub fn value(mut self, column: &str, value: impl Into<DatabaseValue>) -> Self {
        self.columns.push(column.to_string());
        self.values.push(value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// `INSERT INTO <table> (a,b) VALUES (:a,:b)`
    pub fn build(&self) -> String {
        let placeholders: Vec<String> =
            self.columns.iter().map(|c| placeholder_name(c)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            self.columns.join(","),
            placeholders.join(",")
        )
    }

    pub fn params(&self) -> QueryParams {
        QueryParams::named(self.columns.iter().zip(self.values.iter().cloned()))
    }
}

/// UPDATE-by-primary-key builder using named placeholders
#[derive(Debug, Clone)]
pub struct UpdateBuilder {
    table: String,
    primary_key: String,
    key_value: DatabaseValue,
    sets: Vec<(String, DatabaseValue)>,
}

impl UpdateBuilder {
    /// Update the row whose `primary_key` equals `key_value`
    pub fn new(
        table: impl Into<String>,
        primary_key: impl Into<String>,
        key_value: impl Into<DatabaseValue>,
    ) -> Self {
        Self {
            table: table.into(),
            primary_key: primary_key.into(),
            key_value: key_value.into(),
            sets: Vec::new(),
        }
    }

    /// Add a SET column = value
    #[must_use]
    pub fn set(mut self, column: &str, value: impl Into<DatabaseValue>) -> Self {
        self.sets.push((column.to_string(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// `UPDATE <table> SET a = :a,b = :b WHERE <pk> = :<pk>`
    pub fn build(&self) -> String {
        let sets: Vec<String> = self
            .sets
            .iter()
            .map(|(col, _)| format!("{} = {}", col, placeholder_name(col)))
            .collect();
        format!(
            "UPDATE {} SET {} WHERE {} = {}",
            self.table,
            sets.join(","),
            self.primary_key,
            placeholder_name(&self.primary_key)
        )
    }

    /// SET values followed by the key value
    pub fn params(&self) -> QueryParams {
        QueryParams::named(
            self.sets
                .iter()
                .cloned()
                .chain(std::iter::once((self.primary_key.clone(), self.key_value.clone()))),
        )
    }
}

/// DELETE-by-primary-key builder
#[derive(Debug, Clone)]
pub struct DeleteBuilder {
    table: String,
    primary_key: String,
    key_value: DatabaseValue,
}

impl DeleteBuilder {
    pub fn new(
        table: impl Into<String>,
        primary_key: impl Into<String>,
        key_value: impl Into<DatabaseValue>,
    ) -> Self {
        Self {
            table: table.into(),
            primary_key: primary_key.into(),
            key_value: key_value.into(),
        }
    }

    /// `DELETE FROM <table> WHERE <pk> = ?`
    pub fn build(&self) -> String {
        format!("DELETE FROM {} WHERE {} = ?", self.table, self.primary_key)
    }

    pub fn params(&self) -> QueryParams {
        QueryParams::Positional(vec![self.key_value.clone()])
    }
}
