//! A thin fluent builder mirroring `select` (§4.5). Semantics are identical
//! to the table façade's `select` — the builder only rearranges call sites.

use crate::error::Result;
use crate::predicate::{Comparison, Predicate};
use crate::table::{SelectOptions, Table};
use crate::value::{LogicalValue, Row};

/// Chainable `where / whereLike / whereOr / select / selectAll / limit / skip`
/// builder terminated by `execute / first / count / exists`.
pub struct QueryBuilder<'a> {
    table: &'a Table<'a>,
    predicate: Predicate,
    columns: Vec<String>,
    limit: Option<i64>,
    skip: Option<i64>,
}

impl<'a> QueryBuilder<'a> {
    #[must_use]
    pub fn new(table: &'a Table<'a>) -> Self {
        Self { table, predicate: Predicate::new(), columns: Vec::new(), limit: None, skip: None }
    }

    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, value: LogicalValue) -> Self {
        self.predicate = self.predicate.eq(field, value);
        self
    }

    #[must_use]
    pub fn where_compare(mut self, field: impl Into<String>, op: Comparison, value: LogicalValue) -> Self {
        self.predicate = self.predicate.compare(field, op, value);
        self
    }

    #[must_use]
    pub fn where_like(mut self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.predicate = self.predicate.like(field, pattern);
        self
    }

    #[must_use]
    pub fn where_or(mut self, branches: Vec<Predicate>) -> Self {
        self.predicate = self.predicate.or(branches);
        self
    }

    #[must_use]
    pub fn select(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    #[must_use]
    pub fn select_all(mut self) -> Self {
        self.columns = Vec::new();
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn skip(mut self, skip: i64) -> Self {
        self.skip = Some(skip);
        self
    }

    fn options(&self) -> SelectOptions {
        SelectOptions {
            predicate: self.predicate.clone(),
            select: self.columns.clone(),
            limit: self.limit,
            skip: self.skip,
        }
    }

    pub fn execute(self) -> Result<Vec<Row>> {
        self.table.select(self.options())
    }

    pub fn first(self) -> Result<Option<Row>> {
        let options = self.options();
        self.table.find_first(options)
    }

    pub fn count(self) -> Result<i64> {
        self.table.count(self.predicate)
    }

    pub fn exists(self) -> Result<bool> {
        self.table.exists(self.predicate)
    }
}
