//! Predicate compiler: structured predicate trees to parameterized SQL
//! (§4.3).

use crate::error::{Result, StoreError};
use crate::value::LogicalValue;

/// A single comparison operator recognized by the compiler (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    NotEqual,
}

impl Comparison {
    const fn sql_operator(self) -> &'static str {
        match self {
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThanOrEqual => "<=",
            Self::NotEqual => "!=",
        }
    }
}

/// A structured predicate tree, compiled to a `WHERE` fragment plus a
/// parameter vector. Every field is additive (`AND`-combined); `or` carries
/// the disjunction branches described in §4.3.
///
/// `or: None` means "no `OR` clause was supplied"; `or: Some(vec![])` is the
/// explicit `OR:[]` identity-false from §4.3/§8, which short-circuits the
/// whole query rather than compiling to SQL.
#[derive(Debug, Clone, Default)]
pub struct Predicate {
    pub eq: Vec<(String, LogicalValue)>,
    pub like: Vec<(String, String)>,
    pub comparisons: Vec<(String, Comparison, LogicalValue)>,
    pub or: Option<Vec<Predicate>>,
}

impl Predicate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: LogicalValue) -> Self {
        self.eq.push((field.into(), value));
        self
    }

    #[must_use]
    pub fn like(mut self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.like.push((field.into(), pattern.into()));
        self
    }

    #[must_use]
    pub fn compare(mut self, field: impl Into<String>, op: Comparison, value: LogicalValue) -> Self {
        self.comparisons.push((field.into(), op, value));
        self
    }

    #[must_use]
    pub fn or(mut self, branches: Vec<Predicate>) -> Self {
        self.or = Some(branches);
        self
    }

    /// Whether no condition at all was supplied — the `MissingPredicate`
    /// case for `update`/`delete` (§4.3, §8).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.eq.is_empty() && self.like.is_empty() && self.comparisons.is_empty() && self.or.is_none()
    }

    /// Whether this predicate is the explicit `OR:[]` identity-false, which
    /// short-circuits query execution entirely (§4.3, §8).
    #[must_use]
    pub fn is_identity_false(&self) -> bool {
        matches!(&self.or, Some(branches) if branches.is_empty())
    }

    /// Reject an empty predicate for a mutating `operation` (§4.3 safety gates).
    pub fn require_meaningful(&self, operation: &'static str) -> Result<()> {
        if self.is_empty() {
            return Err(StoreError::MissingPredicate { operation });
        }
        Ok(())
    }

    /// Compile to a `WHERE …` fragment (empty string if no clauses) plus the
    /// ordered parameter vector. Returns `None` when the predicate is
    /// `OR:[]` and the caller should short-circuit without touching SQL.
    #[must_use]
    pub fn compile(&self) -> Option<CompiledPredicate> {
        if self.is_identity_false() {
            return None;
        }

        let (mut clauses, mut params) = self.and_clauses();

        if let Some(branches) = &self.or {
            if !branches.is_empty() {
                let mut branch_sql = Vec::with_capacity(branches.len());
                for branch in branches {
                    let (branch_clauses, branch_params) = branch.and_clauses();
                    branch_sql.push(if branch_clauses.is_empty() {
                        "1".to_string()
                    } else {
                        branch_clauses.join(" AND ")
                    });
                    params.extend(branch_params);
                }
                clauses.push(format!("({})", branch_sql.join(" OR ")));
            }
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };

        Some(CompiledPredicate { where_sql, params })
    }

    /// Build the `AND`-combined clause list for this predicate's own fields,
    /// in the order required by §4.3: equality, `LIKE`, comparisons.
    fn and_clauses(&self) -> (Vec<String>, Vec<LogicalValue>) {
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        for (field, value) in &self.eq {
            clauses.push(format!("\"{field}\" = ?"));
            params.push(value.clone());
        }
        for (field, pattern) in &self.like {
            clauses.push(format!("\"{field}\" LIKE ?"));
            params.push(LogicalValue::Text(pattern.clone()));
        }
        for (field, op, value) in &self.comparisons {
            clauses.push(format!("\"{field}\" {} ?", op.sql_operator()));
            params.push(value.clone());
        }

        (clauses, params)
    }
}

/// The compiled output of [`Predicate::compile`].
#[derive(Debug, Clone)]
pub struct CompiledPredicate {
    pub where_sql: String,
    pub params: Vec<LogicalValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_predicate_has_no_where_clause() {
        let compiled = Predicate::new().compile().unwrap();
        assert_eq!(compiled.where_sql, "");
        assert!(compiled.params.is_empty());
    }

    #[test]
    fn implicit_equality_and_like_are_and_combined_in_order() {
        let predicate = Predicate::new()
            .eq("status", LogicalValue::Text("open".into()))
            .like("title", "%bug%".to_string());
        let compiled = predicate.compile().unwrap();
        assert_eq!(compiled.where_sql, "WHERE \"status\" = ? AND \"title\" LIKE ?");
        assert_eq!(compiled.params.len(), 2);
    }

    #[test]
    fn or_branches_are_parenthesized_and_anded_with_top_level_clauses() {
        let predicate = Predicate::new().eq("tenant", LogicalValue::Int(1)).or(vec![
            Predicate::new().eq("status", LogicalValue::Text("open".into())),
            Predicate::new().like("title", "%urgent%".to_string()),
        ]);
        let compiled = predicate.compile().unwrap();
        assert_eq!(
            compiled.where_sql,
            "WHERE \"tenant\" = ? AND (\"status\" = ? OR \"title\" LIKE ?)"
        );
        assert_eq!(compiled.params.len(), 3);
    }

    #[test]
    fn explicit_empty_or_short_circuits_to_none() {
        let predicate = Predicate::new().eq("status", LogicalValue::Text("open".into())).or(vec![]);
        assert!(predicate.compile().is_none());
    }

    #[test]
    fn missing_predicate_rejects_fully_empty_predicate() {
        let err = Predicate::new().require_meaningful("update").unwrap_err();
        assert!(matches!(err, StoreError::MissingPredicate { operation: "update" }));
    }

    #[test]
    fn or_empty_is_not_missing_predicate_since_or_key_was_supplied() {
        let predicate = Predicate::new().or(vec![]);
        assert!(predicate.require_meaningful("delete").is_ok());
    }
}
