//! SQL Generation
//!
//! Renders the two storage capabilities as parameterized PostgreSQL. Every
//! statement returns a single `record` column holding one jsonb document per
//! root row, so both capabilities decode the same way. Values are never
//! interpolated: they travel in [`SqlStatement::params`] as `$n` placeholders.
//!
//! A join nests one correlated subquery per path segment:
//!
//! ```sql
//! SELECT to_jsonb(t0) || jsonb_build_object(
//!     'Author', (SELECT to_jsonb(t1) FROM "authors" t1 WHERE t1."id" = t0."author_id" LIMIT 1)
//! ) AS record FROM "courses" t0 WHERE t0."id" = $1
//! ```

use std::fmt;
use serde_json::Value;

use crate::query::{Filter, QueryOperator, WhereCondition};
use crate::relationships::{RelationshipType, ResolvedPath};

/// A rendered statement with its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql)
    }
}

/// Quote an identifier, doubling embedded quotes
pub fn escape_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Quote a string literal, doubling embedded quotes
fn escape_literal(literal: &str) -> String {
    format!("'{}'", literal.replace('\'', "''"))
}

/// Rows of `table` matching `filter`
pub fn select_sql(table: &str, filter: &Filter) -> SqlStatement {
    let mut builder = SqlBuilder::default();
    let alias = builder.next_alias();
    let mut sql = format!("SELECT to_jsonb({alias}) AS record FROM {} {alias}", escape_identifier(table));
    builder.push_where(&mut sql, &alias, filter, None);
    builder.finish(sql)
}

/// Rows of `table` matching `filter` with every path populated, as one statement
pub fn join_sql(table: &str, paths: &[ResolvedPath], filter: &Filter) -> SqlStatement {
    let mut builder = SqlBuilder::default();
    let alias = builder.next_alias();
    let document = builder.document(&alias, paths);
    let mut sql = format!("SELECT {document} AS record FROM {} {alias}", escape_identifier(table));
    builder.push_where(&mut sql, &alias, filter, None);
    builder.finish(sql)
}

#[derive(Default)]
struct SqlBuilder {
    params: Vec<Value>,
    aliases: usize,
}

impl SqlBuilder {
    fn next_alias(&mut self) -> String {
        let alias = format!("t{}", self.aliases);
        self.aliases += 1;
        alias
    }

    fn placeholder(&mut self, value: Value) -> String {
        self.params.push(value);
        format!("${}", self.params.len())
    }

    fn finish(self, sql: String) -> SqlStatement {
        SqlStatement { sql, params: self.params }
    }

    /// jsonb expression for the row at `alias` with its relation subtree merged in
    fn document(&mut self, alias: &str, paths: &[ResolvedPath]) -> String {
        let base = format!("to_jsonb({alias})");
        if paths.is_empty() {
            return base;
        }

        let entries: Vec<String> = paths
            .iter()
            .map(|path| {
                let subquery = self.subquery(alias, path);
                format!("{}, {}", escape_literal(path.name()), subquery)
            })
            .collect();
        format!("{base} || jsonb_build_object({})", entries.join(", "))
    }

    fn subquery(&mut self, parent: &str, path: &ResolvedPath) -> String {
        let metadata = &path.metadata;
        let alias = self.next_alias();
        let document = self.document(&alias, &path.children);

        let local = format!("{parent}.{}", escape_identifier(&metadata.local_key));
        let related = format!("{alias}.{}", escape_identifier(&metadata.related_key));
        let link = if metadata.relationship_type.has_array_key() {
            format!("{related} = ANY({local})")
        } else {
            format!("{related} = {local}")
        };

        let from = format!("FROM {} {alias}", escape_identifier(&metadata.related_table));
        let mut body = String::new();
        self.push_where(&mut body, &alias, &path.filter, Some(link));

        match metadata.relationship_type {
            RelationshipType::BelongsTo | RelationshipType::HasOne => {
                format!("(SELECT {document} {from}{body} LIMIT 1)")
            }
            RelationshipType::HasMany => {
                format!("COALESCE((SELECT jsonb_agg({document}) {from}{body}), '[]'::jsonb)")
            }
            RelationshipType::ManyToMany => format!(
                "COALESCE((SELECT jsonb_agg({document} ORDER BY array_position({local}, {related})) {from}{body}), '[]'::jsonb)"
            ),
        }
    }

    fn push_where(&mut self, sql: &mut String, alias: &str, filter: &Filter, link: Option<String>) {
        let mut clauses: Vec<String> = link.into_iter().collect();
        clauses.extend(filter.conditions().iter().map(|condition| self.condition(alias, condition)));
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
    }

    fn condition(&mut self, alias: &str, condition: &WhereCondition) -> String {
        let column = format!("{alias}.{}", escape_identifier(&condition.column));
        match condition.operator {
            QueryOperator::IsNull => format!("{column} IS NULL"),
            QueryOperator::IsNotNull => format!("{column} IS NOT NULL"),
            QueryOperator::In | QueryOperator::NotIn if condition.values.is_empty() => {
                // Nothing can be IN an empty set; everything is NOT IN it
                if condition.operator == QueryOperator::In { "FALSE".to_string() } else { "TRUE".to_string() }
            }
            QueryOperator::In | QueryOperator::NotIn => {
                let placeholders: Vec<String> = condition
                    .values
                    .iter()
                    .map(|value| self.placeholder(value.clone()))
                    .collect();
                let keyword = if condition.operator == QueryOperator::In { "IN" } else { "NOT IN" };
                format!("{column} {keyword} ({})", placeholders.join(", "))
            }
            operator => {
                let symbol = match operator {
                    QueryOperator::NotEqual => "<>".to_string(),
                    other => other.to_string(),
                };
                let value = condition.value.clone().unwrap_or(Value::Null);
                format!("{column} {symbol} {}", self.placeholder(value))
            }
        }
    }
}
