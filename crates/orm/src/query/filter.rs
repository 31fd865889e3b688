//! Filters - Opaque predicates over records
//!
//! A filter is a conjunction of [`WhereCondition`]s. The runner never looks
//! inside a caller's filter; it only ANDs its own key conditions onto it.
//! Backends either render it to SQL (`Display`) or evaluate it in memory
//! ([`Filter::matches`]) with SQL null semantics: a comparison against a
//! null or missing column is false.

use std::cmp::Ordering;
use std::fmt;
use serde_json::{Map, Value};

use super::types::{QueryOperator, WhereCondition};
use crate::error::{ModelError, ModelResult};

/// Conjunction of where conditions. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<WhereCondition>,
}

impl Filter {
    /// Filter matching every record
    pub fn all() -> Self {
        Self::default()
    }

    /// Shorthand for `id = value`
    pub fn by_id<V: Into<Value>>(id: V) -> Self {
        Self::all().where_eq("id", id)
    }

    fn push(mut self, condition: WhereCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Add WHERE equals constraint
    pub fn where_eq<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.push(WhereCondition::new(column, QueryOperator::Equal, Some(value.into())))
    }

    /// Add WHERE not equals constraint
    pub fn where_ne<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.push(WhereCondition::new(column, QueryOperator::NotEqual, Some(value.into())))
    }

    /// Add WHERE greater than constraint
    pub fn where_gt<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.push(WhereCondition::new(column, QueryOperator::GreaterThan, Some(value.into())))
    }

    /// Add WHERE greater than or equal constraint
    pub fn where_gte<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.push(WhereCondition::new(column, QueryOperator::GreaterThanOrEqual, Some(value.into())))
    }

    /// Add WHERE less than constraint
    pub fn where_lt<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.push(WhereCondition::new(column, QueryOperator::LessThan, Some(value.into())))
    }

    /// Add WHERE less than or equal constraint
    pub fn where_lte<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.push(WhereCondition::new(column, QueryOperator::LessThanOrEqual, Some(value.into())))
    }

    /// Add WHERE IN constraint
    pub fn where_in<V: Into<Value>>(self, column: &str, values: Vec<V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.push(WhereCondition::list(column, QueryOperator::In, values))
    }

    /// Add WHERE NOT IN constraint
    pub fn where_not_in<V: Into<Value>>(self, column: &str, values: Vec<V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.push(WhereCondition::list(column, QueryOperator::NotIn, values))
    }

    /// Add WHERE IS NULL constraint
    pub fn where_null(self, column: &str) -> Self {
        self.push(WhereCondition::new(column, QueryOperator::IsNull, None))
    }

    /// Add WHERE IS NOT NULL constraint
    pub fn where_not_null(self, column: &str) -> Self {
        self.push(WhereCondition::new(column, QueryOperator::IsNotNull, None))
    }

    /// Combine two filters into their conjunction
    pub fn and(mut self, other: Filter) -> Self {
        self.conditions.extend(other.conditions);
        self
    }

    pub fn conditions(&self) -> &[WhereCondition] {
        &self.conditions
    }

    /// True when the filter matches everything
    pub fn is_all(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Evaluate the filter against a row of column values
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        self.conditions.iter().all(|condition| condition_matches(condition, row))
    }

    /// Parse a single `column<op>value` condition, e.g. `price=0` or `id>=2`.
    ///
    /// The value is read as JSON when it parses as JSON, otherwise as a
    /// plain string, so `name=Rust` and `name="Rust"` are equivalent.
    pub fn parse(expression: &str) -> ModelResult<Self> {
        // Two-character operators first so `>=` at a position wins over `>`
        const OPERATORS: [(&str, QueryOperator); 6] = [
            ("!=", QueryOperator::NotEqual),
            (">=", QueryOperator::GreaterThanOrEqual),
            ("<=", QueryOperator::LessThanOrEqual),
            ("=", QueryOperator::Equal),
            (">", QueryOperator::GreaterThan),
            ("<", QueryOperator::LessThan),
        ];

        // The column ends at the leftmost operator
        let split = expression.char_indices().find_map(|(index, _)| {
            OPERATORS
                .iter()
                .find(|(token, _)| expression[index..].starts_with(token))
                .map(|(token, operator)| (index, *token, *operator))
        });

        if let Some((index, token, operator)) = split {
            let column = expression[..index].trim();
            let raw = expression[index + token.len()..].trim();
            if !column.is_empty() && !raw.is_empty() {
                let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
                return Ok(Filter::all().push(WhereCondition::new(column, operator, Some(value))));
            }
        }

        Err(ModelError::Configuration(format!(
            "Cannot parse filter expression '{}', expected column<op>value",
            expression
        )))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conditions.is_empty() {
            return write!(f, "TRUE");
        }
        let rendered: Vec<String> = self.conditions.iter().map(ToString::to_string).collect();
        write!(f, "{}", rendered.join(" AND "))
    }
}

fn condition_matches(condition: &WhereCondition, row: &Map<String, Value>) -> bool {
    let column = row.get(&condition.column).unwrap_or(&Value::Null);

    match condition.operator {
        QueryOperator::IsNull => column.is_null(),
        QueryOperator::IsNotNull => !column.is_null(),
        _ if column.is_null() => false,
        QueryOperator::In => condition.values.iter().any(|v| values_equal(column, v)),
        QueryOperator::NotIn => !condition.values.iter().any(|v| values_equal(column, v)),
        operator => {
            let operand = match &condition.value {
                Some(value) if !value.is_null() => value,
                _ => return false,
            };
            match operator {
                QueryOperator::Equal => values_equal(column, operand),
                QueryOperator::NotEqual => !values_equal(column, operand),
                QueryOperator::GreaterThan => compare(column, operand) == Some(Ordering::Greater),
                QueryOperator::GreaterThanOrEqual => {
                    matches!(compare(column, operand), Some(Ordering::Greater | Ordering::Equal))
                }
                QueryOperator::LessThan => compare(column, operand) == Some(Ordering::Less),
                QueryOperator::LessThanOrEqual => {
                    matches!(compare(column, operand), Some(Ordering::Less | Ordering::Equal))
                }
                _ => false,
            }
        }
    }
}

/// Equality with numeric coercion; an array column matches when it contains the operand
fn values_equal(column: &Value, operand: &Value) -> bool {
    match (column, operand) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Array(items), operand) if !operand.is_array() => {
            items.iter().any(|item| values_equal(item, operand))
        }
        (a, b) => a == b,
    }
}

fn compare(column: &Value, operand: &Value) -> Option<Ordering> {
    match (column, operand) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = Filter::all();
        assert!(filter.is_all());
        assert!(filter.matches(&row(json!({"id": 1}))));
        assert_eq!(filter.to_string(), "TRUE");
    }

    #[test]
    fn test_comparisons() {
        let course = row(json!({"id": 2, "name": "Rust", "price": 0.0, "author_id": 1}));

        assert!(Filter::by_id(2).matches(&course));
        assert!(Filter::all().where_eq("price", 0).matches(&course));
        assert!(Filter::all().where_gt("id", 1).where_lte("id", 2).matches(&course));
        assert!(!Filter::all().where_lt("id", 2).matches(&course));
        assert!(Filter::all().where_ne("name", "Go").matches(&course));
        assert!(Filter::all().where_in("author_id", vec![1, 3]).matches(&course));
        assert!(!Filter::all().where_not_in("author_id", vec![1]).matches(&course));
    }

    #[test]
    fn test_null_semantics() {
        let tag = row(json!({"id": 5, "name": "A", "moderator_id": null}));

        assert!(Filter::all().where_null("moderator_id").matches(&tag));
        assert!(!Filter::all().where_not_null("moderator_id").matches(&tag));
        assert!(!Filter::all().where_eq("moderator_id", 1).matches(&tag));
        assert!(!Filter::all().where_ne("moderator_id", 1).matches(&tag));
        assert!(!Filter::all().where_in("moderator_id", vec![1, 2]).matches(&tag));
        // Missing columns read as null
        assert!(Filter::all().where_null("deleted_at").matches(&tag));
    }

    #[test]
    fn test_array_membership() {
        let course = row(json!({"id": 1, "tag_ids": [10, 11]}));
        assert!(Filter::all().where_eq("tag_ids", 11).matches(&course));
        assert!(!Filter::all().where_eq("tag_ids", 12).matches(&course));
    }

    #[test]
    fn test_display_renders_where_fragment() {
        let filter = Filter::all()
            .where_eq("name", "O'Reilly")
            .where_in("id", vec![1, 2])
            .where_null("moderator_id");
        assert_eq!(
            filter.to_string(),
            "name = 'O''Reilly' AND id IN (1, 2) AND moderator_id IS NULL"
        );
    }

    #[test]
    fn test_and_combines_conditions() {
        let filter = Filter::by_id(1).and(Filter::all().where_gt("price", 10));
        assert_eq!(filter.conditions().len(), 2);
    }

    #[test]
    fn test_parse_expressions() {
        let filter = Filter::parse("price=0").unwrap();
        assert_eq!(filter, Filter::all().where_eq("price", 0));

        let filter = Filter::parse("id >= 2").unwrap();
        assert_eq!(filter, Filter::all().where_gte("id", 2));

        let filter = Filter::parse("name=Rust").unwrap();
        assert_eq!(filter, Filter::all().where_eq("name", "Rust"));

        assert!(matches!(Filter::parse("price"), Err(ModelError::Configuration(_))));
        assert!(matches!(Filter::parse("=3"), Err(ModelError::Configuration(_))));
    }

    #[test]
    fn test_parse_splits_at_leftmost_operator() {
        let filter = Filter::parse("name=a<=b").unwrap();
        assert_eq!(filter, Filter::all().where_eq("name", "a<=b"));

        let filter = Filter::parse("price<=a=b").unwrap();
        assert_eq!(filter, Filter::all().where_lte("price", "a=b"));

        let filter = Filter::parse("name!=Go").unwrap();
        assert_eq!(filter, Filter::all().where_ne("name", "Go"));
    }
}
