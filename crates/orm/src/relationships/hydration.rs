//! Relationship hydration - attaching related records to their parents
//!
//! Shared by every strategy: the in-memory join, explicit batch loading and
//! lazy loading all reduce to "index the related rows by `related_key`, then
//! look up each parent's `local_key` values".

use std::collections::{HashMap, HashSet};
use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::record::{Record, Relation};
use super::metadata::RelationshipMetadata;
use super::path::ResolvedPath;

/// Canonical lookup key for a JSON value; integral numbers compare equal across representations
pub fn key_string(value: &Value) -> String {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => (f as i64).to_string(),
                    _ => n.to_string(),
                }
            }
        }
        other => other.to_string(),
    }
}

/// Non-null values of `column`, flattening arrays
pub fn key_values(record: &Record, column: &str) -> Vec<Value> {
    match record.get(column) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().filter(|v| !v.is_null()).cloned().collect(),
        Some(value) => vec![value.clone()],
    }
}

/// Distinct key values of `column` across many parents, in first-seen order
pub fn distinct_key_values<'a, I>(records: I, column: &str) -> Vec<Value>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for record in records {
        for value in key_values(record, column) {
            if seen.insert(key_string(&value)) {
                keys.push(value);
            }
        }
    }
    keys
}

/// Related records indexed by their `related_key`
pub struct RelatedIndex<'a> {
    by_key: HashMap<String, Vec<&'a Record>>,
}

impl<'a> RelatedIndex<'a> {
    pub fn new(related: &'a [Record], related_key: &str) -> Self {
        let mut by_key: HashMap<String, Vec<&'a Record>> = HashMap::new();
        for record in related {
            for value in key_values(record, related_key) {
                by_key.entry(key_string(&value)).or_default().push(record);
            }
        }
        Self { by_key }
    }

    /// The relation a parent gets from this index
    pub fn relation_for(&self, metadata: &RelationshipMetadata, parent: &Record) -> Relation {
        let matches: Vec<&Record> = key_values(parent, &metadata.local_key)
            .iter()
            .filter_map(|key| self.by_key.get(&key_string(key)))
            .flatten()
            .copied()
            .collect();

        if metadata.is_collection() {
            Relation::Many(matches.into_iter().cloned().collect())
        } else {
            Relation::One(matches.first().map(|record| Box::new((*record).clone())))
        }
    }
}

/// Attach `related` to every parent according to `metadata`
pub fn attach(parents: Vec<&mut Record>, metadata: &RelationshipMetadata, related: &[Record]) {
    let index = RelatedIndex::new(related, &metadata.related_key);
    for parent in parents {
        let relation = index.relation_for(metadata, parent);
        parent.set_relation(&metadata.name, relation);
    }
}

/// Build a record from a joined JSON document whose relation values are nested under their names
pub fn hydrate_joined(table: &str, value: Value, paths: &[ResolvedPath]) -> ModelResult<Record> {
    let Value::Object(mut fields) = value else {
        return Err(ModelError::Serialization(format!(
            "Expected a JSON object for a joined '{}' row",
            table
        )));
    };

    let mut relations = Vec::with_capacity(paths.len());
    for path in paths {
        let related_table = &path.metadata.related_table;
        let nested = fields.remove(path.name()).unwrap_or(Value::Null);
        let relation = match (path.metadata.is_collection(), nested) {
            (true, Value::Array(items)) => Relation::Many(
                items
                    .into_iter()
                    .map(|item| hydrate_joined(related_table, item, &path.children))
                    .collect::<ModelResult<Vec<_>>>()?,
            ),
            (true, Value::Null) => Relation::Many(Vec::new()),
            (false, Value::Null) => Relation::One(None),
            (false, object @ Value::Object(_)) => {
                Relation::One(Some(Box::new(hydrate_joined(related_table, object, &path.children)?)))
            }
            (_, other) => {
                return Err(ModelError::Serialization(format!(
                    "Unexpected value for '{}.{}': {}",
                    table,
                    path.name(),
                    other
                )))
            }
        };
        relations.push((path.name().to_string(), relation));
    }

    let mut record = Record::new(table, fields);
    for (name, relation) in relations {
        record.set_relation(&name, relation);
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Filter;
    use serde_json::json;

    fn record(table: &str, value: Value) -> Record {
        Record::from_json(table, value).unwrap()
    }

    #[test]
    fn test_key_string_normalizes_numbers() {
        assert_eq!(key_string(&json!(2)), "2");
        assert_eq!(key_string(&json!(2.0)), "2");
        assert_eq!(key_string(&json!(2.5)), "2.5");
        assert_eq!(key_string(&json!("2")), "\"2\"");
    }

    #[test]
    fn test_key_values() {
        let course = record("courses", json!({"id": 1, "tag_ids": [3, null, 4], "author_id": null}));
        assert_eq!(key_values(&course, "tag_ids"), vec![json!(3), json!(4)]);
        assert!(key_values(&course, "author_id").is_empty());
        assert!(key_values(&course, "missing").is_empty());
        assert_eq!(key_values(&course, "id"), vec![json!(1)]);
    }

    #[test]
    fn test_distinct_key_values() {
        let courses = vec![
            record("courses", json!({"id": 1, "author_id": 7})),
            record("courses", json!({"id": 2, "author_id": 8})),
            record("courses", json!({"id": 3, "author_id": 7})),
        ];
        assert_eq!(distinct_key_values(&courses, "author_id"), vec![json!(7), json!(8)]);
    }

    #[test]
    fn test_attach_belongs_to_and_many_to_many() {
        let mut courses = vec![
            record("courses", json!({"id": 1, "author_id": 7, "tag_ids": [11, 10]})),
            record("courses", json!({"id": 2, "author_id": 9, "tag_ids": []})),
        ];
        let authors = vec![record("authors", json!({"id": 7, "name": "Ferris"}))];
        let tags = vec![
            record("tags", json!({"id": 10, "name": "A"})),
            record("tags", json!({"id": 11, "name": "B"})),
        ];

        let author = RelationshipMetadata::belongs_to("courses", "Author", "authors", "author_id");
        attach(courses.iter_mut().collect(), &author, &authors);
        let tag_meta = RelationshipMetadata::many_to_many("courses", "Tags", "tags", "tag_ids");
        attach(courses.iter_mut().collect(), &tag_meta, &tags);

        assert_eq!(courses[0].related_one("Author").unwrap().unwrap().value::<i64>("id").unwrap(), 7);
        assert_eq!(courses[1].related_one("Author").unwrap(), None);

        // Order follows the parent's id array
        let names: Vec<String> = courses[0]
            .related_many("Tags")
            .unwrap()
            .iter()
            .map(|tag| tag.value("name").unwrap())
            .collect();
        assert_eq!(names, vec!["B", "A"]);
        assert!(courses[1].related_many("Tags").unwrap().is_empty());
    }

    #[test]
    fn test_attach_has_many() {
        let mut authors = vec![record("authors", json!({"id": 7}))];
        let courses = vec![
            record("courses", json!({"id": 1, "author_id": 7})),
            record("courses", json!({"id": 2, "author_id": 8})),
            record("courses", json!({"id": 3, "author_id": 7})),
        ];
        let metadata = RelationshipMetadata::has_many("authors", "Courses", "courses", "author_id");
        attach(authors.iter_mut().collect(), &metadata, &courses);
        assert_eq!(authors[0].related_many("Courses").unwrap().len(), 2);
    }

    #[test]
    fn test_hydrate_joined() {
        let paths = vec![
            ResolvedPath {
                metadata: RelationshipMetadata::belongs_to("courses", "Author", "authors", "author_id"),
                filter: Filter::all(),
                children: vec![ResolvedPath {
                    metadata: RelationshipMetadata::has_one("authors", "Address", "addresses", "author_id"),
                    filter: Filter::all(),
                    children: Vec::new(),
                }],
            },
            ResolvedPath {
                metadata: RelationshipMetadata::many_to_many("courses", "Tags", "tags", "tag_ids"),
                filter: Filter::all(),
                children: Vec::new(),
            },
        ];
        let document = json!({
            "id": 1,
            "author_id": 7,
            "Author": {"id": 7, "Address": null},
            "Tags": [{"id": 10}]
        });

        let course = hydrate_joined("courses", document, &paths).unwrap();
        assert!(!course.fields().contains_key("Author"));
        let author = course.related_one("Author").unwrap().unwrap();
        assert_eq!(author.table(), "authors");
        assert_eq!(author.related_one("Address").unwrap(), None);
        assert_eq!(course.related_many("Tags").unwrap()[0].table(), "tags");

        let bad = hydrate_joined("courses", json!({"id": 1, "Tags": 3}), &paths);
        assert!(matches!(bad, Err(ModelError::Serialization(_))));
    }
}
