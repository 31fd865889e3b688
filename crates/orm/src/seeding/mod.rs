//! Dataset seeding
//!
//! A [`Dataset`] is the JSON document the in-memory database is seeded from:
//!
//! ```json
//! { "authors": [...], "addresses": [...], "courses": [...], "tags": [...], "moderators": [...] }
//! ```
//!
//! Every table is optional. [`Dataset::validate`] enforces the catalogue's
//! reference invariants before anything is loaded.

use std::collections::HashSet;
use std::path::Path;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::model::Model;
use crate::models::{Address, Author, Course, Moderator, Tag};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub moderators: Vec<Moderator>,
}

impl Dataset {
    pub fn from_json_str(json: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn from_file<P: AsRef<Path>>(path: P) -> ModelResult<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            ModelError::Configuration(format!("Cannot read dataset '{}': {}", path.display(), e))
        })?;
        Self::from_json_str(&contents)
    }

    /// Small catalogue used by the demo: three courses by two authors
    pub fn demo() -> Self {
        Self {
            authors: vec![
                Author { id: 1, name: "Ada Byron".to_string() },
                Author { id: 2, name: "Alan Church".to_string() },
            ],
            addresses: vec![Address {
                id: 1,
                street: "12 Analytical Row".to_string(),
                city: "London".to_string(),
                author_id: 1,
            }],
            courses: vec![
                Course {
                    id: 1,
                    name: "Ownership from Scratch".to_string(),
                    price: 49.0,
                    author_id: 1,
                    tag_ids: vec![1],
                },
                Course {
                    id: 2,
                    name: "Async Services".to_string(),
                    price: 89.0,
                    author_id: 1,
                    tag_ids: vec![1, 2],
                },
                Course {
                    id: 3,
                    name: "Lambda Calculus Primer".to_string(),
                    price: 0.0,
                    author_id: 2,
                    tag_ids: vec![3],
                },
            ],
            tags: vec![
                Tag { id: 1, name: "beginner".to_string(), moderator_id: Some(1) },
                Tag { id: 2, name: "backend".to_string(), moderator_id: None },
                Tag { id: 3, name: "theory".to_string(), moderator_id: Some(1) },
            ],
            moderators: vec![Moderator { id: 1, name: "Grace".to_string() }],
        }
    }

    /// Check that every required reference resolves and optional ones resolve when set
    pub fn validate(&self) -> ModelResult<()> {
        let authors: HashSet<i64> = self.authors.iter().map(Model::primary_key).collect();
        let tags: HashSet<i64> = self.tags.iter().map(Model::primary_key).collect();
        let moderators: HashSet<i64> = self.moderators.iter().map(Model::primary_key).collect();

        for course in &self.courses {
            if !authors.contains(&course.author_id) {
                return Err(dangling("course", course.id, "author", course.author_id));
            }
            if let Some(tag_id) = course.tag_ids.iter().find(|id| !tags.contains(*id)) {
                return Err(dangling("course", course.id, "tag", *tag_id));
            }
        }

        let mut addressed = HashSet::new();
        for address in &self.addresses {
            if !authors.contains(&address.author_id) {
                return Err(dangling("address", address.id, "author", address.author_id));
            }
            if !addressed.insert(address.author_id) {
                return Err(ModelError::Configuration(format!(
                    "Author {} has more than one address",
                    address.author_id
                )));
            }
        }

        for tag in &self.tags {
            if let Some(moderator_id) = tag.moderator_id {
                if !moderators.contains(&moderator_id) {
                    return Err(dangling("tag", tag.id, "moderator", moderator_id));
                }
            }
        }

        Ok(())
    }

    /// Rows per table, ready for the in-memory database
    pub fn into_tables(self) -> ModelResult<Vec<(&'static str, Vec<Value>)>> {
        Ok(vec![
            (Author::table_name(), rows(&self.authors)?),
            (Address::table_name(), rows(&self.addresses)?),
            (Course::table_name(), rows(&self.courses)?),
            (Tag::table_name(), rows(&self.tags)?),
            (Moderator::table_name(), rows(&self.moderators)?),
        ])
    }
}

fn rows<M: Model>(models: &[M]) -> ModelResult<Vec<Value>> {
    models
        .iter()
        .map(|model| Ok(Value::Object(model.to_fields()?)))
        .collect()
}

fn dangling(entity: &str, id: i64, reference: &str, target: i64) -> ModelError {
    ModelError::Configuration(format!(
        "{} {} references missing {} {}",
        entity, id, reference, target
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_demo_dataset_is_valid() {
        let dataset = Dataset::demo();
        assert!(dataset.validate().is_ok());
        assert_eq!(dataset.courses.len(), 3);
    }

    #[test]
    fn test_missing_author_rejected() {
        let mut dataset = Dataset::demo();
        dataset.courses[0].author_id = 99;
        let err = dataset.validate().unwrap_err();
        assert_eq!(err, ModelError::Configuration("course 1 references missing author 99".to_string()));
    }

    #[test]
    fn test_missing_tag_and_moderator_rejected() {
        let mut dataset = Dataset::demo();
        dataset.courses[2].tag_ids.push(42);
        assert!(dataset.validate().is_err());

        let mut dataset = Dataset::demo();
        dataset.tags[1].moderator_id = Some(5);
        assert!(dataset.validate().is_err());
    }

    #[test]
    fn test_partial_json_dataset() {
        let dataset = Dataset::from_json_str(r#"{"authors": [{"id": 1, "name": "A"}]}"#).unwrap();
        assert_eq!(dataset.authors.len(), 1);
        assert!(dataset.courses.is_empty());
        assert!(dataset.validate().is_ok());

        let tables = dataset.into_tables().unwrap();
        assert_eq!(tables[0].0, "authors");
        assert_eq!(tables[0].1.len(), 1);
    }

    #[tokio::test]
    async fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&Dataset::demo()).unwrap()).unwrap();

        let dataset = Dataset::from_file(file.path()).await.unwrap();
        assert_eq!(dataset, Dataset::demo());

        let missing = Dataset::from_file("/nonexistent/loadkit.json").await;
        assert!(matches!(missing, Err(ModelError::Configuration(_))));
    }
}
