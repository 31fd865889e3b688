use serde::{Deserialize, Serialize};

use crate::model::Model;
use crate::relationships::RelationshipMetadata;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub price: f64,
    pub author_id: i64,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

impl Model for Course {
    fn table_name() -> &'static str {
        "courses"
    }

    fn primary_key(&self) -> i64 {
        self.id
    }

    fn relationships() -> Vec<RelationshipMetadata> {
        vec![
            RelationshipMetadata::belongs_to("courses", "Author", "authors", "author_id"),
            RelationshipMetadata::many_to_many("courses", "Tags", "tags", "tag_ids"),
        ]
    }
}
