use serde::{Deserialize, Serialize};

use crate::model::Model;
use crate::relationships::RelationshipMetadata;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
}

impl Model for Author {
    fn table_name() -> &'static str {
        "authors"
    }

    fn primary_key(&self) -> i64 {
        self.id
    }

    fn relationships() -> Vec<RelationshipMetadata> {
        vec![
            RelationshipMetadata::has_one("authors", "Address", "addresses", "author_id"),
            // Back-reference only; authors do not own their courses
            RelationshipMetadata::has_many("authors", "Courses", "courses", "author_id"),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub id: i64,
    pub street: String,
    pub city: String,
    pub author_id: i64,
}

impl Model for Address {
    fn table_name() -> &'static str {
        "addresses"
    }

    fn primary_key(&self) -> i64 {
        self.id
    }
}
