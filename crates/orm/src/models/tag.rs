use serde::{Deserialize, Serialize};

use crate::model::Model;
use crate::relationships::RelationshipMetadata;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub moderator_id: Option<i64>,
}

impl Model for Tag {
    fn table_name() -> &'static str {
        "tags"
    }

    fn primary_key(&self) -> i64 {
        self.id
    }

    fn relationships() -> Vec<RelationshipMetadata> {
        vec![RelationshipMetadata::belongs_to("tags", "Moderator", "moderators", "moderator_id")]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moderator {
    pub id: i64,
    pub name: String,
}

impl Model for Moderator {
    fn table_name() -> &'static str {
        "moderators"
    }

    fn primary_key(&self) -> i64 {
        self.id
    }
}
