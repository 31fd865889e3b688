//! Course catalogue models
//!
//! Courses are written by one author and carry any number of tags. Authors
//! may have an address; tags may have a moderator.

pub mod author;
pub mod course;
pub mod tag;

pub use author::{Address, Author};
pub use course::Course;
pub use tag::{Moderator, Tag};

use crate::error::ModelResult;
use crate::relationships::RelationshipRegistry;

/// Registry holding every relationship of the course catalogue
pub fn course_catalog() -> ModelResult<RelationshipRegistry> {
    let registry = RelationshipRegistry::new();
    registry.register_model::<Course>()?;
    registry.register_model::<Author>()?;
    registry.register_model::<Address>()?;
    registry.register_model::<Tag>()?;
    registry.register_model::<Moderator>()?;
    Ok(registry)
}
