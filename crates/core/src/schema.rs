//! Collection schema for image search collections.
//!
//! Every collection has the same three fields: an auto-id `Int64` primary key,
//! a float vector of the collection's dimensionality, and a length-capped
//! VarChar holding the asset URL.

use crate::config;
use crate::error::{Result, SearchError};

/// Scalar or vector type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Int64,
    FloatVector { dim: usize },
    VarChar { max_length: usize },
}

/// A single field in a collection schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    pub name: &'static str,
    pub field_type: FieldType,
    pub is_primary: bool,
    pub auto_id: bool,
}

/// Schema of an image search collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSchema {
    pub name: String,
    pub description: &'static str,
    pub fields: Vec<FieldSchema>,
}

impl CollectionSchema {
    /// Builds the fixed three-field schema.
    ///
    /// Fails with [`SearchError::Schema`] when `dimension` is not positive or
    /// exceeds [`config::MAX_DIMENSION`], and with [`SearchError::Config`] for an
    /// invalid collection name.
    pub fn image_search(name: &str, dimension: i64) -> Result<Self> {
        validate_collection_name(name)?;
        if dimension <= 0 || dimension > config::MAX_DIMENSION {
            return Err(SearchError::Schema(format!(
                "dimension must be 1-{}, got {}",
                config::MAX_DIMENSION,
                dimension
            )));
        }

        Ok(Self {
            name: name.to_string(),
            description: config::COLLECTION_DESCRIPTION,
            fields: vec![
                FieldSchema {
                    name: config::ID_FIELD,
                    field_type: FieldType::Int64,
                    is_primary: true,
                    auto_id: true,
                },
                FieldSchema {
                    name: config::VECTOR_FIELD,
                    field_type: FieldType::FloatVector {
                        dim: dimension as usize,
                    },
                    is_primary: false,
                    auto_id: false,
                },
                FieldSchema {
                    name: config::URL_FIELD,
                    field_type: FieldType::VarChar {
                        max_length: config::URL_MAX_LEN,
                    },
                    is_primary: false,
                    auto_id: false,
                },
            ],
        })
    }

    /// Dimensionality of the vector field.
    pub fn dimension(&self) -> usize {
        self.fields
            .iter()
            .find_map(|f| match f.field_type {
                FieldType::FloatVector { dim } => Some(dim),
                _ => None,
            })
            .unwrap_or(0)
    }
}

/// Validates a collection name against the store's naming rules.
///
/// Names are 1-255 characters of ASCII letters, digits and `_`, and must not
/// start with a digit.
pub fn validate_collection_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > config::MAX_COLLECTION_NAME_LEN {
        return Err(SearchError::Config(format!(
            "collection_name must be 1-{} characters",
            config::MAX_COLLECTION_NAME_LEN
        )));
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(SearchError::Config(
            "collection_name must start with a letter or '_'".into(),
        ));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SearchError::Config(
            "collection_name must contain only ASCII letters, digits, or '_'".into(),
        ));
    }
    Ok(())
}
