//! Typed failures crossing the model boundary.
//!
//! Every error carries a [`ModelStatus`] code so callers can tell a
//! retryable condition (a fetch timeout) from a permanent one (an element
//! that no longer exists) without matching on message text.

use serde::Serialize;
use std::fmt;

use crate::element::JavaElement;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelStatus {
    ElementDoesNotExist,
    ReadOnly,
    InvalidElementTypes,
    IndexOutOfBounds,
    InvalidContents,
    InvalidMemento,
    CannotRetrieveAttachedJavadoc,
    CannotRetrieveAttachedJavadocTimeout,
    IoException,
    Cancelled,
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModelStatus::ElementDoesNotExist => "ELEMENT_DOES_NOT_EXIST",
            ModelStatus::ReadOnly => "READ_ONLY",
            ModelStatus::InvalidElementTypes => "INVALID_ELEMENT_TYPES",
            ModelStatus::IndexOutOfBounds => "INDEX_OUT_OF_BOUNDS",
            ModelStatus::InvalidContents => "INVALID_CONTENTS",
            ModelStatus::InvalidMemento => "INVALID_MEMENTO",
            ModelStatus::CannotRetrieveAttachedJavadoc => "CANNOT_RETRIEVE_ATTACHED_JAVADOC",
            ModelStatus::CannotRetrieveAttachedJavadocTimeout => {
                "CANNOT_RETRIEVE_ATTACHED_JAVADOC_TIMEOUT"
            }
            ModelStatus::IoException => "IO_EXCEPTION",
            ModelStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("{} does not exist", .0.to_string_with_ancestors())]
    DoesNotExist(JavaElement),

    #[error("{} is read-only", .0.to_string_with_ancestors())]
    ReadOnly(JavaElement),

    #[error("invalid element type for {}: {message}", .element.to_string_with_ancestors())]
    InvalidElementTypes {
        element: JavaElement,
        message: String,
    },

    #[error("index out of bounds: {0}")]
    IndexOutOfBounds(String),

    #[error("invalid contents in {location}: {message}")]
    InvalidContents { location: String, message: String },

    #[error("invalid memento {memento:?}: {message}")]
    InvalidMemento { memento: String, message: String },

    #[error("cannot retrieve attached javadoc from {url}: {message}")]
    AttachedJavadoc { url: String, message: String },

    #[error("timed out retrieving attached javadoc from {url}")]
    AttachedJavadocTimeout { url: String },

    #[error("io error on {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("operation cancelled")]
    Cancelled,
}

impl ModelError {
    pub fn status(&self) -> ModelStatus {
        match self {
            ModelError::DoesNotExist(_) => ModelStatus::ElementDoesNotExist,
            ModelError::ReadOnly(_) => ModelStatus::ReadOnly,
            ModelError::InvalidElementTypes { .. } => ModelStatus::InvalidElementTypes,
            ModelError::IndexOutOfBounds(_) => ModelStatus::IndexOutOfBounds,
            ModelError::InvalidContents { .. } => ModelStatus::InvalidContents,
            ModelError::InvalidMemento { .. } => ModelStatus::InvalidMemento,
            ModelError::AttachedJavadoc { .. } => ModelStatus::CannotRetrieveAttachedJavadoc,
            ModelError::AttachedJavadocTimeout { .. } => {
                ModelStatus::CannotRetrieveAttachedJavadocTimeout
            }
            ModelError::Io { .. } => ModelStatus::IoException,
            ModelError::Cancelled => ModelStatus::Cancelled,
        }
    }

    pub fn is_does_not_exist(&self) -> bool {
        self.status() == ModelStatus::ElementDoesNotExist
    }

    pub fn io(location: impl Into<String>, source: std::io::Error) -> Self {
        ModelError::Io {
            location: location.into(),
            source,
        }
    }

    pub fn invalid_contents(location: impl Into<String>, message: impl Into<String>) -> Self {
        ModelError::InvalidContents {
            location: location.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::JavaElement;

    #[test]
    fn status_codes_follow_variants() {
        let project = JavaElement::model().project("P");
        let missing = ModelError::DoesNotExist(project.clone());
        assert!(missing.is_does_not_exist());
        assert_eq!(missing.to_string(), "P does not exist");

        let timeout = ModelError::AttachedJavadocTimeout {
            url: "http://example.invalid/doc".to_string(),
        };
        assert_eq!(
            timeout.status(),
            ModelStatus::CannotRetrieveAttachedJavadocTimeout
        );
        assert_eq!(
            ModelStatus::CannotRetrieveAttachedJavadocTimeout.to_string(),
            "CANNOT_RETRIEVE_ATTACHED_JAVADOC_TIMEOUT"
        );
        assert_eq!(ModelError::ReadOnly(project).status(), ModelStatus::ReadOnly);
    }
}
