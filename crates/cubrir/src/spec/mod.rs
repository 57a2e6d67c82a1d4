//! OpenAPI/Swagger ingestion: document parsing, `$ref` resolution, and the
//! normalized endpoint model.

mod model;
mod schema;

pub use model::{
    Endpoint, EndpointId, HttpMethod, ParamLocation, Parameter, RequestBody, ResponseDecl,
    SpecInfo, SpecModel, SpecVersion,
};
pub use schema::{
    ArraySchema, CompositeMode, CompositeSchema, NumberSchema, ObjectSchema, SchemaArena, SchemaId,
    SchemaNode, StringSchema,
};

use crate::error::CubrirResult;
use thiserror::Error;

/// Why a spec document was rejected. Fatal: surfaced before any case runs.
#[derive(Debug, Error)]
pub enum SpecParseError {
    /// Document is not valid JSON/YAML or structurally broken
    #[error("malformed document: {message}")]
    Malformed {
        /// What was wrong
        message: String,
    },

    /// Spec version outside 2.x / 3.x
    #[error("unsupported spec version: {version}")]
    UnsupportedVersion {
        /// Declared version
        version: String,
    },

    /// `$ref` that does not resolve within the document
    #[error("unresolved reference: {reference}")]
    UnresolvedReference {
        /// The offending `$ref` value
        reference: String,
    },
}

impl SpecParseError {
    /// Create a malformed-document error
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Create an unsupported-version error
    #[must_use]
    pub fn unsupported_version(version: impl Into<String>) -> Self {
        Self::UnsupportedVersion {
            version: version.into(),
        }
    }

    /// Create an unresolved-reference error
    #[must_use]
    pub fn unresolved_reference(reference: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            reference: reference.into(),
        }
    }
}

/// Load a spec from a local path or an `http(s)://` URL.
///
/// Fetching goes through reqwest; files are read with tokio. The text is
/// handed to [`SpecModel::from_str`] either way.
pub async fn load_source(source: &str) -> CubrirResult<SpecModel> {
    let text = if source.starts_with("http://") || source.starts_with("https://") {
        reqwest::get(source).await?.error_for_status()?.text().await?
    } else {
        tokio::fs::read_to_string(source).await?
    };
    Ok(SpecModel::from_str(&text)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert!(SpecParseError::malformed("oops")
            .to_string()
            .contains("malformed"));
        assert!(SpecParseError::unsupported_version("1.0")
            .to_string()
            .contains("1.0"));
        assert!(SpecParseError::unresolved_reference("#/definitions/X")
            .to_string()
            .contains("#/definitions/X"));
    }

    #[tokio::test]
    async fn test_load_source_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.json");
        std::fs::write(
            &path,
            r#"{"openapi":"3.0.0","info":{"title":"f","version":"1"},
                "paths":{"/x":{"get":{"responses":{}}}}}"#,
        )
        .unwrap();
        let model = load_source(path.to_str().unwrap()).await.unwrap();
        assert_eq!(model.endpoints().len(), 1);
    }

    #[tokio::test]
    async fn test_load_source_missing_file() {
        let err = load_source("/definitely/not/here.json").await.unwrap_err();
        assert!(err.to_string().contains("I/O"));
    }
}
