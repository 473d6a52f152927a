use thiserror::Error;

use crate::registry::MergeFailure;

pub type Result<T> = std::result::Result<T, MappingsError>;

#[derive(Debug, Error)]
pub enum MappingsError {
    #[error(transparent)]
    Core(#[from] hypo_core::CoreError),

    #[error(transparent)]
    Type(#[from] hypo_types::TypeError),

    #[error("contributor `{contributor}` failed on `{class_name}`")]
    Contributor {
        contributor: &'static str,
        class_name: String,
        #[source]
        source: Box<MappingsError>,
    },

    #[error("{} change(s) could not be registered; first: {}", .failures.len(), .failures[0])]
    Merge { failures: Vec<MergeFailure> },
}

impl MappingsError {
    pub(crate) fn for_contributor(
        contributor: &'static str,
        class_name: impl Into<String>,
        source: MappingsError,
    ) -> Self {
        MappingsError::Contributor {
            contributor,
            class_name: class_name.into(),
            source: Box::new(source),
        }
    }
}
