use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Type(#[from] hypo_types::TypeError),

    #[error("class `{0}` not found on the classpath")]
    ClassNotFound(String),

    #[error("failed to decode class `{class_name}`")]
    Decode {
        class_name: String,
        #[source]
        source: Box<CoreError>,
    },

    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// Usage bug: the offending call violated an API precondition.
    #[error("{0}")]
    Precondition(String),

    #[error("{} failure(s) while closing class sources; first: {}", .failures.len(), .failures[0])]
    Close { failures: Vec<CoreError> },
}

impl CoreError {
    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        CoreError::Precondition(message.into())
    }

    /// Fold a list of close failures into a single chained error.
    pub(crate) fn aggregate_close(failures: Vec<CoreError>) -> Result<()> {
        if failures.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Close { failures })
        }
    }
}
