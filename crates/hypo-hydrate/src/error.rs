use thiserror::Error;

pub type Result<T> = std::result::Result<T, HydrationError>;

#[derive(Debug, Error)]
pub enum HydrationError {
    #[error(transparent)]
    Core(#[from] hypo_core::CoreError),

    #[error(transparent)]
    Type(#[from] hypo_types::TypeError),

    #[error("hydrating class `{class_name}`")]
    Class {
        class_name: String,
        #[source]
        source: Box<HydrationError>,
    },

    #[error("hydration provider `{provider}` failed on `{target}`")]
    Provider {
        provider: &'static str,
        target: String,
        #[source]
        source: Box<HydrationError>,
    },
}

impl HydrationError {
    pub(crate) fn for_class(class_name: impl Into<String>, source: HydrationError) -> Self {
        HydrationError::Class {
            class_name: class_name.into(),
            source: Box::new(source),
        }
    }

    pub(crate) fn for_provider(
        provider: &'static str,
        target: impl Into<String>,
        source: HydrationError,
    ) -> Self {
        HydrationError::Provider {
            provider,
            target: target.into(),
            source: Box::new(source),
        }
    }
}
