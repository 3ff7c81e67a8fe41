//! Error type for failed first-time construction.

/// Returned by [`LazySingletonHolder::instance`](crate::LazySingletonHolder::instance)
/// when the initializer failed.
///
/// Only the thread that ran the failing attempt sees it. The failure is not
/// cached: the holder stays empty and the next call runs the initializer again.
#[derive(Debug, thiserror::Error)]
#[error("failed to construct singleton instance of `{type_name}`")]
pub struct ConstructionError {
    type_name: &'static str,
    #[source]
    source: anyhow::Error,
}

impl ConstructionError {
    pub(crate) fn new<T>(source: anyhow::Error) -> Self {
        Self {
            type_name: core::any::type_name::<T>(),
            source,
        }
    }

    /// Fully qualified name of the type whose construction failed.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The initializer's own error.
    pub fn cause(&self) -> &anyhow::Error {
        &self.source
    }

    /// Unwraps the initializer's own error.
    pub fn into_cause(self) -> anyhow::Error {
        self.source
    }
}
