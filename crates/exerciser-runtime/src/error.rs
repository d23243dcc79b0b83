use exerciser_core::FetchError;
use thiserror::Error;

/// Why a runtime could not be installed
#[derive(Debug, Error)]
pub enum RuntimeLoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("could not compile runtime module: {0}")]
    Compile(String),

    #[error("runtime module does not export '{0}'")]
    MissingExport(&'static str),

    #[error("runtime module imports unsupported host function {module}.{name}")]
    UnsupportedImport { module: String, name: String },
}
