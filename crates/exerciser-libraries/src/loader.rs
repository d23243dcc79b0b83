use crate::error::LibraryLoadError;
use crate::handle::{ExternalLibrarySpec, LibraryHandle};
use crate::module::LibraryModule;
use exerciser_core::fetch_bytes;
use futures_util::future::join_all;
use tracing::{info, warn};

/// Fetches and instantiates extension libraries
#[derive(Debug, Clone)]
pub struct LibraryLoader {
    client: reqwest::Client,
}

impl LibraryLoader {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Load every spec concurrently
    ///
    /// Returns one handle per spec, in the order given. Never fails: a
    /// library that cannot be loaded yields a handle carrying its error.
    pub async fn load_libraries(&self, specs: &[ExternalLibrarySpec]) -> Vec<LibraryHandle> {
        let handles = join_all(specs.iter().map(|spec| self.load_library(spec))).await;
        let loaded = handles.iter().filter(|h| h.is_loaded()).count();
        info!(requested = specs.len(), loaded, "libraries loaded");
        handles
    }

    pub async fn load_library(&self, spec: &ExternalLibrarySpec) -> LibraryHandle {
        match self.fetch_and_instantiate(spec).await {
            Ok(module) => {
                info!(module = %spec.module_name, exports = module.exports().len(), "library ready");
                LibraryHandle::loaded(spec.clone(), module)
            }
            Err(err) => {
                warn!(module = %spec.module_name, url = %spec.url, error = %err, "library failed to load");
                LibraryHandle::failed(spec.clone(), err)
            }
        }
    }

    async fn fetch_and_instantiate(&self, spec: &ExternalLibrarySpec) -> Result<LibraryModule, LibraryLoadError> {
        let source = fetch_bytes(&self.client, &spec.url).await?;
        LibraryModule::from_source(&spec.module_name, &source)
    }
}
