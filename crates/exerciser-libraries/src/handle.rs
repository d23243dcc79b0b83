use crate::error::LibraryLoadError;
use crate::module::{LibraryExport, LibraryModule};
use exerciser_core::{Binding, Bindings, ModuleBinding};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Where to fetch a library and which name to bind it under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalLibrarySpec {
    pub url: String,
    #[serde(rename = "moduleName")]
    pub module_name: String,
}

impl ExternalLibrarySpec {
    pub fn new(url: impl Into<String>, module_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            module_name: module_name.into(),
        }
    }
}

/// Parses `url=name`; the last `=` separates the name, so query strings survive
impl FromStr for ExternalLibrarySpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (url, name) = s
            .rsplit_once('=')
            .ok_or_else(|| format!("expected <url>=<module name>, got '{}'", s))?;
        let (url, name) = (url.trim(), name.trim());
        if url.is_empty() || name.is_empty() {
            return Err(format!("expected <url>=<module name>, got '{}'", s));
        }
        Ok(Self::new(url, name))
    }
}

/// Outcome of loading one library
///
/// Either the module loaded completely or `load_error` says why not; a handle
/// never exposes a partially initialized module.
#[derive(Debug)]
pub struct LibraryHandle {
    pub spec: ExternalLibrarySpec,
    module: Option<Arc<LibraryModule>>,
    load_error: Option<LibraryLoadError>,
}

impl LibraryHandle {
    pub fn loaded(spec: ExternalLibrarySpec, module: LibraryModule) -> Self {
        Self {
            spec,
            module: Some(Arc::new(module)),
            load_error: None,
        }
    }

    pub fn failed(spec: ExternalLibrarySpec, error: LibraryLoadError) -> Self {
        Self {
            spec,
            module: None,
            load_error: Some(error),
        }
    }

    pub fn module_name(&self) -> &str {
        &self.spec.module_name
    }

    pub fn is_loaded(&self) -> bool {
        self.module.is_some()
    }

    pub fn module(&self) -> Option<&Arc<LibraryModule>> {
        self.module.as_ref()
    }

    pub fn load_error(&self) -> Option<&LibraryLoadError> {
        self.load_error.as_ref()
    }

    /// Exports of the loaded module; empty when loading failed
    pub fn exports(&self) -> &[LibraryExport] {
        self.module.as_deref().map(LibraryModule::exports).unwrap_or(&[])
    }
}

/// Bind every loaded library under its module name
pub fn library_bindings(handles: &[LibraryHandle]) -> Bindings {
    handles
        .iter()
        .filter_map(|handle| {
            let module = handle.module.as_ref()?;
            Some((
                handle.spec.module_name.clone(),
                Binding::Library(Arc::clone(module) as Arc<dyn ModuleBinding>),
            ))
        })
        .collect()
}
