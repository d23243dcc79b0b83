//! Runtime Registry - the single live expression runtime
//!
//! Installing a runtime bumps the registry generation and clears the live
//! slot; the runtime is published once its module has been fetched and
//! compiled, and only if no newer install happened in the meantime.
//! Evaluations take an `Arc` snapshot of the live runtime, so switching the
//! origin never disturbs an evaluation already in flight.

use crate::error::RuntimeLoadError;
use crate::runtime::ExpressionRuntime;
use crate::wasm::WasmRuntimeLoader;
use exerciser_core::{fetch_bytes, Endpoints, Origin, RuntimeHandle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, error, info};

/// Turns fetched runtime source into an executable runtime
pub trait RuntimeLoader: Send + Sync {
    fn load(&self, origin: &Origin, source: &[u8]) -> Result<Arc<dyn ExpressionRuntime>, RuntimeLoadError>;
}

/// A ready runtime together with the install it came from
#[derive(Clone)]
pub struct LiveRuntime {
    pub origin: Origin,
    pub generation: u64,
    pub runtime: Arc<dyn ExpressionRuntime>,
}

struct Slot {
    origin: Origin,
    generation: u64,
    runtime: Option<Arc<dyn ExpressionRuntime>>,
    load_error: Option<String>,
}

/// Owner of the live runtime slot
pub struct RuntimeRegistry {
    client: reqwest::Client,
    endpoints: Endpoints,
    loader: Arc<dyn RuntimeLoader>,
    next_generation: AtomicU64,
    slot: RwLock<Slot>,
}

impl RuntimeRegistry {
    /// A registry that loads WebAssembly runtimes
    pub fn new(client: reqwest::Client, endpoints: Endpoints) -> Arc<Self> {
        Self::with_loader(client, endpoints, Arc::new(WasmRuntimeLoader))
    }

    pub fn with_loader(client: reqwest::Client, endpoints: Endpoints, loader: Arc<dyn RuntimeLoader>) -> Arc<Self> {
        Arc::new(Self {
            client,
            endpoints,
            loader,
            next_generation: AtomicU64::new(1),
            slot: RwLock::new(Slot {
                origin: Origin::latest(),
                generation: 0,
                runtime: None,
                load_error: None,
            }),
        })
    }

    /// Start installing the runtime for `origin` in the background
    ///
    /// The returned handle is not ready yet. Must be called from within a
    /// Tokio runtime.
    pub fn install_runtime(self: &Arc<Self>, origin: Origin) -> RuntimeHandle {
        let generation = self.begin_install(origin.clone());
        let registry = Arc::clone(self);
        let task_origin = origin.clone();
        tokio::spawn(async move {
            registry.complete_install(task_origin, generation).await;
        });
        RuntimeHandle::pending(origin, generation)
    }

    /// Install the runtime for `origin` and wait for the load to finish
    pub async fn load_runtime(&self, origin: Origin) -> RuntimeHandle {
        let generation = self.begin_install(origin.clone());
        self.complete_install(origin, generation).await;
        self.handle()
    }

    /// Install an already constructed runtime; it is ready immediately
    pub fn install_runtime_with(
        &self,
        origin: Origin,
        runtime: Arc<dyn ExpressionRuntime>,
    ) -> RuntimeHandle {
        let mut slot = self.write_slot();
        let generation = self.replace_slot(&mut slot, origin, Some(runtime));
        info!(origin = %slot.origin, generation, "runtime installed");
        snapshot(&slot)
    }

    pub fn is_ready(&self) -> bool {
        self.read_slot().runtime.is_some()
    }

    pub fn current_origin(&self) -> Origin {
        self.read_slot().origin.clone()
    }

    /// Snapshot of the live slot
    pub fn handle(&self) -> RuntimeHandle {
        snapshot(&self.read_slot())
    }

    /// The live runtime, if it has finished loading
    pub fn live(&self) -> Option<LiveRuntime> {
        let slot = self.read_slot();
        slot.runtime.as_ref().map(|runtime| LiveRuntime {
            origin: slot.origin.clone(),
            generation: slot.generation,
            runtime: Arc::clone(runtime),
        })
    }

    /// Wait until a runtime is live, polling every `poll`
    pub async fn wait_ready(&self, poll: Duration) -> LiveRuntime {
        loop {
            if let Some(live) = self.live() {
                return live;
            }
            debug!(origin = %self.current_origin(), "runtime not ready; deferring evaluation");
            tokio::time::sleep(poll).await;
        }
    }

    fn begin_install(&self, origin: Origin) -> u64 {
        let mut slot = self.write_slot();
        self.replace_slot(&mut slot, origin, None)
    }

    /// Swap in a new install; the generation is taken under the same guard,
    /// so slot generations only ever grow
    fn replace_slot(
        &self,
        slot: &mut Slot,
        origin: Origin,
        runtime: Option<Arc<dyn ExpressionRuntime>>,
    ) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        if slot.runtime.is_some() || slot.generation != 0 {
            debug!(previous = %slot.origin, generation = slot.generation, "superseding runtime");
        }
        *slot = Slot {
            origin,
            generation,
            runtime,
            load_error: None,
        };
        generation
    }

    async fn complete_install(&self, origin: Origin, generation: u64) {
        let url = self.endpoints.runtime_url(&origin);
        info!(%origin, %url, generation, "installing runtime");

        let result = match fetch_bytes(&self.client, &url).await {
            Ok(source) => self.loader.load(&origin, &source),
            Err(err) => Err(RuntimeLoadError::from(err)),
        };

        let mut slot = self.write_slot();
        if slot.generation != generation {
            debug!(%origin, generation, "install superseded; discarding");
            return;
        }
        match result {
            Ok(runtime) => {
                info!(%origin, generation, "runtime ready");
                slot.runtime = Some(runtime);
            }
            Err(err) => {
                error!(%origin, generation, error = %err, "runtime install failed");
                slot.load_error = Some(err.to_string());
            }
        }
    }

    fn read_slot(&self) -> RwLockReadGuard<'_, Slot> {
        self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, Slot> {
        self.slot.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn snapshot(slot: &Slot) -> RuntimeHandle {
    RuntimeHandle {
        origin: slot.origin.clone(),
        generation: slot.generation,
        loaded: slot.runtime.is_some(),
        bindings_available: slot
            .runtime
            .as_ref()
            .map(|r| r.capabilities().bindings)
            .unwrap_or(false),
        load_error: slot.load_error.clone(),
    }
}
