use crate::RuntimeArgs;
use anyhow::{bail, Context as _};
use exerciser_core::{http_client, Backend, ExerciserConfig, Origin};
use exerciser_dispatch::Dispatcher;
use exerciser_runtime::{fetch_versions, RuntimeRegistry};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Configuration and the shared HTTP client
pub struct Context {
    pub config: ExerciserConfig,
    pub client: reqwest::Client,
}

impl Context {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => ExerciserConfig::load(path)?,
            None => ExerciserConfig::default(),
        };
        let client = http_client(config.timing.http_timeout()).context("could not set up HTTP")?;
        Ok(Self { config, client })
    }

    /// Config with the command-line overrides applied
    pub fn effective_config(&self, args: &RuntimeArgs) -> ExerciserConfig {
        let mut config = self.config.clone();
        if let Some(max_depth) = args.max_depth {
            config.governor.max_depth = max_depth;
        }
        if let Some(timeout_ms) = args.timeout_ms {
            config.governor.timeout_ms = timeout_ms;
        }
        if let Some(url) = &args.remote_url {
            config.endpoints.remote_eval_url = url.clone();
        }
        config
    }

    /// Build a dispatcher; the in-process backend first gets its runtime
    /// installed and loaded
    pub async fn dispatcher(&self, args: &RuntimeArgs) -> anyhow::Result<Arc<Dispatcher>> {
        let config = self.effective_config(args);
        let registry = RuntimeRegistry::new(self.client.clone(), config.endpoints.clone());

        if args.backend == Backend::InProcess {
            let origin = self.initial_origin(args, &config).await;
            info!(%origin, "loading runtime");
            let handle = tokio::time::timeout(
                Duration::from_secs(args.ready_timeout),
                registry.load_runtime(origin.clone()),
            )
            .await
            .with_context(|| format!("runtime {} did not load within {}s", origin, args.ready_timeout))?;
            if let Some(err) = handle.load_error {
                bail!("could not load runtime {}: {}", origin, err);
            }
        }

        Ok(Arc::new(Dispatcher::from_config(registry, self.client.clone(), &config)))
    }

    /// The origin to install first; `latest` resolves to the first entry of
    /// the version manifest when it can be read
    async fn initial_origin(&self, args: &RuntimeArgs, config: &ExerciserConfig) -> Origin {
        let origin = args.origin();
        if origin != Origin::latest() {
            return origin;
        }
        match fetch_versions(&self.client, &config.endpoints.manifest_url, false).await {
            Ok(versions) => versions.first().map(|tag| Origin::parse(tag)).unwrap_or(origin),
            Err(err) => {
                warn!(error = %err, "could not read version manifest; using latest");
                origin
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime_args() -> RuntimeArgs {
        RuntimeArgs {
            backend: Backend::Remote,
            version: "latest".into(),
            branch: None,
            ready_timeout: 1,
            max_depth: Some(64),
            timeout_ms: None,
            remote_url: Some("http://localhost:8080/parseJsonata".into()),
        }
    }

    #[test]
    fn test_overrides_applied() {
        let context = Context::load(None).unwrap();
        let config = context.effective_config(&runtime_args());
        assert_eq!(config.governor.max_depth, 64);
        assert_eq!(config.governor.timeout_ms, 1000);
        assert_eq!(config.endpoints.remote_eval_url, "http://localhost:8080/parseJsonata");
    }

    #[test]
    fn test_missing_config_file() {
        assert!(Context::load(Some(Path::new("/nonexistent/exerciser.toml"))).is_err());
    }
}
