//! Execution tiers: how a [`Tier`] changes the worker's command line and environment.

use foreman_core::config::LocalTierConfig;
use foreman_core::Tier;

/// Env var holding the local inference endpoint.
pub const LOCAL_ENDPOINT_ENV: &str = "FOREMAN_LOCAL_ENDPOINT";
pub const DEFAULT_LOCAL_ENDPOINT: &str = "http://localhost:11434";

/// Extra arguments and environment for one worker invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

pub trait TierStrategy: Send + Sync {
    fn invocation(&self, tier: Tier) -> Invocation;
}

/// Tier mapping driven by `config.yaml`'s `local:` section.
#[derive(Debug, Clone)]
pub struct ConfiguredTiers {
    local: LocalTierConfig,
    endpoint: String,
}

impl ConfiguredTiers {
    pub fn new(local: LocalTierConfig, endpoint: impl Into<String>) -> Self {
        Self {
            local,
            endpoint: endpoint.into(),
        }
    }

    /// Endpoint from [`LOCAL_ENDPOINT_ENV`], falling back to [`DEFAULT_LOCAL_ENDPOINT`].
    pub fn from_env(local: LocalTierConfig) -> Self {
        let endpoint =
            std::env::var(LOCAL_ENDPOINT_ENV).unwrap_or_else(|_| DEFAULT_LOCAL_ENDPOINT.to_string());
        Self::new(local, endpoint)
    }
}

impl TierStrategy for ConfiguredTiers {
    fn invocation(&self, tier: Tier) -> Invocation {
        match tier {
            Tier::Default => Invocation::default(),
            Tier::Local => Invocation {
                args: vec!["--model".to_string(), self.local.model.clone()],
                env: vec![(self.local.endpoint_var.clone(), self.endpoint.clone())],
            },
        }
    }
}

/// Caller's choice, then the task's hint, then [`Tier::Default`].
pub fn resolve_tier(explicit: Option<Tier>, hint: Option<Tier>) -> Tier {
    explicit.or(hint).unwrap_or_default()
}
