use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::audit::{self, AuditSink};
use crate::auth::{CapabilityGate, IdentityCache, RoleHierarchy, ServiceAccount, TokenIdentityResolver};
use crate::config::AppConfig;
use crate::provider::{IdentityProvider, TapisClient};
use crate::views::{PgRestClient, ViewQuery};

/// Everything a request needs, shared across handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub provider: Arc<dyn IdentityProvider>,
    pub resolver: Arc<TokenIdentityResolver>,
    pub gate: Arc<CapabilityGate>,
    pub service: Arc<ServiceAccount>,
    pub views: Arc<dyn ViewQuery>,
    pub audit: Arc<dyn AuditSink>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        provider: Arc<dyn IdentityProvider>,
        views: Arc<dyn ViewQuery>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        let hierarchy = RoleHierarchy::standard();
        let resolver = TokenIdentityResolver::new(
            provider.clone(),
            hierarchy.clone(),
            IdentityCache::new(config.cache.identity_capacity),
        );
        let service = ServiceAccount::from_config(provider.clone(), &config.identity);

        Self {
            config: Arc::new(config),
            provider,
            resolver: Arc::new(resolver),
            gate: Arc::new(CapabilityGate::new(hierarchy, Default::default())),
            service: Arc::new(service),
            views,
            audit,
            started_at: Utc::now(),
        }
    }

    /// Production wiring: Tapis for identity and views, sink per config.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let tapis = TapisClient::new(&config.identity)?;
        let audit = audit::sink_from_config(&config.audit)?;
        let views = Arc::new(PgRestClient::new(tapis.clone()));
        Ok(Self::new(config, Arc::new(tapis), views, audit))
    }

    pub fn with_gate(mut self, gate: CapabilityGate) -> Self {
        self.gate = Arc::new(gate);
        self
    }

    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
