use std::time::Duration;

/// Runtime configuration for the registry, state-sync protocol and tenant
/// metrics engine.
///
/// Use the builder pattern to customize, or [`Default`] for sensible
/// defaults drawn from the original broker's settings.
///
/// # Examples
///
/// ```rust
/// use dxlfabric::Config;
///
/// let config = Config::default()
///     .with_topic_batch_char_budget(8192)
///     .with_default_ttl_minutes(30);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Minutes a peer broker state is considered live without a refresh
    /// event, used when a peer's descriptor omits one. Default: 15.
    pub default_ttl_minutes: u32,

    /// How often the registry is swept for expired peer states.
    /// Default: 60s.
    pub sweep_interval: Duration,

    /// Minimum interval between re-emissions of `BrokerStateEvent` for the
    /// local broker in response to repeated mutations. Default: 250ms.
    pub state_event_coalesce_window: Duration,

    /// Character budget used by `batch_topics` when streaming a bulk
    /// subscription transfer. Default: 16384.
    pub topic_batch_char_budget: usize,

    /// Per-tenant connection limit. 0 means unlimited. Default: 0.
    pub tenant_connection_limit: u32,

    /// Per-tenant service-registration limit. 0 means unlimited. Default: 0.
    pub tenant_service_limit: u32,

    /// Per-tenant subscription limit. 0 means unlimited. Default: 0.
    pub tenant_subscription_limit: u32,

    /// Per-tenant sent-byte limit. 0 means unlimited. Default: 0.
    pub tenant_byte_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_ttl_minutes: 15,
            sweep_interval: Duration::from_secs(60),
            state_event_coalesce_window: Duration::from_millis(250),
            topic_batch_char_budget: 16_384,
            tenant_connection_limit: 0,
            tenant_service_limit: 0,
            tenant_subscription_limit: 0,
            tenant_byte_limit: 0,
        }
    }
}

impl Config {
    pub fn with_default_ttl_minutes(mut self, minutes: u32) -> Self {
        self.default_ttl_minutes = minutes;
        self
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_state_event_coalesce_window(mut self, window: Duration) -> Self {
        self.state_event_coalesce_window = window;
        self
    }

    pub fn with_topic_batch_char_budget(mut self, budget: usize) -> Self {
        self.topic_batch_char_budget = budget;
        self
    }

    pub fn with_tenant_connection_limit(mut self, limit: u32) -> Self {
        self.tenant_connection_limit = limit;
        self
    }

    pub fn with_tenant_service_limit(mut self, limit: u32) -> Self {
        self.tenant_service_limit = limit;
        self
    }

    pub fn with_tenant_subscription_limit(mut self, limit: u32) -> Self {
        self.tenant_subscription_limit = limit;
        self
    }

    pub fn with_tenant_byte_limit(mut self, limit: u32) -> Self {
        self.tenant_byte_limit = limit;
        self
    }
}
