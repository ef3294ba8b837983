use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

/// Token dispatch counters, registered on their own registry.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,
    pub tokens_issued_total: IntCounter,
    pub tokens_refreshed_total: IntCounter,
    pub refresh_failures_total: IntCounterVec,
    pub tokens_destroyed_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let tokens_issued_total = IntCounter::with_opts(Opts::new(
            "oauth_dispatch_tokens_issued_total",
            "Access/refresh token pairs minted by the issuance facade",
        ))?;
        let tokens_refreshed_total = IntCounter::with_opts(Opts::new(
            "oauth_dispatch_tokens_refreshed_total",
            "Refresh grants that rotated a token pair",
        ))?;
        let refresh_failures_total = IntCounterVec::new(
            Opts::new(
                "oauth_dispatch_refresh_failures_total",
                "Refresh grants rejected by the token pipeline, by OAuth2 error code",
            ),
            &["error"],
        )?;
        let tokens_destroyed_total = IntCounterVec::new(
            Opts::new(
                "oauth_dispatch_tokens_destroyed_total",
                "Token rows deleted by user-wide revocation, by schema",
            ),
            &["schema"],
        )?;

        registry.register(Box::new(tokens_issued_total.clone()))?;
        registry.register(Box::new(tokens_refreshed_total.clone()))?;
        registry.register(Box::new(refresh_failures_total.clone()))?;
        registry.register(Box::new(tokens_destroyed_total.clone()))?;

        Ok(Self {
            registry,
            tokens_issued_total,
            tokens_refreshed_total,
            refresh_failures_total,
            tokens_destroyed_total,
        })
    }
}
