// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::time::Duration;

use platform_kernel::cost::SizeCostPolicy;
use platform_kernel::config::{DEFAULT_CREDITS_PER_BYTE, DEFAULT_CREDITS_PER_OPERATION};
use platform_kernel::types::{Credits, Duffs};

use crate::errors::NodeError;

/// Spacing and bound of a reconciliation loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollOptions {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self { interval, max_attempts }
    }
}

/// Exponential backoff for transport-level broadcast failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: u32,
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (1-indexed), clamped to `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            multiplier: 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeConfig {
    /// Read-after-write reconciliation.
    pub poll: PollOptions,
    /// Waiting for an instant or chain lock on a funding transaction.
    pub proof_poll: PollOptions,
    pub broadcast_retry: BackoffPolicy,
    /// Local network: delay before an accepted transition is readable.
    pub propagation_delay: Duration,
    /// Local network: delay before a broadcast transaction is instant-locked.
    pub instant_lock_delay: Duration,
    pub credits_per_byte: Credits,
    pub credits_per_operation: Credits,
    /// Amount locked when registering an identity.
    pub identity_funding_duffs: Duffs,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            poll: PollOptions::new(Duration::from_millis(500), 20),
            proof_poll: PollOptions::new(Duration::from_millis(250), 40),
            broadcast_retry: BackoffPolicy::default(),
            propagation_delay: Duration::from_millis(300),
            instant_lock_delay: Duration::from_millis(200),
            credits_per_byte: DEFAULT_CREDITS_PER_BYTE,
            credits_per_operation: DEFAULT_CREDITS_PER_OPERATION,
            identity_funding_duffs: 10_000,
        }
    }
}

impl NodeConfig {
    /// Defaults overridden by `PLATFORM_*` environment variables.
    pub fn from_env() -> Result<Self, NodeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, NodeError> {
        let mut cfg = Self::default();

        if let Some(ms) = parse::<u64>(&lookup, "PLATFORM_POLL_INTERVAL_MS")? {
            cfg.poll.interval = Duration::from_millis(ms);
        }
        if let Some(n) = parse::<u32>(&lookup, "PLATFORM_POLL_MAX_ATTEMPTS")? {
            cfg.poll.max_attempts = n;
        }
        if let Some(ms) = parse::<u64>(&lookup, "PLATFORM_PROOF_INTERVAL_MS")? {
            cfg.proof_poll.interval = Duration::from_millis(ms);
        }
        if let Some(n) = parse::<u32>(&lookup, "PLATFORM_PROOF_MAX_ATTEMPTS")? {
            cfg.proof_poll.max_attempts = n;
        }
        if let Some(ms) = parse::<u64>(&lookup, "PLATFORM_PROPAGATION_DELAY_MS")? {
            cfg.propagation_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = parse::<u64>(&lookup, "PLATFORM_INSTANT_LOCK_DELAY_MS")? {
            cfg.instant_lock_delay = Duration::from_millis(ms);
        }
        if let Some(v) = parse::<Credits>(&lookup, "PLATFORM_CREDITS_PER_BYTE")? {
            cfg.credits_per_byte = v;
        }
        if let Some(v) = parse::<Credits>(&lookup, "PLATFORM_CREDITS_PER_OPERATION")? {
            cfg.credits_per_operation = v;
        }
        if let Some(v) = parse::<Duffs>(&lookup, "PLATFORM_IDENTITY_FUNDING_DUFFS")? {
            cfg.identity_funding_duffs = v;
        }

        Ok(cfg)
    }

    pub fn cost_policy(&self) -> SizeCostPolicy {
        SizeCostPolicy::new(self.credits_per_byte, self.credits_per_operation)
    }
}

fn parse<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, NodeError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| NodeError::Config(format!("{key}={raw:?} is not a valid value"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_overrides() {
        assert_eq!(NodeConfig::from_lookup(lookup(&[])).unwrap(), NodeConfig::default());
    }

    #[test]
    fn test_overrides_are_applied() {
        let cfg = NodeConfig::from_lookup(lookup(&[
            ("PLATFORM_POLL_INTERVAL_MS", "10"),
            ("PLATFORM_POLL_MAX_ATTEMPTS", "3"),
            ("PLATFORM_CREDITS_PER_BYTE", " 7 "),
        ]))
        .unwrap();

        assert_eq!(cfg.poll, PollOptions::new(Duration::from_millis(10), 3));
        assert_eq!(cfg.cost_policy(), SizeCostPolicy::new(7, DEFAULT_CREDITS_PER_OPERATION));
    }

    #[test]
    fn test_bad_value_is_a_config_error() {
        let err = NodeConfig::from_lookup(lookup(&[("PLATFORM_PROOF_MAX_ATTEMPTS", "many")])).unwrap_err();
        assert!(matches!(err, NodeError::Config(msg) if msg.contains("PLATFORM_PROOF_MAX_ATTEMPTS")));
    }

    #[test]
    fn test_backoff_delays_grow_and_clamp() {
        let policy = BackoffPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            multiplier: 2,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(350));
        assert_eq!(policy.delay_for(40), Duration::from_millis(350));
    }
}
