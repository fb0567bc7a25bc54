use std::fmt;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Proof that `(hash, name)` was registered; renders as the download path
/// suffix `hash/name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryToken {
    pub hash: String,
    pub name: String,
}

impl fmt::Display for DeliveryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.hash, self.name)
    }
}

/// Time-limited download authorizations.
///
/// Registering refreshes the issue time. Expired entries are not purged;
/// they simply stop authorizing.
#[derive(Debug)]
pub struct DeliveryGate {
    ttl: Duration,
    issued: DashMap<(String, String), Instant>,
}

impl DeliveryGate {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            issued: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn register(&self, hash: &str, name: &str) -> DeliveryToken {
        self.register_at(hash, name, Instant::now())
    }

    pub fn register_at(&self, hash: &str, name: &str, now: Instant) -> DeliveryToken {
        self.issued
            .insert((hash.to_string(), name.to_string()), now);
        DeliveryToken {
            hash: hash.to_string(),
            name: name.to_string(),
        }
    }

    pub fn authorize(&self, hash: &str, name: &str) -> bool {
        self.authorize_at(hash, name, Instant::now())
    }

    pub fn authorize_at(&self, hash: &str, name: &str, now: Instant) -> bool {
        self.issued
            .get(&(hash.to_string(), name.to_string()))
            .is_some_and(|issued| now.saturating_duration_since(*issued) < self.ttl)
    }

    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }
}
