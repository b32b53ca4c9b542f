//! Server-local configuration.
//!
//! These options are recognized by a server hosting the DAGA protocol core;
//! reading them from a config file and wiring them into a running service
//! is transport/deployment plumbing outside this crate's scope.

use std::time::Duration;

/// Configuration recognized by a server.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Config {
    /// Abort the challenge-generation protocol after this wall time.
    #[serde(with = "duration_secs")]
    pub timeout_challenge_generation: Duration,
    /// How long a context/round is accepted after creation.
    #[serde(with = "duration_secs")]
    pub round_lifetime: Duration,
    /// Maximum number of clients admitted into a single context.
    pub max_clients_per_context: u32,
}

impl Default for Config {
    /// `timeout_challenge_generation` defaults to 5s; the other two fields
    /// have no mandated default and are set to generous values suitable for
    /// a small cothority.
    fn default() -> Self {
        Config {
            timeout_challenge_generation: Duration::from_secs(5),
            round_lifetime: Duration::from_secs(3600),
            max_clients_per_context: 10_000,
        }
    }
}

impl Config {
    /// Scales the challenge-generation timeout with the number of servers
    /// `m` in the ring.
    pub fn timeout_for_ring_size(&self, m: usize) -> Duration {
        self.timeout_challenge_generation * (m.max(1) as u32)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
