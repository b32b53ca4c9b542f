//! Authentication context: the per-round public parameters shared by every
//! participant.
//!
//! Grounded on the "interface-typed context" design note: the minimal
//! capability set an `AuthenticationContext` must expose is `Members`,
//! `ClientsGenerators`, `ServersSecretsCommitments`. Here that capability
//! set is simply the public fields of one concrete struct rather than a
//! trait, since this crate does not need to support contexts backed by
//! other storage.

use curve25519_dalek::traits::Identity;
use serde::{Deserialize, Serialize};

use crate::errors::DagaError;
use crate::group::{self, hash_to_point, Point};

const CLIENT_GENERATOR_DOMAIN: &[u8] = b"daga/client-generator/v1";

/// `C = (X, Y, H_gens, R)`: client keys, server keys, per-client generators,
/// and per-round server commitments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Ordered client public keys, `n = X.len() >= 2`.
    #[serde(with = "group::point_vec_serde")]
    pub x: Vec<Point>,
    /// Ordered server public keys, `m = Y.len() >= 1`.
    #[serde(with = "group::point_vec_serde")]
    pub y: Vec<Point>,
    /// Per-client generators with unknown discrete log w.r.t. `G`.
    #[serde(with = "group::point_vec_serde")]
    pub h_gens: Vec<Point>,
    /// Per-round server commitments, `R[j] = r_j * G`.
    #[serde(with = "group::point_vec_serde")]
    pub r: Vec<Point>,
    /// Opaque bytes identifying this round, for domain separation of the
    /// per-client generators and for logging; carries no cryptographic
    /// weight on its own.
    pub round_id: Vec<u8>,
}

impl Context {
    /// Builds a context, deriving `H_gens` deterministically from `(i,
    /// round_id)` so that every participant computes the same generators
    /// without anyone learning their discrete log.
    pub fn new(
        x: Vec<Point>,
        y: Vec<Point>,
        r: Vec<Point>,
        round_id: Vec<u8>,
    ) -> Result<Self, DagaError> {
        if x.len() < 2 {
            return Err(DagaError::MalformedMessage(
                "context requires at least two clients".into(),
            ));
        }
        if y.is_empty() {
            return Err(DagaError::MalformedMessage(
                "context requires at least one server".into(),
            ));
        }
        if y.len() != r.len() {
            return Err(DagaError::MalformedMessage(
                "server keys and round commitments must have equal length".into(),
            ));
        }
        if x.iter().chain(y.iter()).chain(r.iter()).any(|p| *p == Point::identity()) {
            return Err(DagaError::BadPoint);
        }

        let h_gens: Vec<Point> = (0..x.len())
            .map(|i| {
                hash_to_point(
                    CLIENT_GENERATOR_DOMAIN,
                    &[&round_id, &(i as u64).to_be_bytes()],
                )
            })
            .collect();

        Ok(Context {
            x,
            y,
            h_gens,
            r,
            round_id,
        })
    }

    /// Number of clients in the group.
    pub fn n(&self) -> usize {
        self.x.len()
    }

    /// Number of servers in the cothority.
    pub fn m(&self) -> usize {
        self.y.len()
    }

    /// `Members() -> (X, Y)`.
    pub fn members(&self) -> (&[Point], &[Point]) {
        (&self.x, &self.y)
    }

    /// `ClientsGenerators() -> H_gens`.
    pub fn clients_generators(&self) -> &[Point] {
        &self.h_gens
    }

    /// `ServersSecretsCommitments() -> R`.
    pub fn servers_secrets_commitments(&self) -> &[Point] {
        &self.r
    }

    /// Canonical, length-prefixed encoding of every field in declaration
    /// order — used wherever the context itself must be hashed or signed
    /// by an out-of-scope context-creation facility.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for p in &self.x {
            group::write_lp(&mut out, &group::encode_point(p));
        }
        for p in &self.y {
            group::write_lp(&mut out, &group::encode_point(p));
        }
        for p in &self.h_gens {
            group::write_lp(&mut out, &group::encode_point(p));
        }
        for p in &self.r {
            group::write_lp(&mut out, &group::encode_point(p));
        }
        group::write_lp(&mut out, &self.round_id);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{generator, random_scalar};
    use rand::rngs::OsRng;

    fn sample(n: usize, m: usize) -> Context {
        let mut rng = OsRng;
        let x = (0..n).map(|_| generator() * random_scalar(&mut rng)).collect();
        let y = (0..m).map(|_| generator() * random_scalar(&mut rng)).collect();
        let r = (0..m).map(|_| generator() * random_scalar(&mut rng)).collect();
        Context::new(x, y, r, b"round-1".to_vec()).unwrap()
    }

    #[test]
    fn generators_are_deterministic_given_round_id() {
        let c1 = {
            let mut rng = OsRng;
            let x: Vec<Point> = (0..3).map(|_| generator() * random_scalar(&mut rng)).collect();
            let y = vec![generator() * random_scalar(&mut rng)];
            let r = vec![generator() * random_scalar(&mut rng)];
            Context::new(x, y, r, b"fixed".to_vec()).unwrap()
        };
        // Recompute H_gens independently from the same round id and client count.
        let h_again: Vec<Point> = (0..c1.n())
            .map(|i| hash_to_point(CLIENT_GENERATOR_DOMAIN, &[b"fixed", &(i as u64).to_be_bytes()]))
            .collect();
        assert_eq!(c1.h_gens, h_again);
    }

    #[test]
    fn rejects_mismatched_server_lengths() {
        let mut rng = OsRng;
        let x: Vec<Point> = (0..2).map(|_| generator() * random_scalar(&mut rng)).collect();
        let y = vec![generator() * random_scalar(&mut rng); 2];
        let r = vec![generator() * random_scalar(&mut rng); 1];
        assert!(Context::new(x, y, r, b"r".to_vec()).is_err());
    }

    #[test]
    fn canonical_bytes_change_with_round_id() {
        let c1 = sample(2, 1);
        let mut c2 = c1.clone();
        c2.round_id = b"different".to_vec();
        assert_ne!(c1.canonical_bytes(), c2.canonical_bytes());
    }
}
