//! PKclient: the OR-composed Σ-protocol a client runs to prove it owns one
//! of the group's private keys and that its initial tag/commitments are
//! well-formed.
//!
//! Predicate, one branch per client `k`:
//! `Rep(X_k, x_k, G) ∧ Rep(S_m, s, G) ∧ Rep(T0, s, h_k)`.
//! Exactly one branch (the prover's own index) is true; [`sigma::OrProof`]
//! handles the rest.

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::errors::DagaError;
use crate::group::{self, Point, Scalar, Signature};
use crate::sigma::{conjunction::Equation, Conjunction, OrProof};

const CHALLENGE_BUNDLE_DOMAIN: &[u8] = b"daga/challenge-bundle/v1";

/// `Cs = (c, sigs)`: the collectively-signed master challenge for one
/// PKclient run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeBundle {
    #[serde(with = "group::scalar_serde")]
    pub c: Scalar,
    pub sigs: Vec<(usize, Signature)>,
}

/// `P0 = (Cs, T, C, R)`: the complete PKclient proof attached to an
/// `AuthMessage`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PKclientProof {
    pub cs: ChallengeBundle,
    pub t: Vec<Vec<Point>>,
    #[serde(with = "group::scalar_vec_serde")]
    pub c: Vec<Scalar>,
    pub r: Vec<Vec<Scalar>>,
}

/// Canonical message signed by each server over a challenge bundle:
/// `c ‖ T`.
pub(crate) fn challenge_bundle_message(c: &Scalar, t: &[Vec<Point>]) -> Vec<u8> {
    let mut out = Vec::new();
    group::write_lp(&mut out, &group::encode_scalar(c));
    for branch in t {
        for p in branch {
            group::write_lp(&mut out, &group::encode_point(p));
        }
    }
    out
}

/// Builds the PKclient predicate for `context` given the prover's
/// authentication-specific public values `t0` and `s_m`.
pub fn build_predicate(context: &Context, t0: Point, s_m: Point) -> OrProof {
    let branches = (0..context.n())
        .map(|k| {
            let x_k = context.x[k];
            let h_k = context.h_gens[k];
            Conjunction::new(
                2,
                vec![
                    Equation::new(x_k, vec![(0, crate::group::generator())]),
                    Equation::new(s_m, vec![(1, crate::group::generator())]),
                    Equation::new(t0, vec![(1, h_k)]),
                ],
            )
        })
        .collect();
    OrProof::new(branches)
}

/// Verifies a challenge bundle's signatures cover every server in
/// `context.y` exactly once and are bound to exactly the commitments `t`.
pub fn verify_challenge_bundle(
    context: &Context,
    t: &[Vec<Point>],
    bundle: &ChallengeBundle,
) -> Result<(), DagaError> {
    if bundle.sigs.len() != context.m() {
        return Err(DagaError::BadChallenge(format!(
            "expected {} signatures, got {}",
            context.m(),
            bundle.sigs.len()
        )));
    }
    let message = challenge_bundle_message(&bundle.c, t);
    let mut seen = vec![false; context.m()];
    for (j, sig) in &bundle.sigs {
        if *j >= context.m() {
            return Err(DagaError::BadChallenge("server index out of range".into()));
        }
        if seen[*j] {
            return Err(DagaError::BadChallenge(format!("duplicate signature for server {j}")));
        }
        seen[*j] = true;
        group::verify(&context.y[*j], &message, sig)
            .map_err(|_| DagaError::BadChallenge(format!("signature for server {j} did not verify")))?;
    }
    if seen.iter().any(|s| !s) {
        return Err(DagaError::BadChallenge(
            "signature set does not cover every server".into(),
        ));
    }
    let _ = CHALLENGE_BUNDLE_DOMAIN; // kept for documentation symmetry with other domains
    Ok(())
}

/// Verifies a complete PKclient proof: the challenge bundle, then the
/// OR-proof itself.
pub fn verify(
    context: &Context,
    t0: Point,
    s_m: Point,
    proof: &PKclientProof,
) -> Result<(), DagaError> {
    verify_challenge_bundle(context, &proof.t, &proof.cs)?;
    let predicate = build_predicate(context, t0, s_m);
    predicate
        .verify(&proof.t, &proof.cs.c, &proof.c, &proof.r)
        .map_err(|_| DagaError::BadClientProof)
}
