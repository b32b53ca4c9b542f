//! Composable Σ-protocol engine: `Rep`, `And`, `Or` predicates with prover
//! and verifier drivers.
//!
//! Built around a `SigmaProtocol`/`SigmaProtocolSimulator` trait pair
//! (`schnorr_protocol.rs`-style) and a `LinearRelation` builder
//! (`linear_relation/mod.rs`-style): a statement is a conjunction of linear
//! equations `target = Σ witness_i · base_i` over a shared witness vector.
//! [`Conjunction`] is that builder, narrowed from a generic `GroupVar`/
//! `ScalarVar` index abstraction (which exists to let multiple independent
//! morphisms share variable namespaces across an arbitrary DSL) down to the
//! one shape DAGA actually needs: a flat witness vector indexed by `usize`,
//! since every Σ-protocol in this crate (PKclient's per-branch predicate,
//! the server's regular proof, the server's misbehaving proof) is built
//! once from a fixed set of equations and never mutated afterwards.
//!
//! [`or::OrProof`] is the disjunctive composition: the prover knows the
//! true branch; every other branch is simulated by picking its
//! sub-challenge and response first and solving for its commitment.
//!
//! This engine does not expose a suspendable coroutine-style
//! `Put`/`Get`/`PubRand`/`PriRand` context (Rust has no native coroutines
//! outside experimental `Generator`); instead it is realized as an explicit
//! two-call step machine — `prover_commit` then `prover_response` — whose
//! ordering is enforced by consuming `ProverState` by value.

pub mod conjunction;
pub mod or;

pub use conjunction::{Conjunction, Equation};
pub use or::OrProof;

use rand::{CryptoRng, RngCore};

use crate::errors::DagaError;

/// A Σ-protocol: a three-move (commit, challenge, response) interactive
/// proof of knowledge, here specialized to challenges and responses drawn
/// from the scalar field.
pub trait SigmaProtocol {
    /// First prover message.
    type Commitment: Clone;
    /// State carried from commit to response (consumed by value so a
    /// prover cannot be driven out of order).
    type ProverState;
    /// Final prover message.
    type Response: Clone;
    /// The witness known only to an honest prover.
    type Witness;

    /// Produces a commitment and the state needed to answer a challenge.
    fn prover_commit(
        &self,
        witness: &Self::Witness,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<(Self::Commitment, Self::ProverState), DagaError>;

    /// Produces the response to `challenge` given the state from `prover_commit`.
    fn prover_response(
        &self,
        state: Self::ProverState,
        challenge: &crate::group::Scalar,
    ) -> Result<Self::Response, DagaError>;

    /// Verifies a complete (commitment, challenge, response) transcript.
    fn verify(
        &self,
        commitment: &Self::Commitment,
        challenge: &crate::group::Scalar,
        response: &Self::Response,
    ) -> Result<(), DagaError>;
}

/// Extends [`SigmaProtocol`] with the simulation operations needed by the
/// false branches of an [`OrProof`]: pick a
/// response, then solve the verification equation for the commitment that
/// would make it valid under a chosen challenge.
pub trait SigmaProtocolSimulator: SigmaProtocol {
    /// Samples a uniformly random response of the right shape.
    fn simulate_response(&self, rng: &mut (impl RngCore + CryptoRng)) -> Self::Response;

    /// Recomputes the commitment that the verification equation requires
    /// for the given challenge and response.
    fn simulate_commitment(
        &self,
        challenge: &crate::group::Scalar,
        response: &Self::Response,
    ) -> Result<Self::Commitment, DagaError>;
}
