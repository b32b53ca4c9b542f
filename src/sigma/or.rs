//! Disjunctive composition of Σ-protocols — `Or(p_1, ..., p_n)`.
//!
//! The prover knows the true branch index `k`. For every false branch it
//! picks the sub-challenge and responses uniformly at random and solves the
//! verification equation for the commitment that would make them valid.
//! For the true branch it runs the honest prover with fresh randomness,
//! then derives `c_k = master_challenge - Σ_{j≠k} c_j` once the master
//! challenge is known, so that sub-challenges always sum to it (the
//! property tested in `sub_challenges_sum_to_master_challenge` below).
//!
//! This is the predicate built once per authentication in
//! `crate::client_proof` (PKclient), generalizing
//! `newClientProofPred`/`newClientProver`/`newClientVerifier` from
//! `sign/daga/client_proof.go` into a reusable combinator over any
//! `SigmaProtocolSimulator` branch type.

use rand::{CryptoRng, RngCore};

use crate::errors::DagaError;
use crate::group::{random_scalar, Scalar};
use crate::sigma::{Conjunction, SigmaProtocol, SigmaProtocolSimulator};

/// An OR-composition of `n` [`Conjunction`] branches, exactly one of which
/// the prover can open.
pub struct OrProof {
    pub branches: Vec<Conjunction>,
}

/// Prover-side state carried between the commit and response phases.
pub struct OrProverState {
    true_index: usize,
    true_state: <Conjunction as SigmaProtocol>::ProverState,
    /// Per-branch sub-challenge; the entry at `true_index` is a placeholder
    /// until the master challenge arrives.
    sub_challenges: Vec<Scalar>,
    /// Per-branch response; the entry at `true_index` is a placeholder
    /// until the master challenge arrives.
    responses: Vec<Vec<Scalar>>,
}

impl OrProof {
    pub fn new(branches: Vec<Conjunction>) -> Self {
        OrProof { branches }
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Commit phase: produces the per-branch commitment vectors and the
    /// prover state needed once the master challenge is known.
    pub fn prover_commit(
        &self,
        true_index: usize,
        witness: &<Conjunction as SigmaProtocol>::Witness,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<(Vec<<Conjunction as SigmaProtocol>::Commitment>, OrProverState), DagaError> {
        if true_index >= self.branches.len() {
            return Err(DagaError::Proof("true branch index out of range".into()));
        }

        let mut commitments = Vec::with_capacity(self.branches.len());
        let mut sub_challenges = vec![Scalar::ZERO; self.branches.len()];
        let mut responses: Vec<Vec<Scalar>> = Vec::with_capacity(self.branches.len());
        let mut true_state = None;

        for (j, branch) in self.branches.iter().enumerate() {
            if j == true_index {
                let (commitment, state) = branch.prover_commit(witness, rng)?;
                commitments.push(commitment);
                responses.push(Vec::new()); // filled in on prover_response
                true_state = Some(state);
            } else {
                let c_j = random_scalar(rng);
                let r_j = branch.simulate_response(rng);
                let commitment = branch.simulate_commitment(&c_j, &r_j)?;
                commitments.push(commitment);
                sub_challenges[j] = c_j;
                responses.push(r_j);
            }
        }

        Ok((
            commitments,
            OrProverState {
                true_index,
                true_state: true_state.expect("true branch visited in loop above"),
                sub_challenges,
                responses,
            },
        ))
    }

    /// Response phase: given the collectively-generated master challenge,
    /// completes the true branch's sub-challenge and response, and returns
    /// the full `(sub_challenges, responses)` pair.
    pub fn prover_response(
        &self,
        mut state: OrProverState,
        master_challenge: &Scalar,
    ) -> Result<(Vec<Scalar>, Vec<Vec<Scalar>>), DagaError> {
        let sum_fake: Scalar = state
            .sub_challenges
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != state.true_index)
            .map(|(_, c)| *c)
            .fold(Scalar::ZERO, |acc, c| acc + c);
        let c_true = master_challenge - sum_fake;

        let true_response = self.branches[state.true_index]
            .prover_response(state.true_state, &c_true)?;

        state.sub_challenges[state.true_index] = c_true;
        state.responses[state.true_index] = true_response;

        Ok((state.sub_challenges, state.responses))
    }

    /// Verifies a complete OR-proof transcript. Checks that the
    /// sub-challenges sum to the master challenge (the binding that makes
    /// simulation for exactly one branch possible) and that every branch's
    /// own verification equation holds.
    pub fn verify(
        &self,
        commitments: &[<Conjunction as SigmaProtocol>::Commitment],
        master_challenge: &Scalar,
        sub_challenges: &[Scalar],
        responses: &[Vec<Scalar>],
    ) -> Result<(), DagaError> {
        let n = self.branches.len();
        if commitments.len() != n || sub_challenges.len() != n || responses.len() != n {
            return Err(DagaError::Proof("OR-proof size mismatch".into()));
        }

        let sum: Scalar = sub_challenges.iter().fold(Scalar::ZERO, |acc, c| acc + c);
        if sum != *master_challenge {
            return Err(DagaError::Proof(
                "sub-challenges do not sum to the master challenge".into(),
            ));
        }

        for (j, branch) in self.branches.iter().enumerate() {
            branch.verify(&commitments[j], &sub_challenges[j], &responses[j])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::generator;
    use crate::sigma::conjunction::Equation;
    use rand::rngs::OsRng;

    fn dl_branch(witness: Option<Scalar>, rng: &mut (impl RngCore + CryptoRng)) -> (Conjunction, Scalar) {
        let g = generator();
        let x = witness.unwrap_or_else(|| random_scalar(rng));
        let x_pub = g * x;
        (Conjunction::new(1, vec![Equation::new(x_pub, vec![(0, g)])]), x)
    }

    #[test]
    fn or_proof_roundtrips_for_every_true_branch() {
        let mut rng = OsRng;
        for true_index in 0..4 {
            let mut branches = Vec::new();
            let mut witness = Scalar::ZERO;
            for i in 0..4 {
                let (branch, x) = dl_branch(None, &mut rng);
                if i == true_index {
                    witness = x;
                }
                branches.push(branch);
            }
            let or = OrProof::new(branches);

            let (commitments, state) = or.prover_commit(true_index, &vec![witness], &mut rng).unwrap();
            let master_challenge = random_scalar(&mut rng);
            let (sub_challenges, responses) = or.prover_response(state, &master_challenge).unwrap();

            assert!(or
                .verify(&commitments, &master_challenge, &sub_challenges, &responses)
                .is_ok());
        }
    }

    #[test]
    fn sub_challenges_sum_to_master_challenge() {
        let mut rng = OsRng;
        let (b0, x0) = dl_branch(None, &mut rng);
        let (b1, _) = dl_branch(None, &mut rng);
        let (b2, _) = dl_branch(None, &mut rng);
        let or = OrProof::new(vec![b0, b1, b2]);

        let (_, state) = or.prover_commit(0, &vec![x0], &mut rng).unwrap();
        let master_challenge = random_scalar(&mut rng);
        let (sub_challenges, _) = or.prover_response(state, &master_challenge).unwrap();

        let sum: Scalar = sub_challenges.iter().fold(Scalar::ZERO, |acc, c| acc + c);
        assert_eq!(sum, master_challenge);
    }

    #[test]
    fn tampering_with_a_commitment_breaks_verification() {
        let mut rng = OsRng;
        let (b0, x0) = dl_branch(None, &mut rng);
        let (b1, _) = dl_branch(None, &mut rng);
        let or = OrProof::new(vec![b0, b1]);

        let (mut commitments, state) = or.prover_commit(0, &vec![x0], &mut rng).unwrap();
        let master_challenge = random_scalar(&mut rng);
        let (sub_challenges, responses) = or.prover_response(state, &master_challenge).unwrap();

        commitments[1][0] = commitments[1][0] + generator();
        assert!(or
            .verify(&commitments, &master_challenge, &sub_challenges, &responses)
            .is_err());
    }
}
