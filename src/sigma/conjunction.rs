//! A conjunction of linear equations over a shared witness vector —
//! `And(Rep(target_1, ..), Rep(target_2, ..), ...)`.
//!
//! Every concrete Σ-protocol this crate needs (PKclient's per-branch
//! predicate, a server's regular proof, a server's misbehaving proof) is an
//! instance of this one structure, following the `SchnorrProof(LinearRelation<G>)`
//! pattern.

use rand::{CryptoRng, RngCore};

use curve25519_dalek::traits::Identity;

use crate::errors::DagaError;
use crate::group::{random_scalar, Point, Scalar};
use crate::sigma::{SigmaProtocol, SigmaProtocolSimulator};

/// One equation `target = Σ_j witness[terms[j].0] · terms[j].1`.
#[derive(Clone, Debug)]
pub struct Equation {
    pub target: Point,
    pub terms: Vec<(usize, Point)>,
}

impl Equation {
    pub fn new(target: Point, terms: Vec<(usize, Point)>) -> Self {
        Equation { target, terms }
    }

    fn evaluate(&self, scalars: &[Scalar]) -> Point {
        self.terms
            .iter()
            .map(|(idx, base)| base * scalars[*idx])
            .fold(Point::identity(), |acc, p| acc + p)
    }
}

/// A conjunction of [`Equation`]s sharing one witness vector.
///
/// Response convention follows the original DAGA implementation
/// (`sign/daga/client.go`, `sign/daga/server.go`): `response = nonce +
/// challenge * witness`, and the verification equation is
/// `Σ response · base == commitment + challenge * target`, matched by
/// [`verify`] below. Any consistent sign convention would do; this one is
/// kept for fidelity with the protocol this crate reimplements.
#[derive(Clone, Debug)]
pub struct Conjunction {
    pub equations: Vec<Equation>,
    pub num_witnesses: usize,
}

impl Conjunction {
    pub fn new(num_witnesses: usize, equations: Vec<Equation>) -> Self {
        Conjunction {
            equations,
            num_witnesses,
        }
    }
}

impl SigmaProtocol for Conjunction {
    type Commitment = Vec<Point>;
    type ProverState = (Vec<Scalar>, Vec<Scalar>);
    type Response = Vec<Scalar>;
    type Witness = Vec<Scalar>;

    fn prover_commit(
        &self,
        witness: &Self::Witness,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<(Self::Commitment, Self::ProverState), DagaError> {
        if witness.len() != self.num_witnesses {
            return Err(DagaError::Proof(format!(
                "expected {} witness scalars, got {}",
                self.num_witnesses,
                witness.len()
            )));
        }
        let nonces: Vec<Scalar> = (0..self.num_witnesses)
            .map(|_| random_scalar(rng))
            .collect();
        let commitment = self
            .equations
            .iter()
            .map(|eq| eq.evaluate(&nonces))
            .collect();
        Ok((commitment, (nonces, witness.clone())))
    }

    fn prover_response(
        &self,
        state: Self::ProverState,
        challenge: &Scalar,
    ) -> Result<Self::Response, DagaError> {
        let (nonces, witness) = state;
        Ok(nonces
            .into_iter()
            .zip(witness)
            .map(|(v, w)| v + challenge * w)
            .collect())
    }

    fn verify(
        &self,
        commitment: &Self::Commitment,
        challenge: &Scalar,
        response: &Self::Response,
    ) -> Result<(), DagaError> {
        if commitment.len() != self.equations.len() || response.len() != self.num_witnesses {
            return Err(DagaError::Proof("commitment/response size mismatch".into()));
        }
        for (eq, t) in self.equations.iter().zip(commitment) {
            let lhs = eq.evaluate(response);
            let rhs = *t + eq.target * challenge;
            if lhs != rhs {
                return Err(DagaError::Proof("equation did not verify".into()));
            }
        }
        Ok(())
    }
}

impl SigmaProtocolSimulator for Conjunction {
    fn simulate_response(&self, rng: &mut (impl RngCore + CryptoRng)) -> Self::Response {
        (0..self.num_witnesses).map(|_| random_scalar(rng)).collect()
    }

    fn simulate_commitment(
        &self,
        challenge: &Scalar,
        response: &Self::Response,
    ) -> Result<Self::Commitment, DagaError> {
        if response.len() != self.num_witnesses {
            return Err(DagaError::Proof("response size mismatch".into()));
        }
        Ok(self
            .equations
            .iter()
            .map(|eq| eq.evaluate(response) - eq.target * challenge)
            .collect())
    }
}
