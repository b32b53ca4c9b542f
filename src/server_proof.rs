//! A server's per-round proof: either the regular tag-transformation proof,
//! or the misbehaving-client proof substituted when the client's
//! commitments are inconsistent.
//!
//! Both variants are self-contained non-interactive proofs (Fiat–Shamir
//! over [`Codec`], not the collectively-generated PKclient challenge), so a
//! server can emit them without waiting on any other party.

use curve25519_dalek::traits::Identity;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::codec::Codec;
use crate::errors::DagaError;
use crate::group::{self, generator, Point, Scalar};
use crate::identity::ServerIdentity;
use crate::sigma::{conjunction::Equation, Conjunction, SigmaProtocol};

/// A server's contribution to the transcript at its position in the ring.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerProof {
    Regular {
        #[serde(with = "group::point_serde")]
        t1: Point,
        #[serde(with = "group::point_serde")]
        t2: Point,
        #[serde(with = "group::point_serde")]
        t3: Point,
        #[serde(with = "group::scalar_serde")]
        c: Scalar,
        #[serde(with = "group::scalar_serde")]
        r1: Scalar,
        #[serde(with = "group::scalar_serde")]
        r2: Scalar,
    },
    Misbehaving {
        #[serde(with = "group::point_serde")]
        t1: Point,
        #[serde(with = "group::point_serde")]
        t2: Point,
        /// `y_j * Z`, presented so a third party can re-verify without
        /// knowing `s_j` (resolves the corresponding Open Question: this
        /// proof is re-verifiable by anyone holding only public values).
        #[serde(with = "group::point_serde")]
        t3: Point,
        #[serde(with = "group::scalar_serde")]
        c: Scalar,
        #[serde(with = "group::scalar_serde")]
        r1: Scalar,
    },
}

impl ServerProof {
    pub fn is_misbehaving(&self) -> bool {
        matches!(self, ServerProof::Misbehaving { .. })
    }

    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            ServerProof::Regular { t1, t2, t3, c, r1, r2 } => {
                group::write_lp(&mut out, b"regular");
                for p in [t1, t2, t3] {
                    group::write_lp(&mut out, &group::encode_point(p));
                }
                for s in [c, r1, r2] {
                    group::write_lp(&mut out, &group::encode_scalar(s));
                }
            }
            ServerProof::Misbehaving { t1, t2, t3, c, r1 } => {
                group::write_lp(&mut out, b"misbehaving");
                for p in [t1, t2, t3] {
                    group::write_lp(&mut out, &group::encode_point(p));
                }
                for s in [c, r1] {
                    group::write_lp(&mut out, &group::encode_scalar(s));
                }
            }
        }
        out
    }
}

/// `t1` binds `T_prev`/`T_new` through the honest-client identity
/// `r_j * T_prev == s_j * T_new`, i.e. `r_j*T_prev - s_j*T_new == identity`;
/// `t2` is `Rep(R[j], r_j, G)`; `t3` is `Rep(S[j+2], s_j, S[j+1])`. Witness
/// vector is `[r_j, s_j]`.
fn regular_conjunction(
    r_j_commitment: Point,
    s_prev_commitment: Point,
    s_cur_commitment: Point,
    t_prev: Point,
    t_new: Point,
) -> Conjunction {
    Conjunction::new(
        2,
        vec![
            Equation::new(Point::identity(), vec![(0, t_prev), (1, -t_new)]),
            Equation::new(r_j_commitment, vec![(0, generator())]),
            Equation::new(s_cur_commitment, vec![(1, s_prev_commitment)]),
        ],
    )
}

/// `Rep(t3, y_j, Z) ∧ Rep(Y[j], y_j, G)`, witness `[y_j]`. `t3` (the claimed
/// `y_j * Z`) is carried as a public value of the proof, not recomputed by
/// the verifier, which is what makes this variant re-verifiable without
/// `s_j`.
fn misbehaving_conjunction(t3: Point, y_j_pub: Point, z: Point) -> Conjunction {
    Conjunction::new(
        1,
        vec![
            Equation::new(t3, vec![(0, z)]),
            Equation::new(y_j_pub, vec![(0, generator())]),
        ],
    )
}

fn regular_challenge(
    r_j_commitment: Point,
    s_prev_commitment: Point,
    s_cur_commitment: Point,
    t_prev: Point,
    t_new: Point,
    commitment: &[Point],
) -> Scalar {
    let mut codec = Codec::new(b"daga/server-proof/regular/v1");
    codec.append_point(b"t-prev", &t_prev);
    codec.append_point(b"t-new", &t_new);
    codec.append_point(b"r-j", &r_j_commitment);
    codec.append_point(b"generator", &generator());
    codec.append_point(b"s-cur", &s_cur_commitment);
    codec.append_point(b"s-prev", &s_prev_commitment);
    codec.append_point(b"t1", &commitment[0]);
    codec.append_point(b"t2", &commitment[1]);
    codec.append_point(b"t3", &commitment[2]);
    codec.challenge_scalar(b"challenge")
}

fn misbehaving_challenge(t3: Point, z: Point, y_j_pub: Point, commitment: &[Point]) -> Scalar {
    let mut codec = Codec::new(b"daga/server-proof/misbehaving/v1");
    codec.append_point(b"t3", &t3);
    codec.append_point(b"z", &z);
    codec.append_point(b"y-j", &y_j_pub);
    codec.append_point(b"generator", &generator());
    codec.append_point(b"t1", &commitment[0]);
    codec.append_point(b"t2", &commitment[1]);
    codec.challenge_scalar(b"challenge")
}

/// Emits the regular proof that server `j`
/// correctly transformed `T_prev` into `T_new` using `r_j` and the shared
/// secret `s_j`.
pub fn generate_regular(
    server: &ServerIdentity,
    s_j: Scalar,
    r_j_commitment: Point,
    s_prev_commitment: Point,
    s_cur_commitment: Point,
    t_prev: Point,
    t_new: Point,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<ServerProof, DagaError> {
    let conjunction = regular_conjunction(r_j_commitment, s_prev_commitment, s_cur_commitment, t_prev, t_new);
    let witness = vec![server.round_secret(), s_j];
    let (commitment, state) = conjunction.prover_commit(&witness, rng)?;
    let c = regular_challenge(r_j_commitment, s_prev_commitment, s_cur_commitment, t_prev, t_new, &commitment);
    let response = conjunction.prover_response(state, &c)?;
    Ok(ServerProof::Regular {
        t1: commitment[0],
        t2: commitment[1],
        t3: commitment[2],
        c,
        r1: response[0],
        r2: response[1],
    })
}

/// Emits the misbehaving-client proof
/// exposing that `S[j+2] != s_j * S[j+1]` without revealing `s_j`.
pub fn generate_misbehaving(
    server: &ServerIdentity,
    z: Point,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<ServerProof, DagaError> {
    let y_j_pub = server.public_key();
    let t3 = z * server.secret();
    let conjunction = misbehaving_conjunction(t3, y_j_pub, z);
    let witness = vec![server.secret()];
    let (commitment, state) = conjunction.prover_commit(&witness, rng)?;
    let c = misbehaving_challenge(t3, z, y_j_pub, &commitment);
    let response = conjunction.prover_response(state, &c)?;
    Ok(ServerProof::Misbehaving {
        t1: commitment[0],
        t2: commitment[1],
        t3,
        c,
        r1: response[0],
    })
}

/// Verifies a regular proof against the public values any party can
/// recompute: `context.r[j]`, `S[j+1]`, `S[j+2]`, `T_prev`, `T_new`.
pub fn verify_regular(
    j: usize,
    r_j_commitment: Point,
    s_prev_commitment: Point,
    s_cur_commitment: Point,
    t_prev: Point,
    t_new: Point,
    proof: &ServerProof,
) -> Result<(), DagaError> {
    let ServerProof::Regular { t1, t2, t3, c, r1, r2 } = proof else {
        return Err(DagaError::BadServerProof(j));
    };
    let conjunction = regular_conjunction(r_j_commitment, s_prev_commitment, s_cur_commitment, t_prev, t_new);
    let commitment = vec![*t1, *t2, *t3];
    let expected_c = regular_challenge(r_j_commitment, s_prev_commitment, s_cur_commitment, t_prev, t_new, &commitment);
    if expected_c != *c {
        return Err(DagaError::BadServerProof(j));
    }
    conjunction
        .verify(&commitment, c, &vec![*r1, *r2])
        .map_err(|_| DagaError::BadServerProof(j))
}

/// Verifies a misbehaving proof using only public values — no knowledge of
/// `s_j` is required, matching the resolved Open Question.
pub fn verify_misbehaving(j: usize, y_j_pub: Point, z: Point, proof: &ServerProof) -> Result<(), DagaError> {
    let ServerProof::Misbehaving { t1, t2, t3, c, r1 } = proof else {
        return Err(DagaError::BadServerProof(j));
    };
    let conjunction = misbehaving_conjunction(*t3, y_j_pub, z);
    let commitment = vec![*t1, *t2];
    let expected_c = misbehaving_challenge(*t3, z, y_j_pub, &commitment);
    if expected_c != *c {
        return Err(DagaError::BadServerProof(j));
    }
    conjunction
        .verify(&commitment, c, &vec![*r1])
        .map_err(|_| DagaError::BadServerProof(j))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::random_scalar;
    use rand::rngs::OsRng;

    #[test]
    fn regular_proof_roundtrips() {
        let mut rng = OsRng;
        let server = ServerIdentity::new(0, random_scalar(&mut rng), &mut rng);
        let s_j = random_scalar(&mut rng);
        let s_prev = generator() * random_scalar(&mut rng);
        let s_cur = s_prev * s_j;
        let t_prev = generator() * random_scalar(&mut rng);
        let t_new = t_prev * (server.round_secret() * s_j.invert());

        let proof = generate_regular(&server, s_j, server.round_commitment(), s_prev, s_cur, t_prev, t_new, &mut rng).unwrap();
        assert!(verify_regular(0, server.round_commitment(), s_prev, s_cur, t_prev, t_new, &proof).is_ok());
    }

    #[test]
    fn regular_proof_rejects_wrong_transform() {
        let mut rng = OsRng;
        let server = ServerIdentity::new(0, random_scalar(&mut rng), &mut rng);
        let s_j = random_scalar(&mut rng);
        let s_prev = generator() * random_scalar(&mut rng);
        let s_cur = s_prev * s_j;
        let t_prev = generator() * random_scalar(&mut rng);
        let wrong_t_new = generator() * random_scalar(&mut rng);

        let proof = generate_regular(&server, s_j, server.round_commitment(), s_prev, s_cur, t_prev, wrong_t_new, &mut rng);
        assert!(proof.is_err() || verify_regular(0, server.round_commitment(), s_prev, s_cur, t_prev, wrong_t_new, &proof.unwrap()).is_err());
    }

    #[test]
    fn misbehaving_proof_roundtrips_without_s_j() {
        let mut rng = OsRng;
        let server = ServerIdentity::new(0, random_scalar(&mut rng), &mut rng);
        let z = generator() * random_scalar(&mut rng);
        let proof = generate_misbehaving(&server, z, &mut rng).unwrap();
        assert!(verify_misbehaving(0, server.public_key(), z, &proof).is_ok());
    }
}
