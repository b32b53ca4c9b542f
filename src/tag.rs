//! Linkage tags and the initial per-authentication tag/commitments.

use curve25519_dalek::traits::Identity;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::context::Context;
use crate::errors::DagaError;
use crate::group::{self, generator, hash_to_scalar, random_scalar, Point, Scalar};
use crate::identity::ClientIdentity;

const SHARED_SECRET_DOMAIN: &[u8] = b"daga/shared-secret/v1";

/// `H_s(point * scalar)` — the Diffie-Hellman shared secret a client
/// derives with server `j` (as `H_s(z * Y[j])`) and a server re-derives
/// with the client (as `H_s(y_j * Z)`); both compute the same point since
/// scalar multiplication commutes.
pub(crate) fn shared_secret(point: Point, scalar: Scalar) -> Scalar {
    hash_to_scalar(SHARED_SECRET_DOMAIN, &[&group::encode_point(&(point * scalar))])
}

/// The final or intermediate linkage tag. `Null` is the distinguished value
/// a misbehaving client's authentication collapses to; it is never produced by an honest run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tag {
    Value(Point),
    Null,
}

impl Tag {
    pub fn is_null(&self) -> bool {
        matches!(self, Tag::Null)
    }

    pub fn as_point(&self) -> Point {
        match self {
            Tag::Value(p) => *p,
            Tag::Null => Point::identity(),
        }
    }
}

impl From<Point> for Tag {
    fn from(p: Point) -> Self {
        if p == Point::identity() {
            Tag::Null
        } else {
            Tag::Value(p)
        }
    }
}

impl Serialize for Tag {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        group::point_serde::serialize(&self.as_point(), s)
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        group::point_serde::deserialize(d).map(Tag::from)
    }
}

/// The commitment vector and initial tag a client builds at the start of an
/// authentication: `T0` and `S = (Z, G, S_1, ..., S_m)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialTagAndCommitments {
    #[serde(with = "group::point_serde")]
    pub t0: Point,
    #[serde(with = "group::point_vec_serde")]
    pub s: Vec<Point>,
}

impl InitialTagAndCommitments {
    /// `S[m+1]`, i.e. `S_m = (prod s_j) * G` — the target of the second
    /// PKclient clause.
    pub fn s_m(&self) -> Point {
        *self.s.last().expect("s has at least Z and G")
    }

    /// `Z`, the client's ephemeral Diffie-Hellman public key, `S[0]`.
    pub fn z(&self) -> Point {
        self.s[0]
    }

    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        group::write_lp(&mut out, &group::encode_point(&self.t0));
        for p in &self.s {
            group::write_lp(&mut out, &group::encode_point(p));
        }
        out
    }
}

/// The client-only secrets needed to answer the PKclient challenge:
/// the opening scalar `s = prod s_j` (shared discrete log of `T0` w.r.t.
/// `h_i` and of `S_m` w.r.t. `G`). The ephemeral DH scalar `z` is kept
/// zeroized and is not otherwise needed once `S` has been built.
pub struct ClientWitness {
    pub s: Scalar,
    _z: Zeroizing<Scalar>,
}

/// Builds `T0`/`S` for client `client` authenticating against `context`.
pub fn build_initial_tag_and_commitments(
    context: &Context,
    client: &ClientIdentity,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<(InitialTagAndCommitments, ClientWitness), DagaError> {
    if client.index >= context.n() {
        return Err(DagaError::MalformedMessage(
            "client index out of range for context".into(),
        ));
    }

    let z = random_scalar(rng);
    let big_z = generator() * z;

    let shared_secrets: Vec<Scalar> = context.y.iter().map(|y_j| shared_secret(*y_j, z)).collect();

    let h_i = context.h_gens[client.index];
    let opening: Scalar = shared_secrets
        .iter()
        .fold(Scalar::from(1u64), |acc, s_j| acc * s_j);
    let t0 = h_i * opening;

    let mut s = Vec::with_capacity(context.m() + 2);
    s.push(big_z);
    s.push(generator());
    let mut running = generator();
    for s_j in &shared_secrets {
        running = running * *s_j;
        s.push(running);
    }

    Ok((
        InitialTagAndCommitments { t0, s },
        ClientWitness {
            s: opening,
            _z: Zeroizing::new(z),
        },
    ))
}
