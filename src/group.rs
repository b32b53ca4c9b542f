//! Group primitives: point/scalar arithmetic, a deterministic hash-to-scalar
//! and hash-to-group, Schnorr signatures, and canonical serialization.
//!
//! The concrete group is Ristretto over Curve25519, via `curve25519-dalek`.
//! This crate fixes one concrete group rather than staying generic over any
//! `group::Group` implementation, since multi-curve genericity isn't
//! needed here, and a monomorphic implementation reads closer to the
//! original Go (`dedis/student_18_daga`, built on a single `abstract.Suite`).

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar as DalekScalar;
use rand::{CryptoRng, RngCore};
use sha3::{Digest, Sha3_512};

use crate::errors::DagaError;

/// A group element (public key, generator, commitment, tag, ...).
pub type Point = RistrettoPoint;
/// A scalar field element (private key, nonce, response, ...).
pub type Scalar = DalekScalar;

/// The group's fixed generator `G`.
pub fn generator() -> Point {
    RISTRETTO_BASEPOINT_POINT
}

/// Samples a uniformly random scalar.
pub fn random_scalar(rng: &mut (impl RngCore + CryptoRng)) -> Scalar {
    Scalar::random(rng)
}

/// Deterministically hashes a domain tag and a list of length-prefixed byte
/// strings into a scalar (`H_s`).
///
/// Every absorbed field is preceded by its big-endian `u64` length, fixing
/// the ordering explicitly to prevent cross-implementation divergence.
pub fn hash_to_scalar(domain: &[u8], inputs: &[&[u8]]) -> Scalar {
    let mut hasher = Sha3_512::new();
    hasher.update((domain.len() as u64).to_be_bytes());
    hasher.update(domain);
    for input in inputs {
        hasher.update((input.len() as u64).to_be_bytes());
        hasher.update(input);
    }
    let digest = hasher.finalize();
    let mut wide = [0u8; 64];
    wide.copy_from_slice(&digest);
    Scalar::from_bytes_mod_order_wide(&wide)
}

/// Deterministically derives a group element with unknown discrete log
/// w.r.t. `G`, via hash-then-elligator (`RistrettoPoint::from_hash`).
///
/// Used for the per-client generators `H_gens`: `h_i` must be derivable
/// by everyone from `(i, round)` while nobody can know `log_G(h_i)`.
pub fn hash_to_point(domain: &[u8], inputs: &[&[u8]]) -> Point {
    let mut hasher = Sha3_512::new();
    hasher.update((domain.len() as u64).to_be_bytes());
    hasher.update(domain);
    for input in inputs {
        hasher.update((input.len() as u64).to_be_bytes());
        hasher.update(input);
    }
    RistrettoPoint::from_hash(hasher)
}

/// Appends `bytes` to `out` preceded by its big-endian `u64` length — the
/// canonical length-prefixing convention used throughout this crate's
/// hashed and signed byte strings.
pub fn write_lp(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u64).to_be_bytes());
    out.extend_from_slice(bytes);
}

/// Canonical compressed encoding of a point (32 bytes).
pub fn encode_point(p: &Point) -> [u8; 32] {
    p.compress().to_bytes()
}

/// Decodes a canonically-encoded point, rejecting anything that is not a
/// valid Ristretto encoding.
pub fn decode_point(bytes: &[u8]) -> Result<Point, DagaError> {
    if bytes.len() != 32 {
        return Err(DagaError::BadPoint);
    }
    let mut buf = [0u8; 32];
    buf.copy_from_slice(bytes);
    CompressedRistretto(buf).decompress().ok_or(DagaError::BadPoint)
}

/// Canonical encoding of a scalar (32 bytes, little-endian).
pub fn encode_scalar(s: &Scalar) -> [u8; 32] {
    s.to_bytes()
}

/// Decodes a canonically-encoded scalar, rejecting non-canonical
/// representatives.
pub fn decode_scalar(bytes: &[u8]) -> Result<Scalar, DagaError> {
    if bytes.len() != 32 {
        return Err(DagaError::BadScalar);
    }
    let mut buf = [0u8; 32];
    buf.copy_from_slice(bytes);
    Option::<Scalar>::from(Scalar::from_canonical_bytes(buf)).ok_or(DagaError::BadScalar)
}

/// A Schnorr signature over an arbitrary message, keyed by a scalar
/// (signing) and the corresponding point (verifying).
///
/// This is the signature scheme used throughout DAGA for server-to-server
/// and server-to-client authentication of transcripts, commitments, and
/// challenge bundles; it plays the role of `ECDSASign`/`ECDSAVerify` in
/// the original Go implementation, adapted to a Schnorr proof of knowledge
/// of the discrete log of the signer's public key, Fiat–Shamir transformed
/// over the signed message.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Signature {
    #[serde(with = "point_serde")]
    r: Point,
    #[serde(with = "scalar_serde")]
    s: Scalar,
}

const SIGNATURE_DOMAIN: &[u8] = b"daga/schnorr-signature/v1";

/// Produces a Schnorr signature of `message` under private scalar `sk`.
pub fn sign(sk: &Scalar, message: &[u8], rng: &mut (impl RngCore + CryptoRng)) -> Signature {
    let k = random_scalar(rng);
    let r = generator() * k;
    let pk = generator() * sk;
    let e = hash_to_scalar(
        SIGNATURE_DOMAIN,
        &[&encode_point(&r), &encode_point(&pk), message],
    );
    let s = k + e * sk;
    Signature { r, s }
}

/// Verifies a Schnorr signature against the public key `pk` and `message`.
pub fn verify(pk: &Point, message: &[u8], sig: &Signature) -> Result<(), DagaError> {
    let e = hash_to_scalar(
        SIGNATURE_DOMAIN,
        &[&encode_point(&sig.r), &encode_point(pk), message],
    );
    let expected = generator() * sig.s - pk * e;
    if expected == sig.r {
        Ok(())
    } else {
        Err(DagaError::BadSignature)
    }
}

pub(crate) mod point_serde {
    use super::{decode_point, encode_point, Point};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(p: &Point, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(&encode_point(p))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Point, D::Error> {
        let bytes: Vec<u8> = Vec::deserialize(d)?;
        decode_point(&bytes).map_err(D::Error::custom)
    }
}

pub(crate) mod scalar_serde {
    use super::{decode_scalar, encode_scalar, Scalar};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(s: &Scalar, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_bytes(&encode_scalar(s))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Scalar, D::Error> {
        let bytes: Vec<u8> = Vec::deserialize(d)?;
        decode_scalar(&bytes).map_err(D::Error::custom)
    }
}

pub(crate) mod point_vec_serde {
    use super::{decode_point, encode_point, Point};
    use serde::{de::Error, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(points: &[Point], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(points.len()))?;
        for p in points {
            seq.serialize_element(&encode_point(p).to_vec())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Point>, D::Error> {
        let raw: Vec<Vec<u8>> = Vec::deserialize(d)?;
        raw.iter()
            .map(|b| decode_point(b).map_err(D::Error::custom))
            .collect()
    }
}

pub(crate) mod scalar_vec_serde {
    use super::{decode_scalar, encode_scalar, Scalar};
    use serde::{de::Error, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(scalars: &[Scalar], s: S) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(scalars.len()))?;
        for x in scalars {
            seq.serialize_element(&encode_scalar(x).to_vec())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Scalar>, D::Error> {
        let raw: Vec<Vec<u8>> = Vec::deserialize(d)?;
        raw.iter()
            .map(|b| decode_scalar(b).map_err(D::Error::custom))
            .collect()
    }
}
