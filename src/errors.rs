//! Error kinds for the DAGA cryptographic and protocol core.
//!
//! Every failure surfaces at the boundary of the operation that owns the
//! session; partial state is discarded by the caller (the protocol is
//! all-or-nothing per authentication). Misbehaving-client detection is
//! *not* an error: it is represented by [`crate::tag::Tag::Null`].

use thiserror::Error;

/// Errors produced by the group, Σ-protocol engine, and DAGA protocol layers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DagaError {
    /// Malformed bytes on the wire or on disk.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A decoded point does not lie on the curve / in the prime-order subgroup.
    #[error("point is not a valid group element")]
    BadPoint,

    /// A decoded scalar is outside the canonical representative range.
    #[error("scalar is not canonically encoded")]
    BadScalar,

    /// Wrong cardinalities or missing fields in an `AuthMessage` or transcript.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A Schnorr signature failed to verify.
    #[error("signature verification failed")]
    BadSignature,

    /// The Σ-verifier rejected the client's PKclient proof.
    #[error("client proof did not verify")]
    BadClientProof,

    /// The Σ-verifier rejected a server's regular or misbehaving proof.
    #[error("server proof at index {0} did not verify")]
    BadServerProof(usize),

    /// The challenge bundle received by the client lacks the expected
    /// signatures, or is bound to commitments other than the ones sent.
    #[error("challenge bundle rejected: {0}")]
    BadChallenge(String),

    /// A completed transcript failed verification end to end.
    #[error("transcript did not verify: {0}")]
    BadTranscript(String),

    /// A distributed-challenge-generation phase did not complete within its
    /// configured bound.
    #[error("challenge generation timed out in phase {0}")]
    Timeout(&'static str),

    /// Generic failure of an underlying Σ-protocol (mismatched witness or
    /// commitment lengths, unsatisfied equation).
    #[error("proof error: {0}")]
    Proof(String),

    /// An external transport failed; the caller, not this crate, decides
    /// whether to retry.
    #[error("transport error: {0}")]
    Transport(String),
}
