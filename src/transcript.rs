//! The authentication message a client sends, the running server
//! transcript it grows into, and final tag extraction.

use serde::{Deserialize, Serialize};

use crate::client_proof::{self, PKclientProof};
use crate::context::Context;
use crate::errors::DagaError;
use crate::group::{self, Point, Signature};
use crate::server_proof::{self, ServerProof};
use crate::tag::Tag;

/// What the client sends to start an authentication: its context reference,
/// initial tag and commitments, and PKclient proof.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthMessage {
    pub context: Context,
    #[serde(with = "group::point_serde")]
    pub t0: Point,
    #[serde(with = "group::point_vec_serde")]
    pub s: Vec<Point>,
    pub proof: PKclientProof,
}

impl AuthMessage {
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        group::write_lp(&mut out, &self.context.canonical_bytes());
        group::write_lp(&mut out, &group::encode_point(&self.t0));
        for p in &self.s {
            group::write_lp(&mut out, &group::encode_point(p));
        }
        out
    }

    pub fn verify_pk_client(&self) -> Result<(), DagaError> {
        let s_m = *self.s.last().ok_or_else(|| {
            DagaError::MalformedMessage("commitment vector S must not be empty".into())
        })?;
        client_proof::verify(&self.context, self.t0, s_m, &self.proof)
    }
}

/// The append-only server transcript: `(request, tags, proofs,
/// indexes, sigs)`, always of equal length, growing by one entry per
/// server visited in the ring.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub request: AuthMessage,
    #[serde(with = "group::point_vec_serde")]
    tags: Vec<Point>,
    pub proofs: Vec<ServerProof>,
    pub indexes: Vec<usize>,
    pub sigs: Vec<Signature>,
}

impl Transcript {
    pub fn new(request: AuthMessage) -> Self {
        Transcript {
            request,
            tags: Vec::new(),
            proofs: Vec::new(),
            indexes: Vec::new(),
            sigs: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn tags(&self) -> &[Point] {
        &self.tags
    }

    /// The tag a server at ring position `k` should transform, i.e. `T0` if
    /// this is the first server, else the previous entry's tag.
    pub fn previous_tag(&self) -> Point {
        *self.tags.last().unwrap_or(&self.request.t0)
    }

    /// Appends one server's contribution and its signature over the
    /// running data through this entry.
    pub fn push(&mut self, tag: Point, proof: ServerProof, index: usize, sig: Signature) {
        self.tags.push(tag);
        self.proofs.push(proof);
        self.indexes.push(index);
        self.sigs.push(sig);
    }

    /// Data signed by entry `i`: `canonical(request) ‖
    /// canonical(tags[0..=i]) ‖ canonical(proofs[0..=i]) ‖
    /// ascii(indexes[0..=i])`, built incrementally.
    pub(crate) fn running_data_through(&self, upto: usize) -> Vec<u8> {
        let mut data = self.request.canonical_bytes();
        for i in 0..upto {
            group::write_lp(&mut data, &group::encode_point(&self.tags[i]));
            group::write_lp(&mut data, &self.proofs[i].canonical_bytes());
            group::write_lp(&mut data, self.indexes[i].to_string().as_bytes());
        }
        data
    }

    /// Verifies every signature currently in the transcript against the
    /// running data it was produced over.
    pub fn verify_signatures(&self, context: &Context) -> Result<(), DagaError> {
        for i in 0..self.len() {
            let data = self.running_data_through(i + 1);
            let server_index = self.indexes[i];
            let pk = context.y.get(server_index).ok_or_else(|| {
                DagaError::MalformedMessage(format!("server index {server_index} out of range"))
            })?;
            group::verify(pk, &data, &self.sigs[i])
                .map_err(|_| DagaError::BadTranscript(format!("signature at position {i} did not verify")))?;
        }
        Ok(())
    }

    /// Verifies every proof currently in the transcript, dispatching on variant.
    pub fn verify_proofs(&self, context: &Context) -> Result<(), DagaError> {
        for i in 0..self.len() {
            let j = self.indexes[i];
            let t_prev = if i == 0 { self.request.t0 } else { self.tags[i - 1] };
            let t_new = self.tags[i];
            match &self.proofs[i] {
                ServerProof::Regular { .. } => {
                    let s_prev = self.request.s[j + 1];
                    let s_cur = self.request.s[j + 2];
                    server_proof::verify_regular(
                        j,
                        context.r[j],
                        s_prev,
                        s_cur,
                        t_prev,
                        t_new,
                        &self.proofs[i],
                    )?;
                }
                ServerProof::Misbehaving { .. } => {
                    let z = self.request.s[0];
                    server_proof::verify_misbehaving(j, context.y[j], z, &self.proofs[i])?;
                }
            }
        }
        Ok(())
    }

    /// Validates shape invariants common to a server's processing
    /// preconditions and final tag extraction.
    pub fn validate_shape(&self, context: &Context) -> Result<(), DagaError> {
        let k = self.len();
        if self.proofs.len() != k || self.indexes.len() != k || self.sigs.len() != k {
            return Err(DagaError::MalformedMessage(
                "tags/proofs/indexes/sigs must have equal length".into(),
            ));
        }
        if k > context.m() {
            return Err(DagaError::MalformedMessage(
                "transcript longer than the number of servers".into(),
            ));
        }
        if self.request.s.len() != context.m() + 2 {
            return Err(DagaError::MalformedMessage(
                "commitment vector S has the wrong length".into(),
            ));
        }
        if self.request.s.get(1) != Some(&crate::group::generator()) {
            return Err(DagaError::MalformedMessage("S[1] must equal G".into()));
        }
        if self.request.proof.t.len() != context.n()
            || self.request.proof.c.len() != context.n()
            || self.request.proof.r.len() != context.n()
        {
            return Err(DagaError::MalformedMessage(
                "PKclient proof has the wrong shape for this context".into(),
            ));
        }
        Ok(())
    }
}

/// `extractTag(context, transcript) -> Tag`: full verification of a
/// complete transcript, returning the final linkage tag.
pub fn extract_tag(context: &Context, transcript: &Transcript) -> Result<Tag, DagaError> {
    transcript.validate_shape(context)?;
    if transcript.len() != context.m() {
        return Err(DagaError::BadTranscript(
            "transcript is not complete".into(),
        ));
    }
    transcript.request.verify_pk_client()?;
    transcript.verify_signatures(context)?;
    transcript.verify_proofs(context)?;
    let last = *transcript.tags().last().expect("transcript.len() == m >= 1");
    Ok(Tag::from(last))
}
