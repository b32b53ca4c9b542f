//! Fiat–Shamir transcript codec.
//!
//! Wraps a [`merlin::Transcript`] to absorb the ordered, domain-separated
//! sequence of points and scalars that make up a proof's public inputs and
//! commitments, then squeeze a challenge scalar. This plays the role of the
//! teacher crate's `Codec`/`ShakeCodec` pair (`fiat_shamir.rs`), narrowed to
//! one concrete backend since this crate fixes one group (see
//! [`crate::group`]).

use merlin::Transcript;

use crate::group::{encode_point, Point, Scalar};

/// A running Fiat–Shamir transcript.
#[derive(Clone)]
pub struct Codec(Transcript);

impl Codec {
    /// Starts a new transcript under the given domain-separation label.
    pub fn new(domain: &'static [u8]) -> Self {
        Codec(Transcript::new(domain))
    }

    /// Absorbs a labeled group element.
    pub fn append_point(&mut self, label: &'static [u8], point: &Point) {
        self.0.append_message(label, &encode_point(point));
    }

    /// Absorbs a labeled, length-prefixed byte string.
    pub fn append_message(&mut self, label: &'static [u8], bytes: &[u8]) {
        self.0.append_message(label, bytes);
    }

    /// Squeezes a challenge scalar from everything absorbed so far.
    ///
    /// Does not consume `self`: a codec may be forked to derive several
    /// independent challenges from a shared prefix (used by the
    /// challenge-generation coordinator, where every server's contribution
    /// is absorbed once but verified independently).
    pub fn challenge_scalar(&self, label: &'static [u8]) -> Scalar {
        let mut transcript = self.0.clone();
        let mut bytes = [0u8; 64];
        transcript.challenge_bytes(label, &mut bytes);
        Scalar::from_bytes_mod_order_wide(&bytes)
    }
}
