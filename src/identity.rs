//! Client and server identities.
//!
//! A server's per-round secret `r_j` is wrapped in [`zeroize::Zeroizing`] so
//! it is wiped the moment it is replaced or dropped.

use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

use crate::group::{generator, random_scalar, Point, Scalar};

/// A client's long-term keypair and its fixed index in `context.x`.
///
/// Invariant: `x_i * G == X[i]` for the context this identity authenticates
/// against.
#[derive(Clone)]
pub struct ClientIdentity {
    pub index: usize,
    x: Scalar,
}

impl ClientIdentity {
    pub fn new(index: usize, x: Scalar) -> Self {
        ClientIdentity { index, x }
    }

    pub fn generate(index: usize, rng: &mut (impl RngCore + CryptoRng)) -> Self {
        ClientIdentity::new(index, random_scalar(rng))
    }

    pub fn public_key(&self) -> Point {
        generator() * self.x
    }

    pub(crate) fn secret(&self) -> Scalar {
        self.x
    }
}

/// A server's long-term keypair, its index in `context.y`, and its current
/// per-round secret.
///
/// Invariant: `y_j * G == Y[j]`; `r_j * G == R[j]` for whichever context
/// currently references this identity's round commitment.
pub struct ServerIdentity {
    pub index: usize,
    y: Scalar,
    r: Zeroizing<Scalar>,
}

impl ServerIdentity {
    pub fn new(index: usize, y: Scalar, rng: &mut (impl RngCore + CryptoRng)) -> Self {
        ServerIdentity {
            index,
            y,
            r: Zeroizing::new(random_scalar(rng)),
        }
    }

    pub fn public_key(&self) -> Point {
        generator() * self.y
    }

    /// `R_j = r_j * G`, the public commitment that must appear at
    /// `context.r[self.index]`.
    pub fn round_commitment(&self) -> Point {
        generator() * *self.r
    }

    /// Replaces `r_j` with a fresh scalar for the next round, zeroizing the
    /// previous value.
    pub fn rotate_round(&mut self, rng: &mut (impl RngCore + CryptoRng)) {
        self.r = Zeroizing::new(random_scalar(rng));
    }

    pub(crate) fn secret(&self) -> Scalar {
        self.y
    }

    pub(crate) fn round_secret(&self) -> Scalar {
        *self.r
    }
}
