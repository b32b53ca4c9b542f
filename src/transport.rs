//! External interfaces: the RPC surface a server exposes and the
//! client-side view of it. Concrete transport, persistence, and roster
//! management are out of scope — only the contracts are named here.

use crate::client_proof::ChallengeBundle;
use crate::context::Context;
use crate::errors::DagaError;
use crate::group::Point;
use crate::transcript::{AuthMessage, Transcript};

/// The client-side view of the cothority: how a client reaches the leader
/// for a challenge and any server for the authentication exchange.
pub trait Transport {
    /// `PKclient` endpoint: send the PKclient commitments to the
    /// leader, block for the collectively-signed challenge.
    fn request_challenge(
        &self,
        context: &Context,
        commitments: &[Vec<Point>],
    ) -> Result<ChallengeBundle, DagaError>;

    /// `Auth` endpoint: send the complete authentication message,
    /// block for the completed transcript.
    fn send_auth_message(&self, msg: &AuthMessage) -> Result<Transcript, DagaError>;
}

/// The server-side RPC surface. `create_context` is named for
/// completeness; its policy (who may create a context, roster management)
/// is out of scope and left to the caller of this trait.
pub trait CothorityServer {
    fn create_context(&self, context: Context) -> Result<Context, DagaError>;

    fn pk_client(
        &self,
        context: &Context,
        commitments: &[Vec<Point>],
    ) -> Result<ChallengeBundle, DagaError>;

    fn auth(&self, msg: AuthMessage) -> Result<Transcript, DagaError>;
}
