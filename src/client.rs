//! The client's authentication operation.

use rand::{CryptoRng, RngCore};

use crate::client_proof::{self, PKclientProof};
use crate::context::Context;
use crate::errors::DagaError;
use crate::identity::ClientIdentity;
use crate::tag::{build_initial_tag_and_commitments, Tag};
use crate::transcript::{extract_tag, AuthMessage};
use crate::transport::Transport;

/// `authenticate(context, client, transport) -> Tag`.
///
/// Aborts before sending any response if the challenge bundle fails
/// verification (step 5): an honest client never reveals its responses to
/// an unbound or under-signed challenge.
pub fn authenticate(
    context: &Context,
    client: &ClientIdentity,
    transport: &impl Transport,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<Tag, DagaError> {
    if client.index >= context.n() {
        return Err(DagaError::MalformedMessage(
            "client index out of range for context".into(),
        ));
    }

    // Step 1: initial tag and commitments.
    let (itc, witness) = build_initial_tag_and_commitments(context, client, rng)?;

    // Step 2-3: build the PKclient predicate and collect its commitments.
    let predicate = client_proof::build_predicate(context, itc.t0, itc.s_m());
    let (t, prover_state) = predicate.prover_commit(
        client.index,
        &vec![client.secret(), witness.s],
        rng,
    )?;

    // Step 4: request the challenge from the leader.
    let bundle = transport.request_challenge(context, &t)?;

    // Step 5: verify it before committing to anything further.
    client_proof::verify_challenge_bundle(context, &t, &bundle)?;

    // Step 6: answer the challenge.
    let (c, r) = predicate.prover_response(prover_state, &bundle.c)?;
    let proof = PKclientProof { cs: bundle, t, c, r };

    // Step 7: assemble the authentication message.
    let msg = AuthMessage {
        context: context.clone(),
        t0: itc.t0,
        s: itc.s,
        proof,
    };

    // Step 8: send it off and receive the completed transcript.
    let transcript = transport.send_auth_message(&msg)?;

    // Step 9: extract and return the final tag.
    extract_tag(context, &transcript)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{generator, random_scalar};
    use rand::rngs::OsRng;

    #[test]
    fn rejects_client_index_outside_context() {
        let mut rng = OsRng;
        let x = vec![generator() * random_scalar(&mut rng), generator() * random_scalar(&mut rng)];
        let y = vec![generator() * random_scalar(&mut rng)];
        let r = vec![generator() * random_scalar(&mut rng)];
        let context = Context::new(x, y, r, b"round".to_vec()).unwrap();
        let client = ClientIdentity::generate(5, &mut rng);

        struct UnusedTransport;
        impl Transport for UnusedTransport {
            fn request_challenge(
                &self,
                _context: &Context,
                _commitments: &[Vec<crate::group::Point>],
            ) -> Result<crate::client_proof::ChallengeBundle, DagaError> {
                unreachable!("authenticate should fail before using the transport")
            }
            fn send_auth_message(&self, _msg: &AuthMessage) -> Result<crate::transcript::Transcript, DagaError> {
                unreachable!("authenticate should fail before using the transport")
            }
        }

        assert!(authenticate(&context, &client, &UnusedTransport, &mut rng).is_err());
    }
}
