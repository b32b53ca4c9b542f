//! A server's authentication operation: validate the transcript it
//! received so far, compute its own contribution (regular transform or
//! misbehaving proof), sign, and append.

use rand::{CryptoRng, RngCore};

use curve25519_dalek::traits::Identity;

use crate::context::Context;
use crate::errors::DagaError;
use crate::group::{self, Point};
use crate::identity::ServerIdentity;
use crate::server_proof;
use crate::tag::shared_secret;
use crate::transcript::Transcript;

/// `processAuthMessage(context, server, transcript) -> transcript`.
pub fn process_auth_message(
    context: &Context,
    server: &ServerIdentity,
    mut transcript: Transcript,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<Transcript, DagaError> {
    let j = server.index;

    // Preconditions: shapes, then the prior segment, PKclient proof,
    // and all prior server proofs must all verify before this server
    // computes its own contribution.
    transcript.validate_shape(context)?;
    transcript.verify_signatures(context)?;
    transcript.request.verify_pk_client()?;
    transcript.verify_proofs(context)?;

    if transcript.len() != j {
        return Err(DagaError::MalformedMessage(format!(
            "server {j} received a transcript at the wrong ring position (len {})",
            transcript.len()
        )));
    }

    let z = transcript.request.s[0];
    let s_j = shared_secret(z, server.secret());
    let s_prev = transcript.request.s[j + 1];
    let s_cur = transcript.request.s[j + 2];
    let t_prev = transcript.previous_tag();

    let (t_new, proof) = if s_cur != s_prev * s_j {
        let proof = server_proof::generate_misbehaving(server, z, rng)?;
        (Point::identity(), proof)
    } else {
        let t_new = t_prev * (server.round_secret() * s_j.invert());
        let proof = server_proof::generate_regular(
            server,
            s_j,
            server.round_commitment(),
            s_prev,
            s_cur,
            t_prev,
            t_new,
            rng,
        )?;
        (t_new, proof)
    };

    let mut data = transcript.running_data_through(transcript.len());
    group::write_lp(&mut data, &group::encode_point(&t_new));
    group::write_lp(&mut data, &proof.canonical_bytes());
    group::write_lp(&mut data, j.to_string().as_bytes());
    let sig = group::sign(&server.secret(), &data, rng);

    transcript.push(t_new, proof, j, sig);
    Ok(transcript)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client_proof::{build_predicate, ChallengeBundle};
    use crate::group::{generator, random_scalar};
    use crate::identity::ClientIdentity;
    use crate::tag::build_initial_tag_and_commitments;
    use crate::transcript::AuthMessage;
    use rand::rngs::OsRng;

    fn honest_auth_message(
        context: &Context,
        client: &ClientIdentity,
        server_sks: &[crate::group::Scalar],
        rng: &mut (impl RngCore + CryptoRng),
    ) -> AuthMessage {
        let (itc, witness) = build_initial_tag_and_commitments(context, client, rng).unwrap();
        let predicate = build_predicate(context, itc.t0, itc.s_m());
        let (t, state) = predicate
            .prover_commit(client.index, &vec![client.secret(), witness.s], rng)
            .unwrap();
        let c = random_scalar(rng);
        let message = crate::client_proof::challenge_bundle_message(&c, &t);
        let sigs = server_sks
            .iter()
            .enumerate()
            .map(|(j, sk)| (j, group::sign(sk, &message, rng)))
            .collect();
        let (c_sub, r) = predicate.prover_response(state, &c).unwrap();
        let proof = crate::client_proof::PKclientProof {
            cs: ChallengeBundle { c, sigs },
            t,
            c: c_sub,
            r,
        };
        AuthMessage { context: context.clone(), t0: itc.t0, s: itc.s, proof }
    }

    #[test]
    fn single_server_processes_honest_client() {
        let mut rng = OsRng;
        let server_sk = random_scalar(&mut rng);
        let server = ServerIdentity::new(0, server_sk, &mut rng);
        let x = vec![generator() * random_scalar(&mut rng), generator() * random_scalar(&mut rng)];
        let y = vec![server.public_key()];
        let r = vec![server.round_commitment()];
        let context = Context::new(x, y, r, b"round".to_vec()).unwrap();
        let client = ClientIdentity::generate(0, &mut rng);
        let msg = honest_auth_message(&context, &client, &[server_sk], &mut rng);

        let transcript = Transcript::new(msg);
        let processed = process_auth_message(&context, &server, transcript, &mut rng).unwrap();
        assert_eq!(processed.len(), 1);
        assert!(!processed.proofs[0].is_misbehaving());
        assert_ne!(processed.tags()[0], Point::identity());
    }

    #[test]
    fn server_flags_tampered_intermediate_commitment() {
        let mut rng = OsRng;
        let sk0 = random_scalar(&mut rng);
        let sk1 = random_scalar(&mut rng);
        let server0 = ServerIdentity::new(0, sk0, &mut rng);
        let server1 = ServerIdentity::new(1, sk1, &mut rng);
        let x: Vec<Point> = (0..3).map(|_| generator() * random_scalar(&mut rng)).collect();
        let y = vec![server0.public_key(), server1.public_key()];
        let r = vec![server0.round_commitment(), server1.round_commitment()];
        let context = Context::new(x, y, r, b"round".to_vec()).unwrap();
        let client = ClientIdentity::generate(0, &mut rng);
        // S has length m+2=4: s[0]=Z, s[1]=G, s[2]=S_1, s[3]=S_2=S_m. Forcing
        // s[2] to the identity leaves S_m (used by PKclient) untouched, so
        // the PKclient proof still verifies; server 0 alone catches the
        // inconsistency S[2] != s_0 * S[1].
        let mut msg = honest_auth_message(&context, &client, &[sk0, sk1], &mut rng);
        msg.s[2] = Point::identity();

        let transcript = Transcript::new(msg);
        let processed = process_auth_message(&context, &server0, transcript, &mut rng).unwrap();
        assert!(processed.proofs[0].is_misbehaving());
        assert_eq!(processed.tags()[0], Point::identity());
    }
}
