//! End-to-end authentication scenarios wiring together a client, a ring of
//! servers, and the distributed challenge-generation coordinator, all
//! in-process over an in-memory transport.

use std::cell::RefCell;
use std::time::Duration;

use curve25519_dalek::traits::Identity;
use rand::rngs::OsRng;

use daga::challenge_gen::{FollowerState, Leader};
use daga::client;
use daga::client_proof::ChallengeBundle;
use daga::context::Context;
use daga::group::{generator, random_scalar, Point};
use daga::identity::{ClientIdentity, ServerIdentity};
use daga::server;
use daga::tag::Tag;
use daga::transcript::{AuthMessage, Transcript};
use daga::transport::Transport;
use daga::DagaError;

/// A cothority of `m` servers, each reachable in-process. `request_challenge`
/// drives a full leader/follower commit-reveal-and-ring round;
/// `send_auth_message` walks the message through every server in order.
struct Cothority {
    context: Context,
    servers: RefCell<Vec<ServerIdentity>>,
}

impl Cothority {
    fn new(context: Context, servers: Vec<ServerIdentity>) -> Self {
        Cothority { context, servers: RefCell::new(servers) }
    }
}

impl Transport for Cothority {
    fn request_challenge(
        &self,
        context: &Context,
        commitments: &[Vec<Point>],
    ) -> Result<ChallengeBundle, DagaError> {
        let mut rng = OsRng;
        let servers = self.servers.borrow();
        let m = context.m();

        let mut leader = Leader::new(context, 0, commitments, Duration::from_secs(5));
        let mut followers: Vec<FollowerState> =
            (1..m).map(|i| FollowerState::new(i, commitments)).collect();

        let leader_commit = leader.announce(&servers[0], &mut rng);
        let mut commits = Vec::new();
        for (follower, srv) in followers.iter_mut().zip(&servers[1..]) {
            commits.push(follower.on_announce(context, leader_commit.clone(), srv, &mut rng)?);
        }
        for c in commits {
            leader.receive_commit(context, c)?;
        }

        let leader_opening = leader.reveal(&servers[0], &mut rng)?;
        let mut openings = Vec::new();
        for (follower, srv) in followers.iter_mut().zip(&servers[1..]) {
            openings.push(follower.on_open(context, leader_opening.clone(), srv, &mut rng)?);
        }
        for o in openings {
            leader.receive_opening(context, o)?;
        }

        let mut check = leader.finalize(&servers[0], &mut rng)?;
        for (follower, srv) in followers.iter_mut().zip(&servers[1..]) {
            check = follower.on_finalize(context, check, srv, &mut rng)?;
        }
        leader.receive_ring_return(context, check)
    }

    fn send_auth_message(&self, msg: &AuthMessage) -> Result<Transcript, DagaError> {
        let mut rng = OsRng;
        let servers = self.servers.borrow();
        let mut transcript = Transcript::new(msg.clone());
        for srv in servers.iter() {
            transcript = server::process_auth_message(&self.context, srv, transcript, &mut rng)?;
        }
        Ok(transcript)
    }
}

/// Tampers with one entry of the commitment vector `S` before forwarding the
/// message on to a wrapped cothority, simulating a misbehaving client.
struct TamperingTransport<'a> {
    inner: &'a Cothority,
    index: usize,
}

impl Transport for TamperingTransport<'_> {
    fn request_challenge(
        &self,
        context: &Context,
        commitments: &[Vec<Point>],
    ) -> Result<ChallengeBundle, DagaError> {
        self.inner.request_challenge(context, commitments)
    }

    fn send_auth_message(&self, msg: &AuthMessage) -> Result<Transcript, DagaError> {
        let mut msg = msg.clone();
        msg.s[self.index] = Point::identity();
        self.inner.send_auth_message(&msg)
    }
}

fn build_cothority(n: usize, m: usize, round_id: &[u8]) -> (Context, Cothority, Vec<daga::group::Scalar>) {
    let mut rng = OsRng;
    let server_sks: Vec<daga::group::Scalar> = (0..m).map(|_| random_scalar(&mut rng)).collect();
    let servers: Vec<ServerIdentity> = server_sks
        .iter()
        .enumerate()
        .map(|(j, sk)| ServerIdentity::new(j, *sk, &mut rng))
        .collect();
    let y = servers.iter().map(ServerIdentity::public_key).collect();
    let r = servers.iter().map(ServerIdentity::round_commitment).collect();
    let x: Vec<Point> = (0..n).map(|_| generator() * random_scalar(&mut rng)).collect();
    let context = Context::new(x, y, r, round_id.to_vec()).unwrap();
    let cothority = Cothority::new(context.clone(), servers);
    (context, cothority, server_sks)
}

#[test]
fn honest_client_authenticates_successfully() {
    let mut rng = OsRng;
    let (context, cothority, _) = build_cothority(3, 2, b"round-1");
    let client = ClientIdentity::generate(1, &mut rng);

    let tag = client::authenticate(&context, &client, &cothority, &mut rng).unwrap();
    assert!(!tag.is_null());
}

#[test]
fn repeated_authentication_in_the_same_round_yields_the_same_tag() {
    let mut rng = OsRng;
    let (context, cothority, _) = build_cothority(2, 2, b"round-stable");
    let client = ClientIdentity::generate(0, &mut rng);

    let first = client::authenticate(&context, &client, &cothority, &mut rng).unwrap();
    let second = client::authenticate(&context, &client, &cothority, &mut rng).unwrap();

    assert!(!first.is_null());
    assert_eq!(first.as_point(), second.as_point());
}

#[test]
fn rotating_server_round_secrets_changes_the_tag() {
    let mut rng = OsRng;
    let (context, cothority, server_sks) = build_cothority(2, 2, b"round-rotate");
    let client = ClientIdentity::generate(0, &mut rng);

    let before = client::authenticate(&context, &client, &cothority, &mut rng).unwrap();

    // Start a fresh round: new per-round secrets for every server, same
    // long-term keys and client group.
    let mut rotated_servers: Vec<ServerIdentity> = server_sks
        .iter()
        .enumerate()
        .map(|(j, sk)| ServerIdentity::new(j, *sk, &mut rng))
        .collect();
    for s in rotated_servers.iter_mut() {
        s.rotate_round(&mut rng);
    }
    let r = rotated_servers.iter().map(ServerIdentity::round_commitment).collect();
    let context2 = Context::new(context.x.clone(), context.y.clone(), r, b"round-rotate-2".to_vec()).unwrap();
    let cothority2 = Cothority::new(context2.clone(), rotated_servers);

    let after = client::authenticate(&context2, &client, &cothority2, &mut rng).unwrap();

    assert_ne!(before.as_point(), after.as_point());
}

#[test]
fn distinct_clients_in_the_same_round_produce_distinct_tags() {
    let mut rng = OsRng;
    let (context, cothority, _) = build_cothority(3, 2, b"round-distinct");
    let alice = ClientIdentity::generate(0, &mut rng);
    let bob = ClientIdentity::generate(1, &mut rng);

    let alice_tag = client::authenticate(&context, &alice, &cothority, &mut rng).unwrap();
    let bob_tag = client::authenticate(&context, &bob, &cothority, &mut rng).unwrap();

    assert!(!alice_tag.is_null());
    assert!(!bob_tag.is_null());
    assert_ne!(alice_tag.as_point(), bob_tag.as_point());
}

#[test]
fn tampered_intermediate_commitment_collapses_to_the_null_tag() {
    let mut rng = OsRng;
    let (context, cothority, _) = build_cothority(3, 2, b"round-misbehave");
    let client = ClientIdentity::generate(0, &mut rng);

    // S has length m+2=4: S[0]=Z, S[1]=G, S[2]=S_1, S[3]=S_2=S_m. Tampering
    // S[2] leaves S_m untouched, so PKclient still verifies and the
    // misbehavior surfaces only once a server checks its own link.
    let tamperer = TamperingTransport { inner: &cothority, index: 2 };

    let tag = client::authenticate(&context, &client, &tamperer, &mut rng).unwrap();
    assert_eq!(tag, Tag::Null);
}

#[test]
fn single_server_round_still_authenticates() {
    let mut rng = OsRng;
    let (context, cothority, _) = build_cothority(2, 1, b"round-single");
    let client = ClientIdentity::generate(1, &mut rng);

    let tag = client::authenticate(&context, &client, &cothority, &mut rng).unwrap();
    assert!(!tag.is_null());
}

/// A transport that forwards to a wrapped cothority but keeps a copy of the
/// last completed transcript, so a test can tamper with it after the fact.
struct RecordingTransport<'a> {
    inner: &'a Cothority,
    last: RefCell<Option<Transcript>>,
}

impl Transport for RecordingTransport<'_> {
    fn request_challenge(
        &self,
        context: &Context,
        commitments: &[Vec<Point>],
    ) -> Result<ChallengeBundle, DagaError> {
        self.inner.request_challenge(context, commitments)
    }

    fn send_auth_message(&self, msg: &AuthMessage) -> Result<Transcript, DagaError> {
        let transcript = self.inner.send_auth_message(msg)?;
        *self.last.borrow_mut() = Some(transcript.clone());
        Ok(transcript)
    }
}

#[test]
fn forging_a_signature_breaks_transcript_extraction() {
    let mut rng = OsRng;
    let (context, cothority, _) = build_cothority(2, 1, b"round-forge");
    let client = ClientIdentity::generate(0, &mut rng);
    let recorder = RecordingTransport { inner: &cothority, last: RefCell::new(None) };

    let tag = client::authenticate(&context, &client, &recorder, &mut rng).unwrap();
    assert!(!tag.is_null());

    let mut forged = recorder.last.borrow().clone().unwrap();
    let wrong_key = random_scalar(&mut rng);
    forged.sigs[0] = daga::group::sign(&wrong_key, b"forged", &mut rng);

    assert!(daga::transcript::extract_tag(&context, &forged).is_err());
}
