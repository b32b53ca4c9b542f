//
// Authors:
// - Nugzari Uzoevi <nougzarm@icloud.com>
// - Michele Orrù <m@orru.net>
// - Lénaïck Gouriou <lg@leanear.io>

#![allow(non_snake_case)]
#![doc(html_logo_url = "https://mmaker.github.io/sigma-rs/")]
//! # daga
//!
//! Deniable Anonymous Group Authentication: a client holding one private key
//! from a known group of public keys authenticates to a cothority of
//! servers, producing a linkage tag that is anonymous, linkable within a
//! round, unlinkable across rounds, deniable, and misbehavior-exposing.
//!
//! This crate implements the cryptographic and distributed-protocol core
//! only: RPC transport, persistence, CLI front-ends, and roster management
//! are named as traits (see [`transport`]) with no concrete implementation
//! behind them.

#![deny(unused_mut)]

pub mod codec;
pub mod config;
pub mod errors;
pub mod group;
pub mod sigma;

pub mod challenge_gen;
pub mod client;
pub mod client_proof;
pub mod context;
pub mod identity;
pub mod server;
pub mod server_proof;
pub mod tag;
pub mod transcript;
pub mod transport;

pub use errors::DagaError;
pub use group::{Point, Scalar};
