//! Peer-to-peer terminal collaboration session layer: a compact binary wire
//! codec, and the server/client pair that speak it over plain TCP.
//!
//! No relay, no auth server, at most 8 peers. A session token generated by
//! the host and an ephemeral port form the join code a peer types in to
//! connect — see [`join_code`].

pub mod client;
pub mod join_code;
pub mod peer;
pub mod presence;
pub mod profile;
pub mod server;
pub mod wire;

pub use client::{ClientCallbacks, SessionClient};
pub use join_code::{format_join_code, parse_join_code};
pub use presence::{EditorMode, Presence};
pub use profile::Profile;
pub use server::{ServerCallbacks, SessionServer, MAX_PEERS};
