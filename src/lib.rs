//! Root crate tying the smooth-scroll animation engine ([`godly_scroll`])
//! and the peer collaboration session layer ([`godly_collab`]) to a shared
//! per-frame render loop. See [`bridge::Bridge`].

pub mod bridge;

pub use bridge::{Bridge, CollabRole};
pub use godly_collab;
pub use godly_scroll;
