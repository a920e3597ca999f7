//! The collab session server: accepts up to 8 peers on an ephemeral TCP
//! port, routes join/presence/leave messages, and owns the one dedicated
//! I/O thread that does all of that work.

use std::io;
use std::net::TcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;

use crate::join_code::format_join_code;
use crate::peer::{Peer, PeerError};
use crate::presence::Presence;
use crate::profile::Profile;
use crate::wire::{self, TYPE_JOIN, TYPE_PRESENCE};

pub const MAX_PEERS: usize = 8;

const ACCEPT_LOOP_SLEEP: Duration = Duration::from_millis(1);

/// Host-facing callbacks. Fired synchronously on the I/O thread — a host
/// that needs the result on its own UI thread must marshal it out via its
/// own channel; these callbacks must not block or run long.
pub struct ServerCallbacks {
    pub on_join: Box<dyn Fn(Profile) + Send>,
    pub on_presence: Box<dyn Fn(u8, Presence, Profile) + Send>,
    pub on_leave: Box<dyn Fn(u8) + Send>,
}

type PeersTable = Vec<Option<Peer>>;

/// A running collab server. Dropping it stops the I/O thread.
pub struct SessionServer {
    port: u16,
    token: [u8; 16],
    peers: Arc<Mutex<PeersTable>>,
    stop_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SessionServer {
    /// Binds `0.0.0.0:0`, discovers the assigned port, generates a session
    /// token, and spawns the I/O thread. Only the bind itself can fail here;
    /// everything past that point runs on the I/O thread and degrades by
    /// dropping peers, never by propagating an error back to the host.
    pub fn start(host_profile: Profile, callbacks: ServerCallbacks, token: [u8; 16]) -> io::Result<Self> {
        let listener = TcpListener::bind("0.0.0.0:0")?;
        listener.set_nonblocking(true)?;
        let port = listener.local_addr()?.port();

        let peers: Arc<Mutex<PeersTable>> = Arc::new(Mutex::new((0..MAX_PEERS).map(|_| None).collect()));
        let stop_flag = Arc::new(AtomicBool::new(false));

        let thread_peers = Arc::clone(&peers);
        let thread_stop = Arc::clone(&stop_flag);
        let thread = std::thread::spawn(move || {
            run_io_loop(listener, thread_peers, thread_stop, host_profile, callbacks);
        });

        Ok(Self { port, token, peers, stop_flag, thread: Some(thread) })
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn join_code(&self) -> String {
        format_join_code(&self.token, self.port)
    }

    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.peers.lock().iter().filter(|p| p.is_some()).count()
    }

    /// A host-driven push: sends a presence frame to every connected peer.
    /// The host's own peer id is always 0.
    pub fn broadcast_host_presence(&self, presence: &Presence) {
        let frame = wire::encode_frame(TYPE_PRESENCE, &presence.encode());
        for slot in self.peers.lock().iter_mut().flatten() {
            slot.send(&frame);
        }
    }

    /// Signals the I/O thread to stop and joins it. Idempotent.
    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SessionServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_io_loop(
    listener: TcpListener,
    peers: Arc<Mutex<PeersTable>>,
    stop_flag: Arc<AtomicBool>,
    host_profile: Profile,
    callbacks: ServerCallbacks,
) {
    while !stop_flag.load(Ordering::SeqCst) {
        accept_new_peers(&listener, &peers);
        pump_peers(&peers, &host_profile, &callbacks);
        std::thread::sleep(ACCEPT_LOOP_SLEEP);
    }
}

fn accept_new_peers(listener: &TcpListener, peers: &Arc<Mutex<PeersTable>>) {
    loop {
        match listener.accept() {
            Ok((socket, _addr)) => {
                let mut table = peers.lock();
                match table.iter().position(Option::is_none) {
                    Some(slot) => {
                        if let Err(e) = socket.set_nonblocking(true) {
                            log::warn!("collab: failed to set accepted socket nonblocking: {e}");
                            continue;
                        }
                        table[slot] = Some(Peer::new(socket));
                        log::debug!("collab: accepted peer into slot {slot}");
                    }
                    None => {
                        log::debug!("collab: peers table full, rejecting connection");
                        drop(socket);
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) => {
                log::warn!("collab: accept error: {e}");
                break;
            }
        }
    }
}

/// Queued outcomes of one pump pass: frames to broadcast and the host
/// callback to invoke once those broadcasts have gone out, preserving the
/// "broadcast before callback" ordering the wire protocol promises for join
/// and presence (leave is the other way around — see `remove_peer`).
enum Deferred {
    Join(Profile),
    Presence(u8, Presence, Profile),
}

fn pump_peers(peers: &Arc<Mutex<PeersTable>>, host_profile: &Profile, callbacks: &ServerCallbacks) {
    let mut removed = Vec::new();
    let mut broadcasts: Vec<(usize, Vec<u8>)> = Vec::new();
    let mut deferred = Vec::new();

    {
        let mut table = peers.lock();
        for slot in 0..table.len() {
            let Some(peer) = table[slot].as_mut() else { continue };
            match peer.pump() {
                Ok(messages) => {
                    for (msg_type, payload) in messages {
                        match msg_type {
                            TYPE_JOIN => {
                                handle_join(peer, slot, &payload, host_profile, &mut broadcasts, &mut deferred)
                            }
                            TYPE_PRESENCE => handle_presence(peer, &payload, &mut broadcasts, &mut deferred, slot),
                            other => log::debug!("collab: server ignoring unknown message type {other}"),
                        }
                    }
                }
                Err(PeerError::Closed | PeerError::Io(_)) => removed.push(slot),
            }
        }

        for (from_slot, frame) in &broadcasts {
            for (slot, maybe_peer) in table.iter_mut().enumerate() {
                if slot == *from_slot {
                    continue;
                }
                if let Some(peer) = maybe_peer {
                    peer.send(frame);
                }
            }
        }
    }

    for item in deferred {
        match item {
            Deferred::Join(profile) => (callbacks.on_join)(profile),
            Deferred::Presence(peer_id, presence, profile) => {
                (callbacks.on_presence)(peer_id, presence, profile)
            }
        }
    }

    for slot in removed {
        remove_peer(peers, slot, callbacks);
    }
}

fn handle_join(
    peer: &mut Peer,
    slot: usize,
    payload: &[u8],
    host_profile: &Profile,
    broadcasts: &mut Vec<(usize, Vec<u8>)>,
    deferred: &mut Vec<Deferred>,
) {
    let Some(mut profile) = Profile::decode(payload) else {
        log::debug!("collab: malformed join payload, dropped");
        return;
    };
    profile.peer_id = (slot + 1) as u8;
    peer.profile = profile.clone();

    let mut welcome_payload = vec![profile.peer_id];
    welcome_payload.extend_from_slice(&host_profile.encode());
    peer.send(&wire::encode_frame(wire::TYPE_WELCOME, &welcome_payload));

    broadcasts.push((slot, wire::encode_frame(wire::TYPE_PEER_JOINED, &profile.encode())));
    deferred.push(Deferred::Join(profile));
}

fn handle_presence(
    peer: &mut Peer,
    payload: &[u8],
    broadcasts: &mut Vec<(usize, Vec<u8>)>,
    deferred: &mut Vec<Deferred>,
    slot: usize,
) {
    let Some(presence) = Presence::decode(payload) else {
        log::debug!("collab: malformed presence payload, dropped");
        return;
    };
    peer.last_presence = Some(presence.clone());
    broadcasts.push((slot, wire::encode_frame(TYPE_PRESENCE, payload)));
    deferred.push(Deferred::Presence(presence.peer_id, presence, peer.profile.clone()));
}

fn remove_peer(peers: &Arc<Mutex<PeersTable>>, slot: usize, callbacks: &ServerCallbacks) {
    let (departed_id, frame) = {
        let mut table = peers.lock();
        let Some(peer) = table[slot].take() else { return };
        (peer.profile.peer_id, wire::encode_frame(wire::TYPE_PEER_LEFT, &[peer.profile.peer_id]))
    };

    (callbacks.on_leave)(departed_id);

    let mut table = peers.lock();
    for maybe_peer in table.iter_mut().flatten() {
        maybe_peer.send(&frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{encode_frame, try_decode_frame, TYPE_JOIN};
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::sync::mpsc;

    fn noop_callbacks() -> ServerCallbacks {
        ServerCallbacks {
            on_join: Box::new(|_| {}),
            on_presence: Box::new(|_, _, _| {}),
            on_leave: Box::new(|_| {}),
        }
    }

    #[test]
    fn start_binds_an_ephemeral_port_and_produces_a_join_code() {
        let host = Profile::new(0, "alice", 0x7aa2f7);
        let server = SessionServer::start(host, noop_callbacks(), [1u8; 16]).unwrap();
        assert!(server.port() > 0);
        assert!(server.join_code().contains(':'));
    }

    #[test]
    fn join_then_welcome_assigns_peer_id_one_and_fires_join_callback() {
        let host = Profile::new(0, "alice", 0x7aa2f7);
        let (tx, rx) = mpsc::channel();
        let callbacks = ServerCallbacks {
            on_join: Box::new(move |profile| tx.send(profile).unwrap()),
            on_presence: Box::new(|_, _, _| {}),
            on_leave: Box::new(|_| {}),
        };
        let server = SessionServer::start(host, callbacks, [2u8; 16]).unwrap();

        let mut client = TcpStream::connect(("127.0.0.1", server.port())).unwrap();
        let bob = Profile::new(0, "bob", 0x00ff00);
        client.write_all(&encode_frame(TYPE_JOIN, &bob.encode())).unwrap();

        let mut buf = [0u8; 128];
        client.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        let n = client.read(&mut buf).unwrap();
        let decoded = try_decode_frame(&buf[..n]).unwrap();
        assert_eq!(decoded.msg_type, wire::TYPE_WELCOME);
        assert_eq!(decoded.payload[0], 1);

        let joined = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(joined.name, "bob");
        assert_eq!(joined.peer_id, 1);
    }

    #[test]
    fn peer_count_reflects_connected_peers() {
        let host = Profile::new(0, "alice", 0);
        let server = SessionServer::start(host, noop_callbacks(), [3u8; 16]).unwrap();
        assert_eq!(server.peer_count(), 0);

        let _client = TcpStream::connect(("127.0.0.1", server.port())).unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(server.peer_count(), 1);
    }
}
