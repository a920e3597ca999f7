//! The collab session client: one socket, one dedicated I/O thread, a 10ms
//! poll. Connects, joins, and then mirrors server-broadcast presence into a
//! local peer directory.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;

use crate::presence::Presence;
use crate::profile::Profile;
use crate::wire::{self, TYPE_PEER_JOINED, TYPE_PEER_LEFT, TYPE_PRESENCE, TYPE_WELCOME};

const INBOUND_BUFFER_LEN: usize = 4096;
const POLL_INTERVAL: Duration = Duration::from_millis(10);
pub const MAX_PEERS: usize = 8;

/// Host-facing callbacks, fired synchronously on the client's I/O thread.
pub struct ClientCallbacks {
    pub on_welcome: Box<dyn Fn(u8, Profile) + Send>,
    pub on_peer_joined: Box<dyn Fn(Profile) + Send>,
    pub on_peer_left: Box<dyn Fn(u8) + Send>,
    pub on_presence: Box<dyn Fn(u8, Presence) + Send>,
}

struct SharedState {
    peer_id: AtomicU8,
    directory: Mutex<Vec<Option<Profile>>>,
    host_profile: Mutex<Option<Profile>>,
}

/// A running collab client. Dropping it stops the I/O thread.
pub struct SessionClient {
    shared: Arc<SharedState>,
    write_half: TcpStream,
    stop_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SessionClient {
    /// Connects to `addr` (the only blocking call in this type's lifetime),
    /// immediately sends `join` with `local_profile`, and spawns the I/O
    /// thread.
    pub fn connect(
        addr: (&str, u16),
        local_profile: Profile,
        callbacks: ClientCallbacks,
    ) -> io::Result<Self> {
        let socket = TcpStream::connect(addr)?;
        socket.set_nonblocking(true)?;
        let write_half = socket.try_clone()?;

        let shared = Arc::new(SharedState {
            peer_id: AtomicU8::new(0),
            directory: Mutex::new((0..MAX_PEERS).map(|_| None).collect()),
            host_profile: Mutex::new(None),
        });
        let stop_flag = Arc::new(AtomicBool::new(false));

        {
            let mut join_socket = socket.try_clone()?;
            let frame = wire::encode_frame(wire::TYPE_JOIN, &local_profile.encode());
            let _ = join_socket.write(&frame);
        }

        let thread_shared = Arc::clone(&shared);
        let thread_stop = Arc::clone(&stop_flag);
        let thread = std::thread::spawn(move || {
            run_io_loop(socket, thread_shared, thread_stop, callbacks);
        });

        Ok(Self { shared, write_half, stop_flag, thread: Some(thread) })
    }

    #[must_use]
    pub fn peer_id(&self) -> u8 {
        self.shared.peer_id.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn host_profile(&self) -> Option<Profile> {
        self.shared.host_profile.lock().clone()
    }

    /// Profile at directory slot `peer_id - 1`, or `None` if unoccupied or
    /// `peer_id` is out of range (including 0, the host, which has its own
    /// accessor).
    #[must_use]
    pub fn peer(&self, peer_id: u8) -> Option<Profile> {
        let index = peer_id.checked_sub(1)? as usize;
        self.shared.directory.lock().get(index).cloned().flatten()
    }

    /// Encodes and writes one presence frame, best-effort. A short write or
    /// `WouldBlock` is silently dropped.
    pub fn send_presence(&mut self, presence: &Presence) {
        let frame = wire::encode_frame(TYPE_PRESENCE, &presence.encode());
        self.best_effort_write(&frame);
    }

    fn best_effort_write(&mut self, frame: &[u8]) {
        match self.write_half.write(frame) {
            Ok(n) if n == frame.len() => {}
            Ok(_) => log::debug!("collab client: short write, frame dropped"),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => log::debug!("collab client: write error: {e}"),
        }
    }

    pub fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_io_loop(
    mut socket: TcpStream,
    shared: Arc<SharedState>,
    stop_flag: Arc<AtomicBool>,
    callbacks: ClientCallbacks,
) {
    let mut buf = [0u8; INBOUND_BUFFER_LEN];
    let mut write_pos = 0usize;

    while !stop_flag.load(Ordering::SeqCst) {
        match socket.read(&mut buf[write_pos..]) {
            Ok(0) => break,
            Ok(n) => write_pos += n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => {
                log::debug!("collab client: read error: {e}");
                break;
            }
        }

        let mut offset = 0;
        while let Some(frame) = wire::try_decode_frame(&buf[offset..write_pos]) {
            if frame.payload.len() <= wire::MAX_PAYLOAD {
                dispatch(frame.msg_type, frame.payload, &shared, &callbacks);
            }
            offset += frame.consumed;
        }
        if offset > 0 {
            buf.copy_within(offset..write_pos, 0);
            write_pos -= offset;
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}

fn dispatch(msg_type: u8, payload: &[u8], shared: &Arc<SharedState>, callbacks: &ClientCallbacks) {
    match msg_type {
        TYPE_WELCOME => {
            if payload.is_empty() {
                return;
            }
            let assigned_id = payload[0];
            let Some(host_profile) = Profile::decode(&payload[1..]) else { return };
            shared.peer_id.store(assigned_id, Ordering::SeqCst);
            *shared.host_profile.lock() = Some(host_profile.clone());
            (callbacks.on_welcome)(assigned_id, host_profile);
        }
        TYPE_PEER_JOINED => {
            let Some(profile) = Profile::decode(payload) else { return };
            if let Some(index) = (profile.peer_id as usize).checked_sub(1) {
                if let Some(slot) = shared.directory.lock().get_mut(index) {
                    *slot = Some(profile.clone());
                }
            }
            (callbacks.on_peer_joined)(profile);
        }
        TYPE_PEER_LEFT => {
            if payload.is_empty() {
                return;
            }
            let departed_id = payload[0];
            if let Some(index) = (departed_id as usize).checked_sub(1) {
                if let Some(slot) = shared.directory.lock().get_mut(index) {
                    *slot = None;
                }
            }
            (callbacks.on_peer_left)(departed_id);
        }
        TYPE_PRESENCE => {
            let Some(presence) = Presence::decode(payload) else { return };
            (callbacks.on_presence)(presence.peer_id, presence);
        }
        other => log::debug!("collab client: ignoring unknown message type {other}"),
    }
}
