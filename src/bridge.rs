//! Ties the scroll engine and the collab session to a single per-frame
//! loop: the render thread drives both through one `Bridge`, and presence
//! updates piggyback on the same cadence as scroll flushes.
//!
//! Owning both from one struct is a convenience for a host application with
//! a single render thread, not a requirement — either half works standalone
//! via `godly_scroll` / `godly_collab` directly.

use std::io;

use godly_collab::{
    ClientCallbacks, Presence, Profile, ServerCallbacks, SessionClient, SessionServer,
};
use godly_scroll::{CellGrid, ResizeError, ScrollEngine};

/// Which side of a collab session this bridge is driving, if any.
pub enum CollabRole {
    Host(SessionServer),
    Guest(SessionClient),
    None,
}

/// Per-frame orchestration: one scroll engine, and an optional collab role.
///
/// The render thread is expected to call [`Bridge::begin_frame`] once the
/// frame's cell grid is rebuilt and just before handing it to the GPU
/// pipeline, then [`Bridge::end_frame`] immediately after upload. Collab
/// presence is pushed on the same cadence via [`Bridge::publish_presence`]
/// so a host doesn't need a second timer just for presence.
pub struct Bridge {
    scroll: ScrollEngine,
    collab: CollabRole,
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new()
    }
}

impl Bridge {
    #[must_use]
    pub fn new() -> Self {
        Self { scroll: ScrollEngine::new(), collab: CollabRole::None }
    }

    #[must_use]
    pub fn scroll(&self) -> &ScrollEngine {
        &self.scroll
    }

    pub fn scroll_mut(&mut self) -> &mut ScrollEngine {
        &mut self.scroll
    }

    /// Starts hosting a collab session on an ephemeral port, replacing any
    /// previous collab role.
    pub fn host_session(
        &mut self,
        host_profile: Profile,
        callbacks: ServerCallbacks,
        token: [u8; 16],
    ) -> io::Result<&SessionServer> {
        let server = SessionServer::start(host_profile, callbacks, token)?;
        log::debug!("bridge: hosting a collab session on port {}", server.port());
        self.collab = CollabRole::Host(server);
        match &self.collab {
            CollabRole::Host(server) => Ok(server),
            _ => unreachable!(),
        }
    }

    /// Joins an existing collab session as a guest, replacing any previous
    /// collab role. `connect` is the only blocking call on this path.
    pub fn join_session(
        &mut self,
        addr: (&str, u16),
        local_profile: Profile,
        callbacks: ClientCallbacks,
    ) -> io::Result<&SessionClient> {
        let client = SessionClient::connect(addr, local_profile, callbacks)?;
        log::debug!("bridge: joined a collab session at {}:{}", addr.0, addr.1);
        self.collab = CollabRole::Guest(client);
        match &self.collab {
            CollabRole::Guest(client) => Ok(client),
            _ => unreachable!(),
        }
    }

    pub fn leave_session(&mut self) {
        if !matches!(self.collab, CollabRole::None) {
            log::debug!("bridge: leaving the active collab session");
        }
        self.collab = CollabRole::None;
    }

    /// Pushes one presence update through whichever collab role is active.
    /// A no-op if no session is active — callers don't need to check first.
    pub fn publish_presence(&mut self, presence: &Presence) {
        match &mut self.collab {
            CollabRole::Host(server) => server.broadcast_host_presence(presence),
            CollabRole::Guest(client) => client.send_presence(presence),
            CollabRole::None => {}
        }
    }

    /// Queues a scroll delta for the next `begin_frame`. Safe to call off
    /// the render thread under the same discipline `ScrollEngine::queue_scroll`
    /// documents.
    pub fn queue_scroll(&mut self, delta: i64, top: u16, bottom: u16, left: u16, right: u16) {
        self.scroll.queue_scroll(delta, top, bottom, left, right);
    }

    /// Runs the flush → populate bracket for one frame, mutating `grid` in
    /// place with animated content and returning the uniforms the renderer
    /// should publish alongside it.
    pub fn begin_frame(
        &mut self,
        grid: &mut CellGrid,
        dt: f32,
        duration: f32,
        cell_height: f32,
    ) -> Result<godly_scroll::RendererUniforms, ResizeError> {
        self.scroll.flush(grid, dt, duration)?;
        self.scroll.populate_cells_for_render(grid);
        Ok(self.scroll.uniforms(cell_height))
    }

    /// Restores `grid` to its clean state after the GPU upload this frame.
    pub fn end_frame(&mut self, grid: &mut CellGrid) {
        self.scroll.restore_cells(grid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use godly_collab::{EditorMode, Presence};
    use godly_scroll::CellGrid;

    #[test]
    fn begin_then_end_frame_round_trips_a_quiescent_grid() {
        let grid = CellGrid::new(24, 80);
        let mut bridge = Bridge::new();
        let mut render_grid = grid.clone();

        bridge.queue_scroll(0, 1, 23, 0, 0);
        let uniforms = bridge.begin_frame(&mut render_grid, 1.0 / 60.0, 0.25, 20.0).unwrap();
        assert_eq!(uniforms.scroll_offset_lines, 0);
        bridge.end_frame(&mut render_grid);

        assert_eq!(render_grid, grid);
    }

    #[test]
    fn publish_presence_without_a_session_is_a_harmless_no_op() {
        let mut bridge = Bridge::new();
        let presence = Presence {
            peer_id: 0,
            row: 1,
            col: 1,
            mode: EditorMode::Normal,
            file_name: String::new(),
        };
        bridge.publish_presence(&presence);
    }

    #[test]
    fn hosting_then_leaving_a_session_clears_the_collab_role() {
        let mut bridge = Bridge::new();
        let callbacks = ServerCallbacks {
            on_join: Box::new(|_| {}),
            on_presence: Box::new(|_, _, _| {}),
            on_leave: Box::new(|_| {}),
        };
        bridge
            .host_session(Profile::new(0, "alice", 0), callbacks, [7u8; 16])
            .unwrap();
        assert!(matches!(bridge.collab, CollabRole::Host(_)));

        bridge.leave_session();
        assert!(matches!(bridge.collab, CollabRole::None));
    }
}
