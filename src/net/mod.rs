//! Connection-dispatch network layer: the acceptor loop (C7), the worker
//! poll loop (C8), and the shared types that connect them to the session,
//! auth, and storage tables.

pub mod acceptor;
pub mod listener;
pub mod poll;
pub mod worker;

use std::os::unix::io::RawFd;
use std::sync::Arc;

use crate::auth::AuthTable;
use crate::error::CoreResult;
use crate::session::SessionRegistry;
use crate::storage::StorageTable;

/// Handoff payload carried from the acceptor to a worker (C7→C8).
pub struct HandoffElement {
    pub client_sockfd: RawFd,
}

/// Read-only-by-the-worker bundle passed to `serve()`. The tables it
/// references are internally synchronized; the context itself is never
/// mutated concurrently (`SPEC_FULL.md` §3).
pub struct ClientContext {
    pub client_sockfd: RawFd,
    pub auth: Arc<AuthTable>,
    pub storage: Arc<StorageTable>,
    pub sessions: Arc<SessionRegistry>,
    pub root_dir_fd: RawFd,
}

/// What a `serve()` call wants done with the socket afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeOutcome {
    /// Leave the fd in the worker's poll-set for future requests.
    KeepOpen,
    /// The worker will close the fd. `serve()` must not have closed it
    /// already — ownership of the fd on `Close` belongs to the worker
    /// alone, never both, so a reused descriptor is never double-closed.
    Close,
}

/// The protocol-layer contract this core invokes per readable socket. The
/// wire protocol behind any particular implementation (read/write/list/
/// delete, filesystem access) is out of scope for this crate
/// (`SPEC_FULL.md` §1) — callers provide their own.
///
/// `client_sockfd` ownership: `serve()` borrows the fd for the duration of
/// the call and must never close it itself. Returning
/// [`ServeOutcome::Close`] hands close ownership to the worker, which will
/// close it exactly once after `serve()` returns; returning
/// [`ServeOutcome::KeepOpen`] leaves it in the worker's poll-set.
pub trait Serve: Send + Sync {
    fn serve(&self, ctx: &mut ClientContext) -> CoreResult<ServeOutcome>;
}

impl<F> Serve for F
where
    F: Fn(&mut ClientContext) -> CoreResult<ServeOutcome> + Send + Sync,
{
    fn serve(&self, ctx: &mut ClientContext) -> CoreResult<ServeOutcome> {
        self(ctx)
    }
}
