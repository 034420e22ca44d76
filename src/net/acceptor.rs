//! Acceptor loop (C7) — replaces the `main_loop`/server-socket half of
//! `threadpoll.c`: polls the listening socket, accepts connections, and
//! publishes each new fd into the handoff queue for the workers to pick up.

use std::net::TcpListener;
use std::os::unix::io::{AsRawFd, IntoRawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::CoreResult;
use crate::net::poll::{poll_one, Readiness, OS_TIMESLICE};
use crate::net::HandoffElement;
use crate::queue::ConcurrentQueue;

/// Runs the acceptor loop on the calling thread until `server_shutdown`
/// observes `true`. Fatal poll errors propagate to the caller (exit code 2,
/// per `SPEC_FULL.md` §6); accept failures and queue-full are logged and the
/// loop continues.
pub fn run(
    listener: &TcpListener,
    handoff: &ConcurrentQueue<HandoffElement>,
    server_shutdown: &AtomicBool,
) -> CoreResult<()> {
    loop {
        if server_shutdown.load(Ordering::SeqCst) {
            tracing::info!("[acceptor] shutdown observed, exiting");
            return Ok(());
        }

        match poll_one(listener.as_raw_fd(), OS_TIMESLICE)? {
            Readiness::None => continue,
            Readiness::Error | Readiness::HangUp => {
                tracing::error!("[acceptor] listening socket reported error/hangup");
                return Ok(());
            }
            Readiness::Readable => match listener.accept() {
                Ok((stream, peer)) => {
                    let fd = stream.into_raw_fd();
                    match handoff.push(HandoffElement { client_sockfd: fd }) {
                        Ok(()) => {
                            tracing::debug!(fd, peer = %peer, "[acceptor] accepted");
                        }
                        Err(e) => {
                            tracing::warn!(fd, error = %e, "[acceptor] handoff queue full, dropping connection");
                            unsafe {
                                libc::close(fd);
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "[acceptor] accept failed");
                }
            },
        }
    }
}

/// Convenience wrapper spawning [`run`] so the orchestrator can choose
/// whether the acceptor owns the calling thread (the usual case,
/// `SPEC_FULL.md` §4.9) or run elsewhere (as tests do).
pub fn spawn(
    listener: TcpListener,
    handoff: Arc<ConcurrentQueue<HandoffElement>>,
    server_shutdown: Arc<AtomicBool>,
) -> std::thread::JoinHandle<CoreResult<()>> {
    std::thread::Builder::new()
        .name("vaultd-acceptor".into())
        .spawn(move || run(&listener, &handoff, &server_shutdown))
        .expect("failed to spawn acceptor thread")
}
