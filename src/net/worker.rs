//! Worker poll loop (C8) — replaces the per-thread half of `threadpoll.c`'s
//! `poll_func`: drains the handoff queue into a private poll-set and
//! dispatches `serve()` on whatever becomes readable.

use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::auth::AuthTable;
use crate::error::CoreResult;
use crate::net::poll::{poll_many, Readiness, OS_TIMESLICE};
use crate::net::{ClientContext, HandoffElement, Serve, ServeOutcome};
use crate::queue::ConcurrentQueue;
use crate::session::SessionRegistry;
use crate::storage::StorageTable;

/// Size of a worker's private poll-set. Not specified by name in the
/// available original source (the header referencing `MAX_FDS` was not
/// among the retained files); chosen as a reasonable per-worker fan-out for
/// a pool sized in the tens of threads.
pub const MAX_FDS: usize = 64;

fn close_fd(fd: RawFd) {
    unsafe {
        libc::close(fd);
    }
}

/// Runs one worker's poll loop on the calling thread until `running`
/// observes `false`.
#[allow(clippy::too_many_arguments)]
pub fn run(
    handoff: Arc<ConcurrentQueue<HandoffElement>>,
    auth: Arc<AuthTable>,
    storage: Arc<StorageTable>,
    sessions: Arc<SessionRegistry>,
    root_dir_fd: RawFd,
    running: Arc<AtomicBool>,
    serve: Arc<dyn Serve>,
) -> CoreResult<()> {
    let mut slots: [Option<RawFd>; MAX_FDS] = [None; MAX_FDS];

    while running.load(Ordering::SeqCst) {
        // 1. Admission: one non-blocking pop per iteration into the first
        // free slot, per SPEC_FULL.md §4.8.
        if let Some(free_idx) = slots.iter().position(Option::is_none) {
            if handoff.count_hint() > 0 {
                if let Ok(Some(elem)) = handoff.pop() {
                    slots[free_idx] = Some(elem.client_sockfd);
                    tracing::debug!(fd = elem.client_sockfd, slot = free_idx, "[worker] admitted");
                }
            }
        }

        // 2. Readiness.
        let active: Vec<(usize, RawFd)> = slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|fd| (i, fd)))
            .collect();
        if active.is_empty() {
            std::thread::sleep(OS_TIMESLICE);
            continue;
        }
        let fds: Vec<RawFd> = active.iter().map(|(_, fd)| *fd).collect();
        let readiness = poll_many(&fds, OS_TIMESLICE)?;

        // 3. Dispatch.
        for ((slot_idx, fd), state) in active.into_iter().zip(readiness) {
            match state {
                Readiness::None => {}
                Readiness::Error => {
                    tracing::debug!(fd, "[worker] error, closing");
                    close_fd(fd);
                    slots[slot_idx] = None;
                }
                Readiness::HangUp => {
                    tracing::debug!(fd, "[worker] peer hangup, closing");
                    close_fd(fd);
                    slots[slot_idx] = None;
                }
                Readiness::Readable => {
                    let mut ctx = ClientContext {
                        client_sockfd: fd,
                        auth: auth.clone(),
                        storage: storage.clone(),
                        sessions: sessions.clone(),
                        root_dir_fd,
                    };
                    match serve.serve(&mut ctx) {
                        Ok(ServeOutcome::KeepOpen) => {}
                        Ok(ServeOutcome::Close) => {
                            close_fd(fd);
                            slots[slot_idx] = None;
                        }
                        Err(e) => {
                            tracing::warn!(fd, error = %e, "[worker] serve() failed, closing");
                            close_fd(fd);
                            slots[slot_idx] = None;
                        }
                    }
                }
            }
        }
    }

    // 4. Clean shutdown: close any remaining fds.
    for slot in slots.iter_mut() {
        if let Some(fd) = slot.take() {
            close_fd(fd);
        }
    }
    tracing::info!("[worker] shut down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypt::hash64;
    use crate::net::listener::bind_tcp;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::os::unix::io::IntoRawFd;
    use std::time::Duration;

    fn echo_ping_pong(ctx: &mut ClientContext) -> CoreResult<ServeOutcome> {
        use std::os::unix::io::FromRawFd;
        let mut stream = unsafe { TcpStream::from_raw_fd(ctx.client_sockfd) };
        let mut buf = [0u8; 64];
        let outcome = match stream.read(&mut buf) {
            Ok(0) => ServeOutcome::Close,
            Ok(n) if &buf[..n] == b"PING\n" => {
                let _ = stream.write_all(b"PONG\n");
                ServeOutcome::KeepOpen
            }
            Ok(_) => ServeOutcome::Close,
            Err(_) => ServeOutcome::Close,
        };
        // Don't let the fd be closed by TcpStream's Drop; the worker owns it.
        std::mem::forget(stream);
        Ok(outcome)
    }

    fn test_ctx_deps() -> (Arc<AuthTable>, Arc<StorageTable>, Arc<SessionRegistry>) {
        (
            Arc::new(AuthTable::new(Box::new(hash64))),
            Arc::new(StorageTable::new(Box::new(hash64))),
            Arc::new(SessionRegistry::new()),
        )
    }

    /// S1 (single-worker slice): a client pushed through the handoff queue
    /// gets its PING answered with PONG by the worker loop.
    #[test]
    fn worker_serves_admitted_socket() {
        let (auth, storage, sessions) = test_ctx_deps();
        let handoff = Arc::new(ConcurrentQueue::create(16));
        let running = Arc::new(AtomicBool::new(true));

        let listener = bind_tcp(0).unwrap();
        let addr = listener.local_addr().unwrap();

        let worker_handoff = handoff.clone();
        let worker_running = running.clone();
        let worker = std::thread::spawn(move || {
            run(
                worker_handoff,
                auth,
                storage,
                sessions,
                -1,
                worker_running,
                Arc::new(echo_ping_pong),
            )
        });

        let mut client = TcpStream::connect(addr).unwrap();
        let (accepted, _) = listener.accept().unwrap();
        let fd = accepted.into_raw_fd();
        handoff.push(HandoffElement { client_sockfd: fd }).unwrap();

        client.write_all(b"PING\n").unwrap();
        client
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let mut resp = [0u8; 5];
        client.read_exact(&mut resp).unwrap();
        assert_eq!(&resp, b"PONG\n");

        running.store(false, Ordering::SeqCst);
        worker.join().unwrap().unwrap();
    }

    #[test]
    fn worker_exits_cleanly_with_no_connections() {
        let (auth, storage, sessions) = test_ctx_deps();
        let handoff = Arc::new(ConcurrentQueue::create(4));
        let running = Arc::new(AtomicBool::new(true));
        let running_for_worker = running.clone();
        let worker = std::thread::spawn(move || {
            run(
                handoff,
                auth,
                storage,
                sessions,
                -1,
                running_for_worker,
                Arc::new(echo_ping_pong),
            )
        });
        std::thread::sleep(Duration::from_millis(20));
        running.store(false, Ordering::SeqCst);
        worker.join().unwrap().unwrap();
    }
}
