//! Lifecycle orchestrator (C9): builds every component in order, wires
//! signal-driven shutdown, runs the acceptor loop on the calling thread, and
//! tears everything back down. This is the one place that knows the full
//! startup/shutdown sequence; every other module only knows its own piece.

use std::os::unix::io::RawFd;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::auth::AuthTable;
use crate::config::ParsedArgs;
use crate::crypt::hash64;
use crate::error::{CoreError, CoreResult};
use crate::net::{acceptor, listener, worker, HandoffElement, Serve};
use crate::pool::WorkerRunner;
use crate::queue::{ConcurrentQueue, MAX_QUEUE_NODES};
use crate::session::SessionRegistry;
use crate::storage::StorageTable;

/// Size of the bounded handoff queue between the acceptor and the workers.
/// Bounded at [`MAX_QUEUE_NODES`], the same cap C1/C2 enforce everywhere
/// else (`SPEC_FULL.md` §4.2, testable invariant 2) — there is no separate,
/// larger bound for this particular queue instance.
const HANDOFF_CAPACITY: usize = MAX_QUEUE_NODES;

const AUTH_FILE_NAME: &str = "auth_users";

/// Set by the process-wide signal handler; signal handlers cannot capture
/// closures, so this is the one piece of truly global state in the crate
/// (`SPEC_FULL.md` §9, "Global mutable state").
static SERVER_SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn on_shutdown_signal(_signum: libc::c_int) {
    SERVER_SHUTDOWN.store(true, Ordering::SeqCst);
}

/// Installs `SIGINT`/`SIGTERM` handlers that flip [`SERVER_SHUTDOWN`] and
/// ignores `SIGPIPE` (a write to a closed client socket must surface as an
/// `EPIPE` error, not kill the process), per `SPEC_FULL.md` §6.
fn install_signal_handlers() -> CoreResult<()> {
    unsafe {
        if libc::signal(libc::SIGINT, on_shutdown_signal as libc::sighandler_t) == libc::SIG_ERR {
            return Err(CoreError::SystemIO(std::io::Error::last_os_error()));
        }
        if libc::signal(libc::SIGTERM, on_shutdown_signal as libc::sighandler_t) == libc::SIG_ERR {
            return Err(CoreError::SystemIO(std::io::Error::last_os_error()));
        }
        if libc::signal(libc::SIGPIPE, libc::SIG_IGN) == libc::SIG_ERR {
            return Err(CoreError::SystemIO(std::io::Error::last_os_error()));
        }
    }
    Ok(())
}

fn open_root_dir(path: &Path) -> CoreResult<RawFd> {
    let c_path = std::ffi::CString::new(path.as_os_str().as_encoded_bytes())
        .map_err(|_| CoreError::BadInput("root directory path contains a NUL byte".into()))?;
    let fd = unsafe { libc::open(c_path.as_ptr(), libc::O_DIRECTORY | libc::O_RDONLY) };
    if fd < 0 {
        return Err(CoreError::SystemIO(std::io::Error::last_os_error()));
    }
    Ok(fd)
}

/// Runs the server to completion: builds every component in the order fixed
/// by `SPEC_FULL.md` §4.9, serves connections until a shutdown signal
/// arrives, then tears everything down in reverse. Returns once shutdown is
/// complete; the caller (the `[[bin]]`) maps the result to an exit code.
pub fn run(args: ParsedArgs, serve: Arc<dyn Serve>) -> CoreResult<()> {
    install_signal_handlers()?;
    SERVER_SHUTDOWN.store(false, Ordering::SeqCst);

    std::fs::create_dir_all(&args.root_dir)?;

    let auth = Arc::new(AuthTable::new(Box::new(hash64)));
    let storage = Arc::new(StorageTable::new(Box::new(hash64)));
    let sessions = Arc::new(SessionRegistry::new());
    let pool = WorkerRunner::create(args.workers);
    let handoff = Arc::new(ConcurrentQueue::<HandoffElement>::create(HANDOFF_CAPACITY));

    pool.init()?;

    let root_dir_fd = open_root_dir(&args.root_dir)?;

    let auth_path = args.root_dir.join(AUTH_FILE_NAME);
    if auth_path.exists() {
        auth.load(&auth_path)?;
    }

    let running = Arc::new(AtomicBool::new(true));
    for _ in 0..args.workers {
        let handoff = handoff.clone();
        let auth = auth.clone();
        let storage = storage.clone();
        let sessions = sessions.clone();
        let running = running.clone();
        let serve = serve.clone();
        pool.submit(move || {
            if let Err(e) = worker::run(
                handoff,
                auth,
                storage,
                sessions,
                root_dir_fd,
                running,
                serve,
            ) {
                tracing::error!(error = %e, "[orchestrator] worker exited with error");
            }
        })?;
    }

    let tcp_listener = listener::bind_tcp(args.port)?;
    tracing::info!(port = args.port, workers = args.workers, "[orchestrator] listening");

    let acceptor_result = acceptor::run(&tcp_listener, &handoff, &SERVER_SHUTDOWN);

    tracing::info!("[orchestrator] shutting down");
    running.store(false, Ordering::SeqCst);

    if let Err(e) = pool.shutdown() {
        tracing::error!(error = %e, "[orchestrator] pool shutdown failed");
    }
    if let Err(e) = auth.dump(&auth_path, true) {
        tracing::error!(error = %e, "[orchestrator] auth dump failed");
    }
    storage.clear();
    sessions.destroy();
    handoff.destroy();
    unsafe {
        libc::close(root_dir_fd);
    }

    acceptor_result
}

/// Returns `true` once a shutdown signal has been observed. Exposed for
/// tests that drive shutdown without sending a real signal to the process.
pub fn shutdown_requested() -> bool {
    SERVER_SHUTDOWN.load(Ordering::SeqCst)
}
