//! Thin `libc::poll` wrapper shared by the acceptor (C7) and worker (C8)
//! loops — the one non-blocking-with-timeout primitive both multiplex on.

use std::os::unix::io::RawFd;
use std::time::Duration;

use crate::error::{CoreError, CoreResult};

/// The OS timeslice every poll call in this crate uses, matching the C
/// original's `MAIN_OS_TIMESLICE` (100ms).
pub const OS_TIMESLICE: Duration = Duration::from_millis(100);

/// What happened to a polled descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// No event mask bits were set (timed out or not in this revents).
    None,
    Readable,
    Error,
    HangUp,
}

fn classify(revents: libc::c_short) -> Readiness {
    if revents & libc::POLLERR != 0 {
        Readiness::Error
    } else if revents & (libc::POLLHUP | libc::POLLRDHUP) != 0 {
        Readiness::HangUp
    } else if revents & libc::POLLIN != 0 {
        Readiness::Readable
    } else {
        Readiness::None
    }
}

/// Polls a single fd (the listening socket, in the acceptor) with
/// [`OS_TIMESLICE`]. Returns `Readiness::None` on timeout.
pub fn poll_one(fd: RawFd, timeout: Duration) -> CoreResult<Readiness> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let ret = unsafe { libc::poll(&mut pfd, 1, timeout.as_millis() as libc::c_int) };
    if ret < 0 {
        return Err(CoreError::SystemIO(std::io::Error::last_os_error()));
    }
    if ret == 0 {
        return Ok(Readiness::None);
    }
    Ok(classify(pfd.revents))
}

/// Polls many fds (a worker's active poll-set) at once. Returns a parallel
/// vector of [`Readiness`] values, one per input fd, in input order.
pub fn poll_many(fds: &[RawFd], timeout: Duration) -> CoreResult<Vec<Readiness>> {
    if fds.is_empty() {
        std::thread::sleep(timeout);
        return Ok(Vec::new());
    }

    let mut pollfds: Vec<libc::pollfd> = fds
        .iter()
        .map(|&fd| libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        })
        .collect();

    let ret = unsafe {
        libc::poll(
            pollfds.as_mut_ptr(),
            pollfds.len() as libc::nfds_t,
            timeout.as_millis() as libc::c_int,
        )
    };
    if ret < 0 {
        return Err(CoreError::SystemIO(std::io::Error::last_os_error()));
    }
    Ok(pollfds.iter().map(|p| classify(p.revents)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{TcpListener, TcpStream};
    use std::os::unix::io::AsRawFd;

    #[test]
    fn timeout_on_idle_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let ready = poll_one(listener.as_raw_fd(), Duration::from_millis(20)).unwrap();
        assert_eq!(ready, Readiness::None);
    }

    #[test]
    fn readable_once_a_peer_connects() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let _client = TcpStream::connect(addr).unwrap();
        let ready = poll_one(listener.as_raw_fd(), OS_TIMESLICE).unwrap();
        assert_eq!(ready, Readiness::Readable);
    }

    #[test]
    fn poll_many_reports_per_fd_readiness() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        listener.set_nonblocking(true).unwrap();
        let idle = TcpListener::bind("127.0.0.1:0").unwrap();
        idle.set_nonblocking(true).unwrap();

        let _client = TcpStream::connect(addr).unwrap();
        let results = poll_many(
            &[listener.as_raw_fd(), idle.as_raw_fd()],
            Duration::from_millis(50),
        )
        .unwrap();
        assert_eq!(results[0], Readiness::Readable);
        assert_eq!(results[1], Readiness::None);
    }

    #[test]
    fn poll_many_with_no_fds_waits_and_returns_empty() {
        let results = poll_many(&[], Duration::from_millis(10)).unwrap();
        assert!(results.is_empty());
    }
}
