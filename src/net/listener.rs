//! Listening-socket construction. Built directly on `libc` (socket/setsockopt
//! /bind/listen) rather than `TcpListener::bind`, so `SO_REUSEADDR` can be
//! set before `bind`, then handed back as a safe `std::net::TcpListener` for
//! the rest of the crate to call `accept`/`as_raw_fd` on.

use std::net::TcpListener;
use std::os::unix::io::FromRawFd;

use crate::error::{CoreError, CoreResult};

/// Binds a `SO_REUSEADDR` IPv4 TCP listener on `port` across all interfaces,
/// with a backlog of 128 (`SPEC_FULL.md` §6).
pub fn bind_tcp(port: u16) -> CoreResult<TcpListener> {
    unsafe {
        let fd = libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0);
        if fd < 0 {
            return Err(CoreError::SystemIO(std::io::Error::last_os_error()));
        }

        let optval: libc::c_int = 1;
        let rc = libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            &optval as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        );
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            libc::close(fd);
            return Err(CoreError::SystemIO(err));
        }

        let addr = libc::sockaddr_in {
            sin_family: libc::AF_INET as libc::sa_family_t,
            sin_port: port.to_be(),
            sin_addr: libc::in_addr { s_addr: 0 }, // INADDR_ANY
            sin_zero: [0; 8],
        };
        let rc = libc::bind(
            fd,
            &addr as *const _ as *const libc::sockaddr,
            std::mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        );
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            libc::close(fd);
            return Err(CoreError::SystemIO(err));
        }

        let rc = libc::listen(fd, 128);
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            libc::close(fd);
            return Err(CoreError::SystemIO(err));
        }

        Ok(TcpListener::from_raw_fd(fd))
    }
}
