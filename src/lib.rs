//! vaultd — a multi-threaded, poll-driven TCP connection-dispatch core.
//!
//! Accepts connections on one thread, hands each accepted socket off to a
//! fixed pool of worker threads through a bounded concurrent queue, and
//! dispatches readable sockets to a caller-supplied [`net::Serve`]
//! implementation. Session, auth, and storage tables are provided as
//! building blocks for whatever wire protocol `Serve` implements; this crate
//! does not define one itself.

/// Crate-wide error type and result alias.
pub mod error;

/// Default hash function used by the hash tables below.
pub mod crypt;

/// Bounded FIFO queues: the single-threaded base queue (C1) and the
/// mutex-guarded concurrent queue built on it (C2).
pub mod queue;

/// Generic chained hash table backing the auth and storage tables.
pub mod hashtable;

/// Session registry (C3): mints, looks up, and retires session records.
pub mod session;

/// Auth table (C4): username -> (password hash, permissions), persistable.
pub mod auth;

/// Storage table (C5): opaque key/value store for client data.
pub mod storage;

/// Worker runner (C6): one long-lived task per worker thread.
pub mod pool;

/// Acceptor and worker poll loops, and the `Serve` contract between them.
pub mod net;

/// Lifecycle orchestrator (C9): startup/shutdown sequencing and signals.
pub mod orchestrator;

/// CLI surface (C10): `argv` parsing.
pub mod config;
