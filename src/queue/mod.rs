//! FIFO queue primitives (C1/C2): a single-threaded bounded queue and its
//! mutex-guarded concurrent sibling, replacing `aqueues.c`.

pub mod bounded;
pub mod concurrent;

pub use bounded::{BoundedQueue, MAX_QUEUE_NODES};
pub use concurrent::ConcurrentQueue;
