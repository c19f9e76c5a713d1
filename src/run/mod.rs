//! Per-execution run state.
//!
//! A run is one execution of a client process. Its state (run id, error flag,
//! and the credentials of the session group it holds) is persisted through a
//! [`RunStateStore`] owned by that execution context, so repeated invocations
//! within the same execution see the same group.

mod handle;
mod store;
mod transitions;
mod types;

pub use handle::{Credentials, Run};
pub use store::{FileRunStateStore, MemoryRunStateStore, RunStateStore};
pub use types::{RunPhase, RunState, SystemSession};
