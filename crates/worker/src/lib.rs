//! The offline worker: lifecycle policy, fetch interception, and the
//! runtime that wires both to a host.
//!
//! Policy logic is host-agnostic: the lifecycle manager and the fetch
//! interceptor are plain async components over the storage and network
//! capabilities, driven by [`runtime::WorkerRuntime`]. The stdio binding
//! in [`stdio`] is one host; tests drive the runtime directly.

pub mod interceptor;
pub mod lifecycle;
pub mod runtime;
pub mod state;
pub mod stdio;

pub use interceptor::{FetchInterceptor, FetchOutcome, ResponseSource};
pub use lifecycle::{CacheLifecycleManager, InstallReport, SweepOutcome};
pub use runtime::{EventOutcome, HostSignal, WorkerEvent, WorkerRuntime};
pub use state::WorkerState;
