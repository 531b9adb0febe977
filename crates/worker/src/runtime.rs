//! Event dispatch and the worker lifecycle state machine.
//!
//! The runtime is the only stateful piece: it tracks the instance's
//! [`WorkerState`], routes host events to the lifecycle manager and the
//! fetch interceptor, and emits host signals. A host keeps the worker
//! alive for the duration of an event by awaiting [`WorkerRuntime::handle`];
//! the returned future does not resolve until the event's side effects
//! have settled.

use rmnnt_core::cache::CacheStore;
use rmnnt_core::{Error, Network, Request};
use tokio::sync::mpsc;

use crate::interceptor::{FetchInterceptor, FetchOutcome};
use crate::lifecycle::{CacheLifecycleManager, InstallReport, SweepOutcome};
use crate::state::WorkerState;

/// Host events the worker subscribes to.
#[derive(Debug)]
pub enum WorkerEvent {
    Install,
    Activate,
    Fetch(Request),
}

/// Out-of-band signals from the worker to its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
    /// Skip the activation-waiting period: new code takes effect without
    /// waiting for old clients to go away. Freshness over mid-session
    /// consistency; acceptable for a self-contained offline client.
    SkipWaiting,
}

/// What one event resolved to.
#[derive(Debug)]
pub enum EventOutcome {
    Installed(InstallReport),
    /// Install failed; the instance is redundant and the host retries by
    /// re-registering on the next load. No retry happens here.
    InstallFailed(Error),
    Activated(Vec<SweepOutcome>),
    ActivateFailed(Error),
    Fetch(FetchOutcome),
    /// The event arrived in a state that does not accept it.
    Ignored { event: &'static str, state: WorkerState },
}

/// Dispatches host events to the policy components.
pub struct WorkerRuntime<S, N> {
    lifecycle: CacheLifecycleManager<S, N>,
    interceptor: FetchInterceptor<S, N>,
    state: WorkerState,
    signals: mpsc::UnboundedSender<HostSignal>,
}

impl<S: CacheStore + 'static, N: Network + 'static> WorkerRuntime<S, N> {
    /// Build a runtime in the Parsed state. The receiver carries host
    /// signals; the stdio binding forwards them to its output stream.
    pub fn new(
        lifecycle: CacheLifecycleManager<S, N>, interceptor: FetchInterceptor<S, N>,
    ) -> (Self, mpsc::UnboundedReceiver<HostSignal>) {
        let (signals, receiver) = mpsc::unbounded_channel();
        (Self { lifecycle, interceptor, state: WorkerState::Parsed, signals }, receiver)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Dispatch one event. Awaiting the returned future is the host's
    /// pending-work registration: install and activate side effects are
    /// complete when it resolves.
    pub async fn handle(&mut self, event: WorkerEvent) -> EventOutcome {
        match event {
            WorkerEvent::Install => self.handle_install().await,
            WorkerEvent::Activate => self.handle_activate().await,
            WorkerEvent::Fetch(request) => self.handle_fetch(&request).await,
        }
    }

    async fn handle_install(&mut self) -> EventOutcome {
        if self.state != WorkerState::Parsed {
            tracing::warn!(state = %self.state, "install event ignored");
            return EventOutcome::Ignored { event: "install", state: self.state };
        }

        self.state = WorkerState::Installing;
        let _ = self.signals.send(HostSignal::SkipWaiting);

        match self.lifecycle.on_install().await {
            Ok(report) => {
                self.state = WorkerState::Installed;
                EventOutcome::Installed(report)
            }
            Err(e) => {
                tracing::error!(error = %e, "install failed, worker is redundant");
                self.state = WorkerState::Redundant;
                EventOutcome::InstallFailed(e)
            }
        }
    }

    async fn handle_activate(&mut self) -> EventOutcome {
        if self.state != WorkerState::Installed {
            tracing::warn!(state = %self.state, "activate event ignored");
            return EventOutcome::Ignored { event: "activate", state: self.state };
        }

        self.state = WorkerState::Activating;

        match self.lifecycle.on_activate().await {
            Ok(outcomes) => {
                self.state = WorkerState::Activated;
                EventOutcome::Activated(outcomes)
            }
            Err(e) => {
                tracing::error!(error = %e, "activation failed, worker is redundant");
                self.state = WorkerState::Redundant;
                EventOutcome::ActivateFailed(e)
            }
        }
    }

    async fn handle_fetch(&self, request: &Request) -> EventOutcome {
        if !self.state.can_intercept_fetch() {
            return EventOutcome::Fetch(FetchOutcome::Bypass);
        }

        match self.interceptor.on_fetch(request).await {
            Ok(outcome) => EventOutcome::Fetch(outcome),
            Err(e) => {
                // A storage fault mid-fallback; the page sees what it
                // would on a plain cache miss.
                tracing::warn!(url = %request.url, error = %e, "fetch fallback failed");
                EventOutcome::Fetch(FetchOutcome::Unreachable)
            }
        }
    }
}
