//! Lifecycle event binding.
//!
//! The host framework owns the lifecycle of the application; this module only subscribes to it.
//! The subscription is modeled as a plain channel of [`LifecycleEvent`]s so the host framework
//! never appears as a concrete type here: the host side pushes events, and the [`PatchRunner`]
//! drives the patcher in response. Events are handled strictly one at a time, each run to
//! completion before the next is taken, with no internal concurrency and no retry.

use std::collections::HashSet;

use anyhow::Result;
use futures::stream::StreamExt;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::{BroadcastStream, ReceiverStream};

use crate::patcher::{StatefulSetApi, StatefulSetPatcher};

/// A lifecycle event emitted by the host framework.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LifecycleEvent {
    /// The application is being installed.
    Install,
    /// The host is running its periodic status update.
    UpdateStatus,
    /// The application is being removed.
    Remove,
    /// A host-defined event, e.g. `config-changed`.
    Custom(String),
}

/// A task which binds lifecycle events to the patcher.
///
/// `Install`, `UpdateStatus` and any custom event name registered as a refresh event trigger
/// [`StatefulSetPatcher::reconcile`]; `Remove` triggers [`StatefulSetPatcher::teardown`].
/// Handler errors are logged and surfaced to the host by the patcher's own logging; the runner
/// itself keeps processing subsequent events, as retry policy belongs to the host framework.
pub struct PatchRunner<A> {
    /// The patcher being driven.
    patcher: StatefulSetPatcher<A>,
    /// Custom event names which re-apply the patch when observed.
    refresh_events: HashSet<String>,
    /// The host framework's event subscription.
    events_rx: ReceiverStream<LifecycleEvent>,
    /// A channel used for triggering graceful shutdown.
    ///
    /// The sender half is held here so the channel stays open for the runner's lifetime even
    /// when the caller drops its own copy.
    shutdown_tx: broadcast::Sender<()>,
    /// A channel used for triggering graceful shutdown.
    shutdown_rx: BroadcastStream<()>,
}

impl<A: StatefulSetApi + 'static> PatchRunner<A> {
    /// Create a new instance.
    ///
    /// `refresh_events` holds the names of any caller-supplied custom events which should
    /// re-apply the patch; `install` and `update-status` are observed regardless.
    pub fn new(
        patcher: StatefulSetPatcher<A>, refresh_events: Vec<String>, events_rx: mpsc::Receiver<LifecycleEvent>,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        Self {
            patcher,
            refresh_events: refresh_events.into_iter().collect(),
            events_rx: ReceiverStream::new(events_rx),
            shutdown_rx: BroadcastStream::new(shutdown_tx.subscribe()),
            shutdown_tx,
        }
    }

    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) -> Result<()> {
        tracing::debug!("statefulset patch runner initialized");
        loop {
            tokio::select! {
                event_opt = self.events_rx.next() => match event_opt {
                    Some(event) => self.handle_event(event).await,
                    None => {
                        // The host dropped its end of the subscription; propagate shutdown to
                        // any sibling tasks sharing the channel.
                        let _ = self.shutdown_tx.send(());
                        break;
                    }
                },
                _ = self.shutdown_rx.next() => break,
            }
        }
        tracing::debug!("statefulset patch runner shutdown");
        Ok(())
    }

    /// Handle a lifecycle event, running its bound operation to completion.
    #[tracing::instrument(level = "debug", skip(self))]
    async fn handle_event(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Install | LifecycleEvent::UpdateStatus => {
                if let Err(err) = self.patcher.reconcile().await {
                    tracing::error!(error = %err, "error reconciling StatefulSet resources");
                }
            }
            LifecycleEvent::Remove => {
                if let Err(err) = self.patcher.teardown().await {
                    tracing::error!(error = %err, "error tearing down StatefulSet");
                }
            }
            LifecycleEvent::Custom(name) if self.refresh_events.contains(&name) => {
                if let Err(err) = self.patcher.reconcile().await {
                    tracing::error!(error = %err, event = %name, "error reconciling StatefulSet resources");
                }
            }
            LifecycleEvent::Custom(name) => {
                tracing::debug!(event = %name, "ignoring unregistered lifecycle event");
            }
        }
    }
}
