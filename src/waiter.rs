use crate::aws::{AwsCloudFormationClient, StackEvent};
use crate::error::Error;
use crate::events::fetch_events;
use crate::writer::Writer;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use termcolor::WriteColor;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tracing::Instrument;

/// The long running operation being waited on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OperationKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct WaiterConfig {
    pub(crate) poll_interval: Duration,
    pub(crate) max_wait: Duration,
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_wait: Duration::from_secs(60 * 60),
        }
    }
}

/// Follows a stack operation to completion, printing its events as they
/// arrive.
pub(crate) struct Waiter<C, W> {
    client: Arc<C>,
    writer: Writer<W>,
    config: WaiterConfig,
}

impl<C, W> Waiter<C, W>
where
    C: AwsCloudFormationClient + 'static,
    W: WriteColor,
{
    pub(crate) fn new(config: WaiterConfig, client: Arc<C>, writer: W) -> Self {
        Self {
            client,
            writer: Writer::new(writer),
            config,
        }
    }

    #[cfg(test)]
    pub(crate) fn into_writer(self) -> W {
        self.writer.into_inner()
    }

    /// Wait for `kind` to finish on the stack, showing events from now on.
    pub(crate) async fn poll_until_complete(
        &mut self,
        stack_name: &str,
        kind: OperationKind,
    ) -> Result<(), Error> {
        self.poll_until_complete_since(stack_name, kind, Utc::now())
            .await
    }

    /// Wait for `kind` to finish on the stack, showing events newer than
    /// `since`.
    ///
    /// The server side wait runs on its own task and decides when this
    /// returns. Events are fetched once more after every poll before the
    /// completion signal is checked, so the final batch is not lost.
    #[tracing::instrument(skip(self))]
    pub(crate) async fn poll_until_complete_since(
        &mut self,
        stack_name: &str,
        kind: OperationKind,
        since: DateTime<Utc>,
    ) -> Result<(), Error> {
        let mut watermark = since;
        let (mut done, handle) = self.spawn_wait(stack_name, kind);

        let result = loop {
            match fetch_events(self.client.as_ref(), stack_name, Some(watermark)).await {
                Ok(events) => match self.print_events(kind, stack_name, &events) {
                    Ok(Some(latest)) => watermark = watermark.max(latest),
                    Ok(None) => {}
                    Err(e) => break Err(Error::Io(e)),
                },
                // the stack disappears once the delete has gone through
                Err(e) if kind == OperationKind::Delete && e.is_stack_missing() => {
                    tracing::debug!(err = %e, "ignoring missing stack during delete");
                }
                Err(e) => break Err(e),
            }

            match done.try_recv() {
                Ok(result) => {
                    tracing::debug!(ok = result.is_ok(), "wait finished");
                    break result;
                }
                Err(TryRecvError::Closed) => {
                    break Err(Error::Wait(
                        "wait task stopped without reporting a result".to_string(),
                    ))
                }
                Err(TryRecvError::Empty) => {}
            }

            tracing::trace!("sleeping");
            tokio::time::sleep(self.config.poll_interval).await;
        };

        handle.abort();
        result
    }

    fn spawn_wait(
        &self,
        stack_name: &str,
        kind: OperationKind,
    ) -> (
        oneshot::Receiver<Result<(), Error>>,
        tokio::task::JoinHandle<()>,
    ) {
        let (tx, rx) = oneshot::channel();
        let client = Arc::clone(&self.client);
        let stack_name = stack_name.to_string();
        let max_wait = self.config.max_wait;

        tracing::debug!("spawning wait task");
        let handle = tokio::spawn(
            async move {
                let result = client.wait_until_complete(stack_name, kind, max_wait).await;
                // receiver is gone if the poll loop already failed
                let _ = tx.send(result);
            }
            .instrument(tracing::debug_span!("waiting for stack")),
        );
        (rx, handle)
    }

    /// Print a batch of events, returning the newest timestamp seen.
    fn print_events(
        &mut self,
        kind: OperationKind,
        stack_name: &str,
        events: &[StackEvent],
    ) -> std::io::Result<Option<DateTime<Utc>>> {
        let mut latest = None;
        for event in events {
            self.writer.write_event(kind, stack_name, event)?;
            latest = latest.max(Some(event.timestamp));
        }
        Ok(latest)
    }
}
