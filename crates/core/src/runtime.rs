use crate::Command;
use crate::controller::RequestTicket;
use crate::error::DialogueError;
use crate::service::{InterviewService, NextTurn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// Outcome of one interview request, to be handed to
/// `DialogueController::handle_reply`.
#[derive(Debug)]
pub struct Reply {
    pub ticket: RequestTicket,
    pub result: Result<NextTurn, DialogueError>,
}

/// Executes the controller's `Command`s against an `InterviewService`.
///
/// Each request runs on its own task and reports back on the reply channel.
/// At most one request is tracked; a newer one supersedes it.
pub struct RequestDispatcher {
    service: Arc<dyn InterviewService>,
    reply_tx: mpsc::UnboundedSender<Reply>,
    in_flight: Option<(RequestTicket, AbortHandle)>,
    timeout: Option<Duration>,
}

impl RequestDispatcher {
    pub fn new(service: Arc<dyn InterviewService>, reply_tx: mpsc::UnboundedSender<Reply>) -> Self {
        Self {
            service,
            reply_tx,
            in_flight: None,
            timeout: None,
        }
    }

    /// Per-request timeout passed to the service. Without one the service's own
    /// default applies.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// A dispatcher together with the receiving end of its reply channel.
    pub fn channel(service: Arc<dyn InterviewService>) -> (Self, mpsc::UnboundedReceiver<Reply>) {
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        (Self::new(service, reply_tx), reply_rx)
    }

    pub fn dispatch(&mut self, command: Command) {
        match command {
            Command::RequestNext(outgoing) => {
                let ticket = outgoing.ticket;
                let service = self.service.clone();
                let reply_tx = self.reply_tx.clone();
                let timeout = self.timeout;
                let handle = tokio::spawn(async move {
                    let request = outgoing.request;
                    let result = service
                        .request_next(&request.section, &request.history, timeout)
                        .await;
                    if reply_tx.send(Reply { ticket, result }).is_err() {
                        tracing::debug!("reply receiver dropped; discarding interview reply");
                    }
                });
                if let Some((previous, handle)) =
                    self.in_flight.replace((ticket, handle.abort_handle()))
                {
                    tracing::debug!(sequence = previous.sequence(), "superseding earlier request");
                    handle.abort();
                }
            }
            Command::CancelRequest(ticket) => match self.in_flight.take() {
                Some((current, handle)) if current == ticket => {
                    tracing::debug!(sequence = ticket.sequence(), "cancelling interview request");
                    handle.abort();
                }
                other => self.in_flight = other,
            },
        }
    }

    /// Whether the most recent request is still running.
    pub fn is_busy(&self) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|(_, handle)| !handle.is_finished())
    }
}
