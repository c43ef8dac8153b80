use crate::Command;
use crate::error::DialogueError;
use crate::history::TurnHistory;
use crate::service::NextTurn;
use crate::transcription::{TranscriptEvent, TranscriptionAdapter, join_text};
use rehearsal_types::{InterviewRequest, SectionRecord, Turn};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

// Shared by every controller in the process, so a reply that outlives its
// session can never match a later one.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing asked yet (or the first request failed).
    Idle,
    /// First request in flight.
    WaitingForQuestion,
    /// The last turn has a question. Its answer may already be recorded if the
    /// follow-up request failed; `retry` re-sends it.
    AwaitingAnswer,
    /// Follow-up request in flight.
    Submitting,
    Closed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::WaitingForQuestion => "waiting for the first question",
            Phase::AwaitingAnswer => "awaiting an answer",
            Phase::Submitting => "submitting an answer",
            Phase::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Tags an outgoing request with the session generation and a per-session
/// sequence number. Replies are only accepted for the ticket currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTicket {
    generation: u64,
    sequence: u64,
}

impl RequestTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

#[derive(Debug, Clone)]
pub struct OutgoingRequest {
    pub ticket: RequestTicket,
    pub request: InterviewRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    First,
    FollowUp,
}

/// Everything a presentation layer needs to render the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub phase: Phase,
    pub turns: Vec<Turn>,
    pub pending_capture_text: String,
    pub capturing: bool,
    pub capture_available: bool,
    pub last_error: Option<DialogueError>,
    /// A failed request can be re-sent with `retry`.
    pub can_retry: bool,
    /// Incremented once per accepted transition.
    pub revision: u64,
}

/// Drives one interview session.
///
/// The controller is sans-I/O: commands that need the interview service return a
/// `Command` for the runtime to execute, and the runtime reports back through
/// `handle_reply`. Speech events come in through `handle_transcript`. Each
/// accepted transition publishes exactly one `Snapshot`.
pub struct DialogueController {
    section: SectionRecord,
    history: TurnHistory,
    phase: Phase,
    generation: u64,
    sequence: u64,
    in_flight: Option<(RequestTicket, RequestKind)>,
    failed: Option<RequestKind>,
    // Speech captured in earlier start/stop spans of the current turn.
    captured: String,
    transcription: TranscriptionAdapter,
    last_error: Option<DialogueError>,
    revision: u64,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl DialogueController {
    pub fn new(section: SectionRecord, transcription: TranscriptionAdapter) -> Self {
        let initial = Snapshot {
            phase: Phase::Idle,
            turns: Vec::new(),
            pending_capture_text: String::new(),
            capturing: false,
            capture_available: transcription.is_available(),
            last_error: None,
            can_retry: false,
            revision: 0,
        };
        let (snapshot_tx, _) = watch::channel(initial);
        Self {
            section,
            history: TurnHistory::new(),
            phase: Phase::Idle,
            generation: next_generation(),
            sequence: 0,
            in_flight: None,
            failed: None,
            captured: String::new(),
            transcription,
            last_error: None,
            revision: 0,
            snapshot_tx,
        }
    }

    pub fn section(&self) -> &SectionRecord {
        &self.section
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn history(&self) -> &TurnHistory {
        &self.history
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Receives a new snapshot after every accepted transition.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Text the user has dictated for the current question so far.
    pub fn pending_capture_text(&self) -> String {
        if self.transcription.is_capturing() {
            join_text(&self.captured, &self.transcription.text())
        } else {
            self.captured.clone()
        }
    }

    /// Requests the first question.
    pub fn start(&mut self) -> Result<Command, DialogueError> {
        if self.phase != Phase::Idle {
            return Err(self.reject(format!("cannot start while {}", self.phase)));
        }
        Ok(self.issue(RequestKind::First))
    }

    /// Records the answer to the current question and requests the follow-up.
    ///
    /// Captured speech comes first, followed by `typed`. If capture is running it
    /// is stopped and its text merged before anything is recorded.
    pub fn submit_answer(&mut self, typed: &str) -> Result<Command, DialogueError> {
        match self.phase {
            Phase::AwaitingAnswer => {}
            Phase::Submitting => {
                return Err(self.reject("an answer is already being submitted"));
            }
            other => {
                return Err(self.reject(format!("cannot submit an answer while {other}")));
            }
        }
        if !self.history.awaiting_answer() {
            return Err(self.reject(
                "the current question has already been answered; retry the request instead",
            ));
        }

        let merged = join_text(&self.pending_capture_text(), typed);
        if merged.trim().is_empty() {
            return Err(self.reject("an answer cannot be empty"));
        }

        self.transcription.stop();
        self.captured.clear();
        if let Err(e) = self.history.record_answer(&merged) {
            return Err(self.reject_with(e));
        }
        Ok(self.issue(RequestKind::FollowUp))
    }

    /// Re-sends the request that last failed.
    pub fn retry(&mut self) -> Result<Command, DialogueError> {
        let Some(kind) = self.failed else {
            return Err(self.reject("there is no failed request to retry"));
        };
        match (kind, self.phase) {
            (RequestKind::First, Phase::Idle) | (RequestKind::FollowUp, Phase::AwaitingAnswer) => {
                Ok(self.issue(kind))
            }
            _ => Err(self.reject(format!("cannot retry while {}", self.phase))),
        }
    }

    /// Starts or stops speech capture. Returns whether capture is now running.
    pub fn toggle_capture(&mut self) -> Result<bool, DialogueError> {
        if self.transcription.is_capturing() {
            let text = self.transcription.stop();
            self.captured = join_text(&self.captured, &text);
            self.publish();
            return Ok(false);
        }

        if self.phase != Phase::AwaitingAnswer || !self.history.awaiting_answer() {
            return Err(self.reject(format!("cannot capture speech while {}", self.phase)));
        }
        match self.transcription.start() {
            Ok(()) => {
                self.last_error = None;
                self.publish();
                Ok(true)
            }
            Err(e) => {
                tracing::warn!("speech capture could not start: {}", e);
                self.last_error = Some(e.clone());
                self.publish();
                Err(e)
            }
        }
    }

    /// Closes the session from any phase. Returns a cancellation for the request
    /// in flight, if there is one.
    pub fn end(&mut self) -> Option<Command> {
        if self.phase == Phase::Closed {
            return None;
        }
        self.transcription.stop();
        self.captured.clear();
        self.history = TurnHistory::new();
        self.failed = None;
        self.last_error = None;
        self.phase = Phase::Closed;
        self.generation = next_generation();
        let cancel = self
            .in_flight
            .take()
            .map(|(ticket, _)| Command::CancelRequest(ticket));
        tracing::info!("interview session closed");
        self.publish();
        cancel
    }

    /// Reconciles a service reply. Returns `false` when the reply was stale and
    /// ignored.
    pub fn handle_reply(
        &mut self,
        ticket: RequestTicket,
        result: Result<NextTurn, DialogueError>,
    ) -> bool {
        let kind = match self.in_flight {
            Some((current, kind)) if current == ticket && ticket.generation == self.generation => {
                kind
            }
            _ => {
                tracing::debug!(
                    generation = ticket.generation,
                    sequence = ticket.sequence,
                    "ignoring stale interview reply"
                );
                return false;
            }
        };
        self.in_flight = None;

        match result.and_then(|next| self.accept(kind, next)) {
            Ok(()) => {
                self.phase = Phase::AwaitingAnswer;
                self.failed = None;
                self.last_error = None;
            }
            Err(e) => {
                tracing::warn!("interview request failed: {}", e);
                self.phase = match kind {
                    RequestKind::First => Phase::Idle,
                    RequestKind::FollowUp => Phase::AwaitingAnswer,
                };
                self.failed = Some(kind);
                self.last_error = Some(e);
            }
        }
        self.publish();
        true
    }

    /// Feeds a speech event into the pending answer.
    pub fn handle_transcript(&mut self, event: TranscriptEvent) -> bool {
        if self.phase == Phase::Closed {
            return false;
        }
        match self.transcription.apply(event) {
            Ok(true) => {
                self.publish();
                true
            }
            Ok(false) => false,
            Err(e) => {
                let text = self.transcription.stop();
                self.captured = join_text(&self.captured, &text);
                self.last_error = Some(e);
                self.publish();
                true
            }
        }
    }

    // Empty feedback counts as no feedback at all.
    fn accept(&mut self, kind: RequestKind, next: NextTurn) -> Result<(), DialogueError> {
        let feedback = next.feedback.filter(|f| !f.trim().is_empty());
        match (kind, feedback) {
            (RequestKind::First, None) => self.history.append(&next.next_question),
            (RequestKind::First, Some(_)) => Err(DialogueError::InvalidResponse(
                "the first question of a session cannot carry feedback".to_string(),
            )),
            (RequestKind::FollowUp, Some(feedback)) => {
                self.history.advance(feedback.trim(), &next.next_question)
            }
            (RequestKind::FollowUp, None) => Err(DialogueError::InvalidResponse(
                "a follow-up reply must carry feedback on the previous answer".to_string(),
            )),
        }
        .map_err(|e| match e {
            DialogueError::InvalidState(msg) => DialogueError::InvalidResponse(msg),
            other => other,
        })
    }

    fn issue(&mut self, kind: RequestKind) -> Command {
        self.sequence += 1;
        let ticket = RequestTicket {
            generation: self.generation,
            sequence: self.sequence,
        };
        self.in_flight = Some((ticket, kind));
        self.failed = None;
        self.last_error = None;
        self.phase = match kind {
            RequestKind::First => Phase::WaitingForQuestion,
            RequestKind::FollowUp => Phase::Submitting,
        };
        let request = InterviewRequest::new(self.section.clone(), self.history.turns().to_vec());
        tracing::debug!(
            sequence = ticket.sequence,
            turns = request.history.len(),
            "issuing interview request"
        );
        self.publish();
        Command::RequestNext(OutgoingRequest { ticket, request })
    }

    fn reject(&self, msg: impl Into<String>) -> DialogueError {
        self.reject_with(DialogueError::InvalidState(msg.into()))
    }

    fn reject_with(&self, err: DialogueError) -> DialogueError {
        tracing::debug!(phase = %self.phase, "command rejected: {}", err);
        err
    }

    fn publish(&mut self) {
        self.revision += 1;
        let snapshot = Snapshot {
            phase: self.phase,
            turns: self.history.turns().to_vec(),
            pending_capture_text: self.pending_capture_text(),
            capturing: self.transcription.is_capturing(),
            capture_available: self.transcription.is_available(),
            last_error: self.last_error.clone(),
            can_retry: self.failed.is_some(),
            revision: self.revision,
        };
        self.snapshot_tx.send_replace(snapshot);
    }
}
