pub mod controller;
pub mod error;
pub mod history;
pub mod runtime;
pub mod service;
pub mod transcription;

pub use controller::{DialogueController, OutgoingRequest, Phase, RequestTicket, Snapshot};
pub use error::DialogueError;
pub use history::TurnHistory;
pub use rehearsal_types::{SectionRecord, Turn};

/// Represents side effects that the `DialogueController` asks the runtime to perform.
///
/// The controller never performs I/O itself. Every accepted command that needs the
/// interview service returns one of these, and the runtime feeds the outcome back
/// through `DialogueController::handle_reply`.
#[derive(Debug, Clone)]
pub enum Command {
    /// Send the request to the interview service.
    RequestNext(OutgoingRequest),
    /// The request with this ticket is no longer wanted. Best effort only; a reply
    /// that still arrives is discarded by the controller.
    CancelRequest(RequestTicket),
}
