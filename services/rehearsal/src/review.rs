use rehearsal_core::service::HttpInterviewClient;
use rehearsal_core::{DialogueError, SectionRecord};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

pub type ReviewResult = Result<Vec<String>, DialogueError>;

/// Fetches quick review points on a separate task. The result arrives on `tx`,
/// so the session loop keeps handling replies, dictation and Ctrl-C meanwhile.
pub fn spawn_review(
    client: Arc<HttpInterviewClient>,
    section: SectionRecord,
    tx: mpsc::UnboundedSender<ReviewResult>,
) -> AbortHandle {
    tokio::spawn(async move {
        let result = client.quick_review(&section).await;
        if tx.send(result).is_err() {
            tracing::debug!("session ended before the quick review arrived");
        }
    })
    .abort_handle()
}
