//! Wire types shared between the rehearsal front end and the interview service.
pub mod interview;
pub mod review;
pub mod section;
pub mod turn;

//re-export types for easier access
pub use interview::{ErrorBody, InterviewReplyBody, InterviewRequest};
pub use review::{HealthBody, QuickReviewBody};
pub use section::{CvSections, SectionRecord};
pub use turn::Turn;
