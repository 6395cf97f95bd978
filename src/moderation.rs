use crate::reaction::ModerationStatus;

pub const GENERIC_REJECTION: &str = "This video failed moderation.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    Playable,
    NoMedia,
    Notice { message: String, review: ReviewAction },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewAction {
    pub enabled: bool,
    pub pending: bool,
    pub submitting: bool,
}

impl ReviewAction {
    pub fn label(&self) -> &'static str {
        if self.pending {
            "Manual Review Pending"
        } else if self.submitting {
            "Submitting..."
        } else {
            "Request Review"
        }
    }
}

pub fn classify(status: ModerationStatus, details: Option<&str>, has_media: bool) -> Presentation {
    match status {
        ModerationStatus::Clear if has_media => Presentation::Playable,
        ModerationStatus::Clear => Presentation::NoMedia,
        ModerationStatus::Rejected | ModerationStatus::ManualReview => Presentation::Notice {
            message: notice_message(details),
            review: review_action(status, false),
        },
    }
}

pub fn review_action(status: ModerationStatus, submitting: bool) -> ReviewAction {
    let pending = status == ModerationStatus::ManualReview;
    ReviewAction {
        enabled: status == ModerationStatus::Rejected && !submitting,
        pending,
        submitting,
    }
}

pub fn notice_message(details: Option<&str>) -> String {
    match details.map(str::trim).filter(|details| !details.is_empty()) {
        Some(details) => format!("This video was rejected: {details}"),
        None => GENERIC_REJECTION.to_string(),
    }
}

// Only a rejected reaction moves to manual review.
pub fn confirm_review(status: &mut ModerationStatus) -> bool {
    if *status == ModerationStatus::Rejected {
        *status = ModerationStatus::ManualReview;
        true
    } else {
        false
    }
}
