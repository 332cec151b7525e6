use std::fmt;

use crate::models::{ModerationAction, ReviewStatus};

/// A (current state, requested state) pair outside the allowed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionError {
    pub from: ReviewStatus,
    pub to: ReviewStatus,
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid transition: a {} review cannot move to {}",
            self.from.as_str(),
            self.to.as_str()
        )
    }
}

impl ModerationAction {
    pub fn target(&self) -> ReviewStatus {
        match self {
            ModerationAction::Approve => ReviewStatus::Approved,
            ModerationAction::Reject => ReviewStatus::Rejected,
            ModerationAction::Hide => ReviewStatus::Hidden,
        }
    }
}

/// The full transition table. A pending review can be approved, rejected or
/// hidden; an approved review can later be hidden. Nothing ever returns to
/// pending, and a rejected or hidden review stays where it is.
pub fn apply(current: ReviewStatus, action: ModerationAction) -> Result<ReviewStatus, TransitionError> {
    use ReviewStatus::*;

    let to = action.target();
    match (current, to) {
        (Pending, Approved) | (Pending, Rejected) | (Pending, Hidden) | (Approved, Hidden) => Ok(to),
        _ => Err(TransitionError { from: current, to }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ModerationAction::*;
    use ReviewStatus::*;

    #[test]
    fn pending_accepts_every_action() {
        assert_eq!(apply(Pending, Approve), Ok(Approved));
        assert_eq!(apply(Pending, Reject), Ok(Rejected));
        assert_eq!(apply(Pending, Hide), Ok(Hidden));
    }

    #[test]
    fn approved_can_only_be_hidden() {
        assert_eq!(apply(Approved, Hide), Ok(Hidden));
        assert_eq!(apply(Approved, Approve), Err(TransitionError { from: Approved, to: Approved }));
        assert_eq!(apply(Approved, Reject), Err(TransitionError { from: Approved, to: Rejected }));
    }

    #[test]
    fn rejected_is_terminal() {
        assert!(apply(Rejected, Approve).is_err());
        assert!(apply(Rejected, Reject).is_err());
        assert!(apply(Rejected, Hide).is_err());
    }

    #[test]
    fn hidden_is_terminal() {
        assert!(apply(Hidden, Approve).is_err());
        assert!(apply(Hidden, Reject).is_err());
        assert!(apply(Hidden, Hide).is_err());
    }

    #[test]
    fn reject_then_approve_leaves_review_rejected() {
        let after_reject = apply(Pending, Reject).unwrap();
        let err = apply(after_reject, Approve).unwrap_err();
        assert_eq!(err, TransitionError { from: Rejected, to: Approved });
    }

    #[test]
    fn error_names_both_states() {
        let err = apply(Rejected, Approve).unwrap_err();
        assert_eq!(err.to_string(), "invalid transition: a rejected review cannot move to approved");
    }
}
