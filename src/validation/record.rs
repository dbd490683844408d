//! Record validation performed before anything touches the log

use thiserror::Error;

use crate::types::{RecordDraft, Status};

/// Reasons a draft record is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(i64),

    #[error("status '{0}' is not one of Received, In Transit, Damaged, Delivered")]
    UnknownStatus(String),

    #[error("item is required")]
    MissingItem,

    #[error("actor is required")]
    MissingActor,

    #[error("item '{0}' is not in the catalog")]
    UnknownItem(String),
}

/// A draft that passed validation, ready to be stamped and persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidDraft {
    pub item: String,
    pub quantity: u64,
    pub status: Status,
    pub notes: Option<String>,
}

/// Validate a draft submitted by `actor`
///
/// Blank notes are normalized to `None`; item and notes are trimmed.
pub fn validate_draft(draft: RecordDraft, actor: &str) -> Result<ValidDraft, ValidationError> {
    if actor.trim().is_empty() {
        return Err(ValidationError::MissingActor);
    }

    let item = draft.item.trim().to_string();
    if item.is_empty() {
        return Err(ValidationError::MissingItem);
    }

    if draft.quantity <= 0 {
        return Err(ValidationError::NonPositiveQuantity(draft.quantity));
    }

    let status: Status = draft
        .status
        .parse()
        .map_err(|_| ValidationError::UnknownStatus(draft.status.clone()))?;

    let notes = draft
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    Ok(ValidDraft {
        item,
        quantity: draft.quantity as u64,
        status,
        notes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_draft() {
        let draft = RecordDraft::new(" iPhone 15 ", 3, "in transit").with_notes("  ");
        let valid = validate_draft(draft, "staff").unwrap();
        assert_eq!(valid.item, "iPhone 15");
        assert_eq!(valid.quantity, 3);
        assert_eq!(valid.status, Status::InTransit);
        assert_eq!(valid.notes, None);
    }

    #[test]
    fn test_rejects_non_positive_quantity() {
        for qty in [0, -1] {
            let err = validate_draft(RecordDraft::new("A", qty, "Received"), "staff").unwrap_err();
            assert_eq!(err, ValidationError::NonPositiveQuantity(qty));
        }
    }

    #[test]
    fn test_rejects_unknown_status() {
        let err = validate_draft(RecordDraft::new("A", 1, "Lost"), "staff").unwrap_err();
        assert_eq!(err, ValidationError::UnknownStatus("Lost".to_string()));
    }

    #[test]
    fn test_rejects_missing_fields() {
        assert_eq!(
            validate_draft(RecordDraft::new("  ", 1, "Received"), "staff").unwrap_err(),
            ValidationError::MissingItem
        );
        assert_eq!(
            validate_draft(RecordDraft::new("A", 1, "Received"), " ").unwrap_err(),
            ValidationError::MissingActor
        );
    }
}
