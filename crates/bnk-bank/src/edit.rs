use bnk_format::{ObjectEdit, WemId};
use serde::Serialize;

/// A requested change to one embedded object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditAction {
    /// Swap in new bytes. Empty bytes are accepted.
    Replace(Vec<u8>),
    /// Silence the object: zero-length payload, index record kept.
    Empty,
    /// Remove the object's record and bytes from the bank.
    Delete,
}

impl EditAction {
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Replace(_) => "update",
            Self::Empty => "empty",
            Self::Delete => "delete",
        }
    }

    pub(crate) fn into_object_edit(self) -> ObjectEdit {
        match self {
            Self::Replace(bytes) => ObjectEdit::Replace(bytes),
            Self::Empty => ObjectEdit::Replace(Vec::new()),
            Self::Delete => ObjectEdit::Delete,
        }
    }
}

/// An edit skipped during batch staging.
///
/// `id` is `None` when the request named no object at all, such as a file
/// whose stem is not a number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SkippedEdit {
    pub name: String,
    pub id: Option<WemId>,
    pub reason: String,
}

impl SkippedEdit {
    pub fn for_id(id: WemId, reason: impl Into<String>) -> Self {
        Self {
            name: id.to_string(),
            id: Some(id),
            reason: reason.into(),
        }
    }

    pub fn for_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            reason: reason.into(),
        }
    }
}

/// Outcome of staging a list of edits.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub staged: Vec<WemId>,
    pub skipped: Vec<SkippedEdit>,
}

impl BatchReport {
    pub fn warning_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_maps_to_zero_length_replace() {
        assert_eq!(
            EditAction::Empty.into_object_edit(),
            ObjectEdit::Replace(Vec::new())
        );
        assert_eq!(EditAction::Delete.into_object_edit(), ObjectEdit::Delete);
    }

    #[test]
    fn report_counts() {
        let report = BatchReport {
            staged: vec![WemId(1)],
            skipped: vec![
                SkippedEdit::for_id(WemId(2), "unknown"),
                SkippedEdit::for_name("music.wem", "not an object name"),
            ],
        };
        assert_eq!(report.warning_count(), 2);
        assert_eq!(report.skipped[0].name, "2");
        assert_eq!(report.skipped[1].id, None);
        assert!(!report.is_clean());
        assert!(BatchReport::default().is_clean());
    }
}
