//! Read-only view of sibling records available to a decode call.

use std::borrow::Cow;

use rustc_hash::FxHashMap;

use crate::error::DecodeError;
use crate::model::{RecordId, RecordResult, Value};

/// Sibling results visible to one decode call.
///
/// Inside a batch the engine hands each codec a context that borrows the
/// results produced so far; the borrow guarantees nothing mutates them for
/// the duration of the call. Outside a batch a caller can assemble a context
/// explicitly from results it obtained elsewhere.
///
/// Lookups distinguish "absent" (`get` returns `None`) from "present but
/// failed" (`get` returns a failed [`RecordResult`]).
#[derive(Debug, Clone)]
pub struct RecordContext<'a> {
    siblings: Cow<'a, FxHashMap<RecordId, RecordResult>>,
    /// The record being decoded; never visible as its own sibling.
    hidden: Option<RecordId>,
}

impl Default for RecordContext<'_> {
    fn default() -> Self {
        Self {
            siblings: Cow::Owned(FxHashMap::default()),
            hidden: None,
        }
    }
}

impl<'a> RecordContext<'a> {
    /// Creates a context with no siblings.
    pub fn empty() -> RecordContext<'static> {
        RecordContext::default()
    }

    /// Creates an owned context from previously obtained results.
    ///
    /// A later result for the same identifier replaces an earlier one.
    pub fn from_results(results: impl IntoIterator<Item = RecordResult>) -> RecordContext<'static> {
        RecordContext {
            siblings: Cow::Owned(results.into_iter().map(|r| (r.id(), r)).collect()),
            hidden: None,
        }
    }

    /// Creates a context borrowing an existing result map.
    pub fn borrowed(siblings: &'a FxHashMap<RecordId, RecordResult>) -> Self {
        Self {
            siblings: Cow::Borrowed(siblings),
            hidden: None,
        }
    }

    /// Returns a view of this context in which `id` is not visible.
    pub(crate) fn excluding(&self, id: RecordId) -> RecordContext<'_> {
        match self.hidden {
            Some(hidden) if hidden != id => RecordContext {
                siblings: Cow::Owned(
                    self.iter()
                        .filter(|r| r.id() != id)
                        .map(|r| (r.id(), r.clone()))
                        .collect(),
                ),
                hidden: None,
            },
            _ => RecordContext {
                siblings: Cow::Borrowed(&*self.siblings),
                hidden: Some(id),
            },
        }
    }

    /// Returns the sibling result for `id`, successful or not.
    pub fn get(&self, id: &RecordId) -> Option<&RecordResult> {
        if self.hidden.as_ref() == Some(id) {
            return None;
        }
        self.siblings.get(id)
    }

    /// Returns the decoded value of `id` if that sibling succeeded.
    pub fn value(&self, id: &RecordId) -> Option<&Value> {
        self.get(id).and_then(RecordResult::value)
    }

    /// Returns the decoded value of `id`, or a decode error naming it.
    ///
    /// Convenience for codecs that read a required dependency.
    pub fn require(&self, id: &RecordId) -> Result<&Value, DecodeError> {
        self.value(id)
            .ok_or(DecodeError::DependencyUnavailable { id: *id })
    }

    /// Returns true if `id` is present (even if it failed).
    pub fn contains(&self, id: &RecordId) -> bool {
        self.get(id).is_some()
    }

    /// Returns true if `id` is present and decoded successfully.
    pub fn succeeded(&self, id: &RecordId) -> bool {
        self.get(id).is_some_and(RecordResult::success)
    }

    /// Iterates over visible sibling results (order unspecified).
    pub fn iter(&self) -> impl Iterator<Item = &RecordResult> {
        let hidden = self.hidden;
        self.siblings
            .values()
            .filter(move |r| Some(r.id()) != hidden)
    }

    /// Identifiers of visible siblings (order unspecified).
    pub fn ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.iter().map(RecordResult::id)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
