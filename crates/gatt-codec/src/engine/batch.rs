//! Batch input and output containers.

use std::ops::Index;

use rustc_hash::FxHashMap;

use crate::model::{RecordId, RecordResult};

/// An insertion-ordered set of `(id, raw bytes)` pairs to decode together.
///
/// Inserting an identifier that is already present replaces its bytes but
/// keeps its original position, so insertion order stays well defined.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    entries: Vec<(RecordId, Vec<u8>)>,
    index: FxHashMap<RecordId, usize>,
}

impl Batch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Adds a record, returning the bytes it replaced if `id` was present.
    pub fn insert(&mut self, id: RecordId, raw: impl Into<Vec<u8>>) -> Option<Vec<u8>> {
        let raw = raw.into();
        match self.index.get(&id) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].1, raw)),
            None => {
                self.index.insert(id, self.entries.len());
                self.entries.push((id, raw));
                None
            }
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, id: RecordId, raw: impl Into<Vec<u8>>) -> Self {
        self.insert(id, raw);
        self
    }

    pub fn get(&self, id: &RecordId) -> Option<&[u8]> {
        self.index.get(id).map(|&pos| self.entries[pos].1.as_slice())
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.index.contains_key(id)
    }

    /// Position of `id` in insertion order.
    pub fn position(&self, id: &RecordId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Removes `id`, shifting later records down one position.
    pub fn remove(&mut self, id: &RecordId) -> Option<Vec<u8>> {
        let pos = self.index.remove(id)?;
        let (_, raw) = self.entries.remove(pos);
        for (_, p) in self.index.iter_mut() {
            if *p > pos {
                *p -= 1;
            }
        }
        Some(raw)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (RecordId, &[u8])> {
        self.entries.iter().map(|(id, raw)| (*id, raw.as_slice()))
    }

    /// Identifiers in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    pub(crate) fn entry(&self, pos: usize) -> (RecordId, &[u8]) {
        let (id, raw) = &self.entries[pos];
        (*id, raw.as_slice())
    }
}

impl<B: Into<Vec<u8>>> FromIterator<(RecordId, B)> for Batch {
    fn from_iter<I: IntoIterator<Item = (RecordId, B)>>(iter: I) -> Self {
        let mut batch = Batch::new();
        for (id, raw) in iter {
            batch.insert(id, raw);
        }
        batch
    }
}

impl<B: Into<Vec<u8>>, const N: usize> From<[(RecordId, B); N]> for Batch {
    fn from(entries: [(RecordId, B); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<B: Into<Vec<u8>>> From<Vec<(RecordId, B)>> for Batch {
    fn from(entries: Vec<(RecordId, B)>) -> Self {
        entries.into_iter().collect()
    }
}

/// Results of one batch decode: exactly one [`RecordResult`] per input id.
#[derive(Debug, Clone)]
pub struct DecodedBatch {
    /// In batch insertion order.
    results: Vec<RecordResult>,
    index: FxHashMap<RecordId, usize>,
    order: Vec<RecordId>,
    cycles: Vec<Vec<RecordId>>,
}

impl DecodedBatch {
    pub(crate) fn new(
        results: Vec<RecordResult>,
        order: Vec<RecordId>,
        cycles: Vec<Vec<RecordId>>,
    ) -> Self {
        let index = results
            .iter()
            .enumerate()
            .map(|(pos, r)| (r.id(), pos))
            .collect();
        Self {
            results,
            index,
            order,
            cycles,
        }
    }

    pub fn get(&self, id: &RecordId) -> Option<&RecordResult> {
        self.index.get(id).map(|&pos| &self.results[pos])
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Iterates results in batch insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, RecordResult> {
        self.results.iter()
    }

    /// Identifiers in the order they were decoded.
    pub fn decode_order(&self) -> &[RecordId] {
        &self.order
    }

    /// Dependency cycles found in the batch, members in insertion order.
    pub fn cycles(&self) -> &[Vec<RecordId>] {
        &self.cycles
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &RecordResult> {
        self.results.iter().filter(|r| r.success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &RecordResult> {
        self.results.iter().filter(|r| !r.success())
    }

    /// Returns true if every record decoded successfully.
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(RecordResult::success)
    }

    pub fn into_results(self) -> Vec<RecordResult> {
        self.results
    }
}

impl Index<RecordId> for DecodedBatch {
    type Output = RecordResult;

    /// # Panics
    ///
    /// Panics if `id` was not part of the batch.
    fn index(&self, id: RecordId) -> &RecordResult {
        match self.get(&id) {
            Some(result) => result,
            None => panic!("record {} was not part of the batch", id),
        }
    }
}

impl IntoIterator for DecodedBatch {
    type Item = RecordResult;
    type IntoIter = std::vec::IntoIter<RecordResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a DecodedBatch {
    type Item = &'a RecordResult;
    type IntoIter = std::slice::Iter<'a, RecordResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: RecordId = RecordId::from_u16(0x0A00);
    const B: RecordId = RecordId::from_u16(0x0B00);
    const C: RecordId = RecordId::from_u16(0x0C00);

    #[test]
    fn test_insertion_order_and_replacement() {
        let mut batch = Batch::new().with(B, vec![1]).with(A, vec![2]);
        assert_eq!(batch.insert(B, vec![3]), Some(vec![1]));
        assert_eq!(batch.ids().collect::<Vec<_>>(), vec![B, A]);
        assert_eq!(batch.get(&B), Some(&[3u8][..]));
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_remove_keeps_positions_consistent() {
        let mut batch = Batch::from([(A, vec![1u8]), (B, vec![2]), (C, vec![3])]);
        assert_eq!(batch.remove(&A), Some(vec![1]));
        assert_eq!(batch.position(&B), Some(0));
        assert_eq!(batch.position(&C), Some(1));
        assert_eq!(batch.entry(1), (C, &[3u8][..]));
        assert!(batch.remove(&A).is_none());
    }

    #[test]
    fn test_from_iterator() {
        let batch: Batch = vec![(A, &[1u8][..]), (A, &[2u8][..])].into_iter().collect();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.get(&A), Some(&[2u8][..]));
    }

    #[test]
    fn test_decoded_batch_lookup() {
        let decoded = DecodedBatch::new(
            vec![
                RecordResult::ok(A, vec![], crate::model::Value::Bool(true)),
                RecordResult::err(
                    B,
                    vec![],
                    crate::error::RecordError::UnresolvedIdentifier { id: B },
                ),
            ],
            vec![A, B],
            vec![],
        );
        assert!(decoded[A].success());
        assert!(!decoded[B].success());
        assert!(decoded.get(&C).is_none());
        assert_eq!(decoded.succeeded().count(), 1);
        assert_eq!(decoded.failed().count(), 1);
        assert!(!decoded.all_succeeded());
        assert!(!decoded.has_cycles());
    }
}
