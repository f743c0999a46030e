//! Temporal generation index.
//!
//! Generations of one component are kept sorted by `valid_from`, so every
//! date query is a binary search. The owning component's `valid_to` bounds
//! the index: a query at or after it finds nothing.

use tessera_types::{EffectiveDate, EntryId};

use crate::error::{RepoError, RepoResult};

/// Points at one generation entry without materializing it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GenerationRef {
    pub valid_from: EffectiveDate,
    pub id: EntryId,
}

impl GenerationRef {
    pub fn new(id: impl Into<EntryId>, valid_from: EffectiveDate) -> Self {
        Self {
            valid_from,
            id: id.into(),
        }
    }
}

/// Ordered generations of a single component.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationIndex {
    generations: Vec<GenerationRef>,
    valid_to: Option<EffectiveDate>,
}

impl GenerationIndex {
    /// Build the index for `component_id`.
    ///
    /// `generations` may arrive in any order. Two generations with the same
    /// `valid_from` are rejected.
    pub fn build(
        component_id: &EntryId,
        mut generations: Vec<GenerationRef>,
        valid_to: Option<EffectiveDate>,
    ) -> RepoResult<Self> {
        generations.sort_by(|a, b| a.valid_from.cmp(&b.valid_from));
        if let Some(pair) = generations
            .windows(2)
            .find(|w| w[0].valid_from == w[1].valid_from)
        {
            return Err(RepoError::DuplicateGeneration {
                component_id: component_id.clone(),
                valid_from: pair[0].valid_from,
            });
        }
        Ok(Self {
            generations,
            valid_to,
        })
    }

    /// Exclusive end of the component's validity.
    pub fn valid_to(&self) -> Option<EffectiveDate> {
        self.valid_to
    }

    /// The generation with the greatest `valid_from <= date`.
    ///
    /// Absent when no generation starts on or before `date`, or when `date`
    /// is at or past `valid_to`.
    pub fn effective_at(&self, date: EffectiveDate) -> Option<&GenerationRef> {
        if self.valid_to.is_some_and(|end| date >= end) {
            return None;
        }
        let idx = self.generations.partition_point(|g| g.valid_from <= date);
        idx.checked_sub(1).map(|i| &self.generations[i])
    }

    /// The generation with the latest `valid_from`.
    pub fn latest(&self) -> Option<&GenerationRef> {
        self.generations.last()
    }

    pub fn first(&self) -> Option<&GenerationRef> {
        self.generations.first()
    }

    /// The generation immediately after the one valid from `valid_from`.
    pub fn next_after(&self, valid_from: EffectiveDate) -> Option<&GenerationRef> {
        let idx = self.generations.partition_point(|g| g.valid_from <= valid_from);
        self.generations.get(idx)
    }

    /// The generation immediately before the one valid from `valid_from`.
    pub fn previous_before(&self, valid_from: EffectiveDate) -> Option<&GenerationRef> {
        let idx = self.generations.partition_point(|g| g.valid_from < valid_from);
        idx.checked_sub(1).map(|i| &self.generations[i])
    }

    pub fn len(&self) -> usize {
        self.generations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    /// All generations, oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, GenerationRef> {
        self.generations.iter()
    }
}

impl<'a> IntoIterator for &'a GenerationIndex {
    type Item = &'a GenerationRef;
    type IntoIter = std::slice::Iter<'a, GenerationRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date(y: i32, m: u32, d: u32) -> EffectiveDate {
        EffectiveDate::ymd(y, m, d).unwrap()
    }

    fn index(valid_to: Option<EffectiveDate>) -> GenerationIndex {
        GenerationIndex::build(
            &EntryId::new("policy"),
            vec![
                GenerationRef::new("g3", date(2010, 1, 1)),
                GenerationRef::new("g1", date(2000, 1, 1)),
                GenerationRef::new("g2", date(2005, 1, 1)),
            ],
            valid_to,
        )
        .unwrap()
    }

    fn id_at(index: &GenerationIndex, d: EffectiveDate) -> Option<&str> {
        index.effective_at(d).map(|g| g.id.as_str())
    }

    // -----------------------------------------------------------------------
    // Date selection
    // -----------------------------------------------------------------------

    #[test]
    fn selects_greatest_valid_from_not_after_date() {
        let idx = index(None);
        assert_eq!(id_at(&idx, date(1999, 12, 31)), None);
        assert_eq!(id_at(&idx, date(2000, 1, 1)), Some("g1"));
        assert_eq!(id_at(&idx, date(2004, 6, 1)), Some("g1"));
        assert_eq!(id_at(&idx, date(2005, 1, 1)), Some("g2"));
        assert_eq!(id_at(&idx, date(2030, 1, 1)), Some("g3"));
    }

    #[test]
    fn valid_to_is_exclusive() {
        let end = date(2010, 1, 1);
        let idx = index(Some(end));
        assert_eq!(id_at(&idx, end), None);
        assert_eq!(id_at(&idx, end.minus_millis(1)), Some("g2"));
    }

    #[test]
    fn empty_index_finds_nothing() {
        let idx = GenerationIndex::default();
        assert!(idx.is_empty());
        assert_eq!(id_at(&idx, date(2020, 1, 1)), None);
        assert!(idx.latest().is_none());
    }

    #[test]
    fn duplicate_valid_from_rejected() {
        let result = GenerationIndex::build(
            &EntryId::new("c"),
            vec![
                GenerationRef::new("a", date(2001, 1, 1)),
                GenerationRef::new("b", date(2001, 1, 1)),
            ],
            None,
        );
        assert!(matches!(result, Err(RepoError::DuplicateGeneration { .. })));
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    #[test]
    fn next_and_previous() {
        let idx = index(None);
        assert_eq!(idx.len(), 3);
        assert_eq!(idx.latest().unwrap().id.as_str(), "g3");
        assert_eq!(idx.first().unwrap().id.as_str(), "g1");
        assert_eq!(idx.next_after(date(2000, 1, 1)).unwrap().id.as_str(), "g2");
        assert!(idx.next_after(date(2010, 1, 1)).is_none());
        assert_eq!(idx.previous_before(date(2010, 1, 1)).unwrap().id.as_str(), "g2");
        assert!(idx.previous_before(date(2000, 1, 1)).is_none());
        let order: Vec<_> = idx.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(order, vec!["g1", "g2", "g3"]);
    }

    proptest! {
        #[test]
        fn effective_generation_matches_linear_scan(
            starts in proptest::collection::btree_set(0i64..1_000_000, 0..20),
            query in -10i64..1_100_000,
            end in proptest::option::of(0i64..1_100_000),
        ) {
            let refs: Vec<_> = starts
                .iter()
                .map(|&ms| GenerationRef::new(format!("g{ms}"), EffectiveDate::from_millis(ms)))
                .collect();
            let valid_to = end.map(EffectiveDate::from_millis);
            let idx = GenerationIndex::build(&EntryId::new("c"), refs, valid_to).unwrap();

            let expected = if end.is_some_and(|e| query >= e) {
                None
            } else {
                starts.iter().rev().find(|&&ms| ms <= query).map(|ms| format!("g{ms}"))
            };
            let actual = idx
                .effective_at(EffectiveDate::from_millis(query))
                .map(|g| g.id.to_string());
            prop_assert_eq!(actual, expected);
        }
    }
}
