use super::Template;
use std::collections::HashMap;

/// Flags controlling [`compare`][Template::compare]-style comparisons.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompareFlags {
    pub ignore_padding: bool,
    pub ignore_field_len: bool,
    pub ignore_scope: bool,
}

/// The outcome of a multiset comparison between two templates' field
/// sets (spec §4.2 "set compare").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetRelation {
    Equal,
    Subset,
    Superset,
    Common,
    Disjoint,
}

impl Template {
    /// Identical length, identical scope count, identical ordered fields
    /// (same element and same per-field length).
    pub fn equal(&self, other: &Template) -> bool {
        self.compare(other, CompareFlags::default())
    }

    /// As [`Template::equal`], but individual aspects of the comparison
    /// can be relaxed via `flags`.
    pub fn compare(&self, other: &Template, flags: CompareFlags) -> bool {
        if !flags.ignore_scope && self.scope_count != other.scope_count {
            return false;
        }
        let a: Vec<_> = self
            .fields
            .iter()
            .filter(|f| !(flags.ignore_padding && f.canon.is_padding()))
            .collect();
        let b: Vec<_> = other
            .fields
            .iter()
            .filter(|f| !(flags.ignore_padding && f.canon.is_padding()))
            .collect();
        if a.len() != b.len() {
            return false;
        }
        a.iter().zip(b.iter()).all(|(x, y)| {
            x.pen() == y.pen()
                && x.id() == y.id()
                && x.midx == y.midx
                && (flags.ignore_field_len || x.len == y.len)
        })
    }

    /// Classifies the multiset relationship between this template's
    /// fields and `other`'s under multiset semantics: a field appearing
    /// twice in one template must appear twice in the other to be
    /// "covered". Also returns the count of matching fields.
    pub fn set_compare(&self, other: &Template) -> (SetRelation, usize) {
        let mut self_counts: HashMap<(u32, u16), usize> = HashMap::new();
        for f in &self.fields {
            *self_counts.entry((f.pen(), f.id())).or_insert(0) += 1;
        }
        let mut other_counts: HashMap<(u32, u16), usize> = HashMap::new();
        for f in &other.fields {
            *other_counts.entry((f.pen(), f.id())).or_insert(0) += 1;
        }

        let mut matching = 0usize;
        let mut self_has_extra = false;
        for (key, &count) in &self_counts {
            let other_count = *other_counts.get(key).unwrap_or(&0);
            matching += count.min(other_count);
            if count > other_count {
                self_has_extra = true;
            }
        }
        let mut other_has_extra = false;
        for (key, &count) in &other_counts {
            let self_count = *self_counts.get(key).unwrap_or(&0);
            if count > self_count {
                other_has_extra = true;
            }
        }

        let relation = match (self_has_extra, other_has_extra) {
            (false, false) => SetRelation::Equal,
            (false, true) => SetRelation::Subset,
            (true, false) => SetRelation::Superset,
            (true, true) if matching > 0 => SetRelation::Common,
            (true, true) => SetRelation::Disjoint,
        };
        (relation, matching)
    }

    /// True if `self` contains every field of `other_without_padding`
    /// (used to verify `strip_padding(T)` against `T` minus its padding
    /// fields; spec §8 invariant).
    pub fn contains_all_fields_of(&self, other: &Template) -> bool {
        let (relation, matching) = self.set_compare(other);
        matching == other.fields.len()
            && matches!(relation, SetRelation::Equal | SetRelation::Superset)
    }
}
