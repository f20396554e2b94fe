//! The external-tid -> internal-tid mapping used to decode list
//! sub-records (spec §3, §4.3 "Template-pair table").
//!
//! Implemented as a flat 65536-entry array with a population counter, as
//! spec §9 allows ("implementations may use either a flat array ... or a
//! hash map -- the contract is O(1) lookup and the sentinel value `1` for
//! 'disable'"). Allocated lazily on first use and freed once empty.

/// Sentinel meaning "decode but drop" (explicit disable).
pub const DISABLE: u16 = 1;
/// Sentinel meaning "no mapping defined" (array default).
pub const UNSET: u16 = 0;

#[derive(Debug, Default)]
pub struct TemplatePairs {
    table: Option<Box<[u16; 65536]>>,
    count: usize,
}

/// What to do when decoding a list sub-record carried under an external
/// template id (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairResolution {
    /// Drop the sub-record entirely (empty list record).
    Drop,
    /// No pairs defined (or pairs map the external tid to itself with no
    /// internal template registered): use the external template as the
    /// internal template, i.e. full decode.
    UseExternalAsInternal,
    /// Transcode into the internal template with this id.
    UseInternal(u16),
}

impl TemplatePairs {
    pub fn new() -> Self {
        TemplatePairs::default()
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Sets `pairs[ext_tid] = internal_tid`. Passing [`DISABLE`] (`1`)
    /// disables decoding of that external template's sub-records.
    /// Multiple external tids may route to the same internal tid; this
    /// is accepted silently (spec §9 "implementation-defined").
    pub fn set(&mut self, ext_tid: u16, internal_tid: u16) {
        let table = self
            .table
            .get_or_insert_with(|| Box::new([UNSET; 65536]));
        if table[ext_tid as usize] == UNSET && internal_tid != UNSET {
            self.count += 1;
        } else if table[ext_tid as usize] != UNSET && internal_tid == UNSET {
            self.count -= 1;
        }
        table[ext_tid as usize] = internal_tid;
        if self.count == 0 {
            self.table = None;
        }
    }

    pub fn clear(&mut self, ext_tid: u16) {
        self.set(ext_tid, UNSET);
    }

    /// Resolves the decode rule for `ext_tid` given whether an internal
    /// template of the mapped id actually exists.
    pub fn resolve(&self, ext_tid: u16, internal_exists: impl Fn(u16) -> bool) -> PairResolution {
        let Some(table) = &self.table else {
            return PairResolution::UseExternalAsInternal;
        };
        match table[ext_tid as usize] {
            UNSET => PairResolution::UseExternalAsInternal,
            DISABLE => PairResolution::Drop,
            mapped if mapped == ext_tid && !internal_exists(mapped) => {
                PairResolution::UseExternalAsInternal
            }
            mapped if internal_exists(mapped) => PairResolution::UseInternal(mapped),
            _ => PairResolution::Drop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_pairs_means_use_external() {
        let pairs = TemplatePairs::new();
        assert_eq!(
            pairs.resolve(300, |_| false),
            PairResolution::UseExternalAsInternal
        );
    }

    #[test]
    fn disable_sentinel_drops() {
        let mut pairs = TemplatePairs::new();
        pairs.set(300, DISABLE);
        assert_eq!(pairs.resolve(300, |_| true), PairResolution::Drop);
    }

    #[test]
    fn self_mapping_without_internal_uses_external() {
        let mut pairs = TemplatePairs::new();
        pairs.set(300, 300);
        assert_eq!(
            pairs.resolve(300, |_| false),
            PairResolution::UseExternalAsInternal
        );
    }

    #[test]
    fn mapped_to_existing_internal() {
        let mut pairs = TemplatePairs::new();
        pairs.set(300, 500);
        assert_eq!(pairs.resolve(300, |tid| tid == 500), PairResolution::UseInternal(500));
    }

    #[test]
    fn table_freed_when_emptied() {
        let mut pairs = TemplatePairs::new();
        pairs.set(300, 500);
        assert!(!pairs.is_empty());
        pairs.clear(300);
        assert!(pairs.is_empty());
    }
}
