//! Templates: ordered sequences of IE references with per-field length
//! overrides, scope counts, and the structural/length bookkeeping the
//! buffer/transcoder relies on (spec §3, §4.2).

mod builder;
mod compare;
pub mod info;
mod search;

pub use builder::{CopyOptions, FieldSpecifier, IdentSpecifier, TemplateBuilder};
pub use compare::{CompareFlags, SetRelation};
pub use info::TemplateInfo;

use crate::ie::InfoElement;
use serde::Serialize;
use std::sync::Arc;

/// A single use of an [`InfoElement`] within a [`Template`].
#[derive(Debug, Clone, Serialize)]
pub struct TemplateField {
    #[serde(skip)]
    pub canon: Arc<InfoElement>,
    /// Actual octet length on the wire for this use of the element: the
    /// element's `default_len`, a caller override, or a reduced length.
    pub len: u16,
    /// Octet offset of this field inside an in-memory record described by
    /// this template.
    pub offset: u16,
    /// Repeat index: 0 for the first use of this element in the
    /// template, 1 for the next, etc.
    pub midx: u16,
}

impl TemplateField {
    pub fn is_varlen(&self) -> bool {
        self.len == crate::ie::VARLEN
    }

    pub fn pen(&self) -> u32 {
        self.canon.pen
    }

    pub fn id(&self) -> u16 {
        self.canon.id
    }
}

/// The in-memory size contributed by a variable-length scalar field
/// (mirrors a `VarField` handle in the C original: a length + pointer
/// pair, represented here simply as size bookkeeping since Rust's
/// `Record` stores typed values rather than raw memory).
pub const VARFIELD_MEM_SIZE: u16 = 16;
/// In-memory size contributed by a basicList/subTemplateList/
/// subTemplateMultiList field.
pub const LIST_MEM_SIZE: u16 = 24;

/// An ordered sequence of [`TemplateField`]s, sealed and immutable once
/// constructed. Shared across Sessions via `Arc`; dropping the last
/// `Arc` clone is this crate's realization of spec §3's reference-counted
/// `release` (Design Notes §9).
#[derive(Debug, Clone, Serialize)]
pub struct Template {
    pub fields: Vec<TemplateField>,
    /// 0 = data template; >0 = options template, with this many leading
    /// scope fields.
    pub scope_count: u16,
    pub wire_fixed_len: u16,
    pub mem_len: u16,
    /// Minimum wire octet count one record of this template can occupy:
    /// `wire_fixed_len` plus one octet per variable-length or list field
    /// (its shortest possible length prefix). Used to reject a record
    /// whose remaining bytes are too few to hold it before decoding it
    /// field by field.
    pub record_len_for_decode: u16,
    pub is_varlen: bool,
    pub contains_list: bool,
    pub(crate) basic_list_positions: Vec<usize>,
    pub(crate) stl_positions: Vec<usize>,
    pub(crate) stml_positions: Vec<usize>,
}

impl Template {
    pub fn builder() -> TemplateBuilder {
        TemplateBuilder::new()
    }

    pub fn is_options_template(&self) -> bool {
        self.scope_count > 0
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Builds a `TemplateBuilder` pre-populated from this template's
    /// fields, optionally stripping `paddingOctets` fields and/or
    /// discarding scope (spec §4.2 "copy").
    pub fn copy(&self, options: CopyOptions) -> TemplateBuilder {
        let mut builder = TemplateBuilder::new();
        let kept_scope = self.fields[..self.scope_count as usize]
            .iter()
            .filter(|f| !(options.strip_padding && f.canon.is_padding()))
            .count() as u16;
        for field in &self.fields {
            if options.strip_padding && field.canon.is_padding() {
                continue;
            }
            builder.append_existing(field.canon.clone(), field.len);
        }
        if !options.discard_scope && kept_scope > 0 {
            let _ = builder.set_scope_count(kept_scope);
        }
        builder
    }
}
