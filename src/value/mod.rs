//! Decoded values, in-memory records, and the RFC 6313 structured-data
//! containers (spec §3, §4.4 "Record access").

mod list;

pub use list::{BasicList, ListSemantic, SubTemplateList, SubTemplateMultiList, SubTemplateMultiListEntry};

use crate::template::Template;
use serde::Serialize;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

/// A decoded field value, tagged by the owning element's data type
/// (spec §4.4 "Record access"). Generalizes the teacher's
/// `variable_versions::common::FieldValue` (String/DataNumber/Float64/
/// Duration/Ip4Addr/Ip6Addr/Vec) with `Bool`, `Mac`, split date
/// resolutions, and the three list containers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FieldValue {
    OctetArray(Vec<u8>),
    Uint(u64),
    Int(i64),
    Float32(f32),
    Float64(f64),
    Bool(bool),
    Mac([u8; 6]),
    String(String),
    DateSeconds(u32),
    DateMilliseconds(u64),
    DateMicroseconds(u64),
    DateNanoseconds(u64),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    BasicList(BasicList),
    SubTemplateList(SubTemplateList),
    SubTemplateMultiList(SubTemplateMultiList),
    /// A field present in the external template with no matching
    /// internal field (or vice versa): encoded/decoded as zero bytes of
    /// the relevant wire length (spec §4.4 step 3).
    Absent,
}

/// An in-memory record: one [`FieldValue`] per field of `template`, in
/// field order. The Rust-idiomatic reading of spec §3's "in-memory record
/// laid out by this template" (see SPEC_FULL.md §3).
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    #[serde(skip)]
    pub template: Arc<Template>,
    pub values: Vec<FieldValue>,
}

impl Record {
    pub fn new(template: Arc<Template>, values: Vec<FieldValue>) -> Self {
        Record { template, values }
    }

    /// Typed value extraction by field position within the record's
    /// template.
    pub fn get(&self, position: usize) -> Option<&FieldValue> {
        self.values.get(position)
    }

    /// Looks up the value for the field matching `(pen, id, midx)`.
    pub fn get_by_ident(&self, pen: u32, id: u16, midx: u16) -> Option<&FieldValue> {
        self.template
            .find_by_ident_midx(pen, id, midx)
            .and_then(|pos| self.values.get(pos))
    }

    /// Recursively visits every [`FieldValue`] in this record and in any
    /// nested list sub-records, depth first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a FieldValue)) {
        for value in &self.values {
            walk_value(value, visit);
        }
    }
}

fn walk_value<'a>(value: &'a FieldValue, visit: &mut dyn FnMut(&'a FieldValue)) {
    visit(value);
    match value {
        FieldValue::BasicList(bl) => {
            for v in &bl.values {
                walk_value(v, visit);
            }
        }
        FieldValue::SubTemplateList(stl) => {
            for record in &stl.records {
                record.walk(visit);
            }
        }
        FieldValue::SubTemplateMultiList(stml) => {
            for entry in &stml.entries {
                for record in &entry.records {
                    record.walk(visit);
                }
            }
        }
        _ => {}
    }
}
