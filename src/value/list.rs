use super::{FieldValue, Record};
use crate::ie::InfoElement;
use crate::template::Template;
use serde::Serialize;
use std::sync::Arc;

/// RFC 6313 list semantics (the 1-octet semantic field shared by all
/// three structured data types).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ListSemantic {
    NoneOf,
    ExactlyOneOf,
    OneOrMoreOf,
    AllOf,
    Undefined(u8),
}

impl ListSemantic {
    pub fn to_wire(self) -> u8 {
        match self {
            ListSemantic::NoneOf => 0,
            ListSemantic::ExactlyOneOf => 1,
            ListSemantic::OneOrMoreOf => 2,
            ListSemantic::AllOf => 3,
            ListSemantic::Undefined(v) => v,
        }
    }

    pub fn from_wire(v: u8) -> Self {
        match v {
            0 => ListSemantic::NoneOf,
            1 => ListSemantic::ExactlyOneOf,
            2 => ListSemantic::OneOrMoreOf,
            3 => ListSemantic::AllOf,
            other => ListSemantic::Undefined(other),
        }
    }
}

/// A decoded `basicList`: a homogeneous sequence of scalar values of one
/// information element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicList {
    pub semantic: ListSemantic,
    #[serde(skip)]
    pub element: Arc<InfoElement>,
    pub element_len: u16,
    pub values: Vec<FieldValue>,
}

impl BasicList {
    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index)
    }
}

/// A decoded `subTemplateList`: a homogeneous sequence of records sharing
/// one template.
#[derive(Debug, Clone, Serialize)]
pub struct SubTemplateList {
    pub semantic: ListSemantic,
    pub template_id: u16,
    #[serde(skip)]
    pub template: Option<Arc<Template>>,
    pub records: Vec<Record>,
}

impl SubTemplateList {
    pub fn count(&self) -> usize {
        self.records.len()
    }
}

/// One entry of a `subTemplateMultiList`: its own template id and record
/// buffer.
#[derive(Debug, Clone, Serialize)]
pub struct SubTemplateMultiListEntry {
    pub template_id: u16,
    #[serde(skip)]
    pub template: Option<Arc<Template>>,
    pub records: Vec<Record>,
}

/// A decoded `subTemplateMultiList`: a heterogeneous sequence of entries,
/// each independently templated.
#[derive(Debug, Clone, Serialize)]
pub struct SubTemplateMultiList {
    pub semantic: ListSemantic,
    pub entries: Vec<SubTemplateMultiListEntry>,
}

impl SubTemplateMultiList {
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}
