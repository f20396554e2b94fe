//! Optional descriptive metadata carried alongside a [`super::Template`]
//! (spec §3 "TemplateInfo").

use serde::Serialize;

/// Names, by `(pen, id)`, both the basicList IE and the element it
/// contains, for one basicList field of a template that carries
/// `TemplateInfo`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicListInfo {
    pub basic_list_pen: u32,
    pub basic_list_id: u16,
    pub content_pen: u32,
    pub content_id: u16,
}

/// `parent_tid` sentinels (spec §3).
pub mod parent {
    /// Top level: this template has no parent.
    pub const TOP_LEVEL: u16 = 0;
    /// First-level child of any top-level template.
    pub const ANY_FIRST_LEVEL: u16 = 1;
    /// Pre-metadata-protocol: not applicable.
    pub const NOT_APPLICABLE: u16 = 255;
}

/// Descriptive metadata optionally attached to a template when it is
/// added to a [`crate::session::Session`] (spec §3, §4.5).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateInfo {
    /// Required for export; a `TemplateInfo` with an empty name cannot
    /// be attached to an externally-added template (spec §4.3 step 6).
    pub name: String,
    pub description: Option<String>,
    pub app_label: Option<u32>,
    pub parent_tid: u16,
    pub basic_lists: Vec<BasicListInfo>,
}

impl TemplateInfo {
    pub fn new(name: impl Into<String>) -> Self {
        TemplateInfo {
            name: name.into(),
            description: None,
            app_label: None,
            parent_tid: parent::TOP_LEVEL,
            basic_lists: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_parent(mut self, parent_tid: u16) -> Self {
        self.parent_tid = parent_tid;
        self
    }

    pub fn with_app_label(mut self, app_label: u32) -> Self {
        self.app_label = Some(app_label);
        self
    }

    pub fn is_valid_for_export(&self) -> bool {
        !self.name.is_empty()
    }
}
