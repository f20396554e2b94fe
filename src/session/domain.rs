//! Per-observation-domain state: the external template table, attached
//! `TemplateInfo`, new-template-callback contexts, and the sequence
//! counter (spec §3, §4.3 "Domain switching").

use crate::template::{Template, TemplateInfo};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct DomainState {
    pub external_templates: HashMap<u16, Arc<Template>>,
    pub template_info: HashMap<u16, TemplateInfo>,
    pub template_contexts: HashMap<u16, Box<dyn Any>>,
    pub sequence: u32,
}

impl DomainState {
    pub fn new() -> Self {
        DomainState::default()
    }
}
