//! Information model: the catalog of Information Elements (IEs) keyed by
//! `(privateEnterpriseNumber, elementId)` and by name (spec §3, §4.1).

mod builtin;
mod types;

pub use builtin::TEMPLATE_METADATA_PEN;
pub use types::DataType;

use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// IANA's reserved enterprise number for reverse information elements
/// (RFC 5103).
pub const REVERSE_PEN: u32 = 29305;

/// The `paddingOctets` information element (pen 0, id 210), recognized by
/// identity in template-copy operations that strip padding.
pub const PADDING_OCTETS_ID: u16 = 210;
pub const PADDING_OCTETS_PEN: u32 = 0;

/// Flags carried on an [`InfoElement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct IeFlags {
    /// Multi-octet integer types are transcoded with endian conversion.
    pub endian: bool,
    /// A reverse twin should be (or was) synthesized for this element.
    pub reversible: bool,
    /// This element was synthesized by the model for an unknown (pen, id)
    /// encountered while decoding a template (never set by user-driven
    /// construction).
    pub alien: bool,
}

/// An immutable (after registration) description of an Information
/// Element.
#[derive(Debug, Clone, Serialize)]
pub struct InfoElement {
    pub pen: u32,
    pub id: u16,
    /// Default octet length on the wire. `65535` is the variable-length
    /// sentinel.
    pub default_len: u16,
    pub data_type: DataType,
    pub semantics: u8,
    pub units: u16,
    pub min: u64,
    pub max: u64,
    pub flags: IeFlags,
    pub name: String,
    pub description: String,
}

/// Sentinel default length meaning "variable length".
pub const VARLEN: u16 = 65535;

impl InfoElement {
    pub fn new(
        pen: u32,
        id: u16,
        name: impl Into<String>,
        data_type: DataType,
        default_len: u16,
    ) -> Self {
        debug_assert!(id & 0x8000 == 0, "element id must have its high bit clear");
        InfoElement {
            pen,
            id,
            default_len,
            data_type,
            semantics: 0,
            units: 0,
            min: 0,
            max: 0,
            flags: IeFlags::default(),
            name: name.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_semantics(mut self, semantics: u8) -> Self {
        self.semantics = semantics;
        self
    }

    pub fn with_units(mut self, units: u16) -> Self {
        self.units = units;
        self
    }

    pub fn with_range(mut self, min: u64, max: u64) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn reversible(mut self) -> Self {
        self.flags.reversible = true;
        self
    }

    pub fn endian(mut self) -> Self {
        self.flags.endian = true;
        self
    }

    pub fn is_padding(&self) -> bool {
        self.pen == PADDING_OCTETS_PEN && self.id == PADDING_OCTETS_ID
    }

    /// Builds this element's reverse twin per RFC 5103: pen 0 elements get
    /// a twin under [`REVERSE_PEN`]; enterprise elements get a twin whose
    /// id has bit `0x4000` set. The twin's name is `reverse` followed by
    /// the original name with its first letter upper-cased.
    fn reverse_twin(&self) -> InfoElement {
        let (pen, id) = if self.pen == 0 {
            (REVERSE_PEN, self.id)
        } else {
            (self.pen, self.id | 0x4000)
        };
        let mut twin = self.clone();
        twin.pen = pen;
        twin.id = id;
        twin.name = reverse_name(&self.name);
        twin.flags.reversible = false;
        twin
    }
}

fn reverse_name(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!("reverse{}{}", first.to_uppercase(), chars.as_str()),
        None => "reverse".to_string(),
    }
}

/// A bag of [`InfoElement`]s indexed by name and by `(pen, id)`.
///
/// Adding an element whose keys collide with an existing entry replaces
/// that entry in both indexes (spec §4.1).
#[derive(Debug, Default)]
pub struct InfoModel {
    by_ident: HashMap<(u32, u16), Arc<InfoElement>>,
    by_name: HashMap<String, Arc<InfoElement>>,
}

/// A source of externally-defined elements (e.g. an XML registry loader).
/// The model only exposes insertion; parsing the source format is out of
/// scope for the core (spec §1 Non-goals).
pub trait ElementRegistrySource {
    fn elements(&self) -> Vec<InfoElement>;
}

impl InfoModel {
    pub fn new() -> Self {
        InfoModel::default()
    }

    /// An [`InfoModel`] pre-seeded with the IANA elements this crate ships
    /// built in (spec §4.1 "supplemented").
    pub fn builtin() -> Self {
        let mut model = InfoModel::new();
        model.add_element_array(builtin::builtin_elements());
        model
    }

    pub fn add_element(&mut self, element: InfoElement) {
        let reversible = element.flags.reversible;
        let twin = reversible.then(|| element.reverse_twin());
        self.insert(element);
        if let Some(twin) = twin {
            self.insert(twin);
        }
    }

    pub fn add_element_array(&mut self, elements: impl IntoIterator<Item = InfoElement>) {
        for element in elements {
            self.add_element(element);
        }
    }

    pub fn load_from_source(&mut self, source: &dyn ElementRegistrySource) {
        self.add_element_array(source.elements());
    }

    fn insert(&mut self, element: InfoElement) {
        let ident = (element.pen, element.id);
        let name = element.name.clone();
        if let Some(prior) = self.by_ident.get(&ident) {
            if prior.name != name {
                self.by_name.remove(&prior.name);
            }
        }
        if let Some(prior) = self.by_name.get(&name) {
            if (prior.pen, prior.id) != ident {
                self.by_ident.remove(&(prior.pen, prior.id));
            }
        }
        let arc = Arc::new(element);
        self.by_ident.insert(ident, arc.clone());
        self.by_name.insert(name, arc);
    }

    pub fn get_by_name(&self, name: &str) -> Option<Arc<InfoElement>> {
        self.by_name.get(name).cloned()
    }

    pub fn get_by_ident(&self, pen: u32, id: u16) -> Option<Arc<InfoElement>> {
        self.by_ident.get(&(pen, id)).cloned()
    }

    pub fn contains(&self, pen: u32, id: u16) -> bool {
        self.by_ident.contains_key(&(pen, id))
    }

    pub fn count(&self) -> usize {
        self.by_ident.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<InfoElement>> {
        self.by_ident.values()
    }

    /// Resolves `(pen, id)`, synthesizing and inserting an `octetArray`
    /// element flagged `alien` if the model has no entry for it. Used
    /// while decoding a template received from the wire; never called
    /// for user-driven template construction (spec §3 "Alien element").
    pub fn resolve_or_alien(&mut self, pen: u32, id: u16, len: u16) -> Arc<InfoElement> {
        if let Some(ie) = self.get_by_ident(pen, id) {
            return ie;
        }
        let mut alien = InfoElement::new(
            pen,
            id,
            format!("_alien_{pen}_{id}"),
            DataType::OctetArray,
            if len == VARLEN { VARLEN } else { len },
        );
        alien.flags.alien = true;
        self.insert(alien.clone());
        self.get_by_ident(pen, id).unwrap_or_else(|| Arc::new(alien))
    }

    /// Resolves `(pen, id)`, returning [`Error::UnknownElement`] rather
    /// than synthesizing an alien element. Used by user-driven template
    /// construction (spec §4.2 "append by ident specifier").
    pub fn require(&self, pen: u32, id: u16) -> Result<Arc<InfoElement>> {
        self.get_by_ident(pen, id)
            .ok_or(Error::UnknownElement { pen, id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_twin_standard_pen() {
        let mut model = InfoModel::new();
        model.add_element(
            InfoElement::new(0, 152, "flowStartMilliseconds", DataType::DateMilliseconds, 8)
                .reversible(),
        );
        let twin = model.get_by_ident(REVERSE_PEN, 152).expect("twin present");
        assert_eq!(twin.name, "reverseFlowStartMilliseconds");
    }

    #[test]
    fn reverse_twin_enterprise_pen() {
        let mut model = InfoModel::new();
        model.add_element(InfoElement::new(9, 1, "ciscoThing", DataType::Uint32, 4).reversible());
        let twin = model.get_by_ident(9, 1 | 0x4000).expect("twin present");
        assert_eq!(twin.name, "reverseCiscoThing");
    }

    #[test]
    fn replace_on_ident_collision() {
        let mut model = InfoModel::new();
        model.add_element(InfoElement::new(0, 1, "a", DataType::Uint8, 1));
        model.add_element(InfoElement::new(0, 1, "b", DataType::Uint8, 1));
        assert!(model.get_by_name("a").is_none());
        assert_eq!(model.get_by_ident(0, 1).unwrap().name, "b");
    }

    #[test]
    fn alien_synthesis() {
        let mut model = InfoModel::new();
        assert!(!model.contains(999, 1));
        let ie = model.resolve_or_alien(999, 1, 4);
        assert!(ie.flags.alien);
        assert_eq!(ie.data_type, DataType::OctetArray);
        assert!(model.contains(999, 1));
    }
}
