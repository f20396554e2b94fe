use super::{Template, TemplateField};
use crate::ie::DataType;

/// A `(pen, id)` pair used by "contains all" specifier checks.
pub type FieldIdent = (u32, u16);

impl Template {
    /// Returns the field at `position`, if any.
    pub fn field_at(&self, position: usize) -> Option<&TemplateField> {
        self.fields.get(position)
    }

    /// Finds the field matching `(pen, id)`, starting the search at
    /// `start` and additionally skipping `skip` further matches (so
    /// callers can enumerate repeated fields one at a time).
    pub fn find_by_element(&self, pen: u32, id: u16, start: usize, skip: usize) -> Option<usize> {
        self.fields
            .iter()
            .enumerate()
            .skip(start)
            .filter(|(_, f)| f.pen() == pen && f.id() == id)
            .nth(skip)
            .map(|(i, _)| i)
    }

    /// Finds the field whose data type is `data_type`, with the same
    /// start/skip semantics as [`Template::find_by_element`].
    pub fn find_by_data_type(&self, data_type: DataType, start: usize, skip: usize) -> Option<usize> {
        self.fields
            .iter()
            .enumerate()
            .skip(start)
            .filter(|(_, f)| f.canon.data_type == data_type)
            .nth(skip)
            .map(|(i, _)| i)
    }

    /// True if every ident in `idents` appears somewhere in this
    /// template's fields (spec §4.2 "contains all" tests).
    pub fn contains_all(&self, idents: &[FieldIdent]) -> bool {
        idents
            .iter()
            .all(|(pen, id)| self.find_by_element(*pen, *id, 0, 0).is_some())
    }

    /// Resolves the internal field matching an external field by
    /// `(pen, id, midx)` — the matching rule the transcoder uses for
    /// every external field when appending a record (spec §4.4 step 3).
    pub fn find_by_ident_midx(&self, pen: u32, id: u16, midx: u16) -> Option<usize> {
        self.fields
            .iter()
            .position(|f| f.pen() == pen && f.id() == id && f.midx == midx)
    }
}
