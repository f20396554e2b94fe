use super::{Template, TemplateField, LIST_MEM_SIZE, VARFIELD_MEM_SIZE};
use crate::error::{Error, Result};
use crate::ie::{InfoElement, InfoModel, VARLEN};
use std::collections::HashMap;
use std::sync::Arc;

/// A field named by element name, with an optional length override and a
/// flags mask used for conditional inclusion (spec §4.2).
#[derive(Debug, Clone)]
pub struct FieldSpecifier {
    pub name: String,
    pub len_override: u16,
    pub flags: u32,
}

/// A field named by `(pen, id)`, with the same override/flags semantics
/// as [`FieldSpecifier`].
#[derive(Debug, Clone)]
pub struct IdentSpecifier {
    pub pen: u32,
    pub id: u16,
    pub len_override: u16,
    pub flags: u32,
}

/// Options controlling [`Template::copy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyOptions {
    pub strip_padding: bool,
    pub discard_scope: bool,
}

/// Mutable builder for a [`Template`]. Every mutator is available only
/// before [`TemplateBuilder::seal`] is called; once sealed into an
/// `Arc<Template>` the template is immutable (spec §4.2).
#[derive(Debug, Default)]
pub struct TemplateBuilder {
    fields: Vec<(Arc<InfoElement>, u16)>,
    scope_count: Option<u16>,
    strict_len: bool,
}

impl TemplateBuilder {
    pub fn new() -> Self {
        TemplateBuilder::default()
    }

    /// Opts into strict-length mode: subsequent fixed-length fields built
    /// via a zero `len_override` but whose element is fixed-length will
    /// fail if a caller also passes a non-default override later... this
    /// flag instead gates `append_by_specifier`'s `LaxSize` check.
    pub fn strict_length(mut self, strict: bool) -> Self {
        self.strict_len = strict;
        self
    }

    /// Used internally by `Template::copy` and tests: append a field
    /// whose element and length are already resolved.
    pub(crate) fn append_existing(&mut self, canon: Arc<InfoElement>, len: u16) {
        self.fields.push((canon, len));
    }

    /// Appends a field by example element, as done while decoding a
    /// template from the wire: the element is resolved (synthesizing an
    /// alien if unknown) and the caller-supplied wire length is validated
    /// against the element's data type.
    pub fn append_by_example_element(
        &mut self,
        model: &mut InfoModel,
        pen: u32,
        id: u16,
        len: u16,
    ) -> Result<()> {
        let ie = model.resolve_or_alien(pen, id, len);
        if !ie.flags.alien && !ie.data_type.validate_len(len) {
            return Err(Error::LaxSize {
                field: ie.name.clone(),
                len,
            });
        }
        self.fields.push((ie, len));
        Ok(())
    }

    /// Appends a field by name, honoring `wanted_flags`: the field is
    /// appended only if `(wanted_flags & spec.flags) == spec.flags` (a
    /// zero `spec.flags` always appends). Returns whether the field was
    /// appended.
    pub fn append_by_specifier(
        &mut self,
        model: &InfoModel,
        spec: &FieldSpecifier,
        wanted_flags: u32,
    ) -> Result<bool> {
        if spec.flags != 0 && (wanted_flags & spec.flags) != spec.flags {
            return Ok(false);
        }
        let ie = model
            .get_by_name(&spec.name)
            .ok_or(Error::UnknownElement { pen: 0, id: 0 })?;
        self.push_with_override(ie, spec.len_override)?;
        Ok(true)
    }

    /// As [`TemplateBuilder::append_by_specifier`] but identifies the
    /// element by `(pen, id)`.
    pub fn append_by_ident_specifier(
        &mut self,
        model: &InfoModel,
        spec: &IdentSpecifier,
        wanted_flags: u32,
    ) -> Result<bool> {
        if spec.flags != 0 && (wanted_flags & spec.flags) != spec.flags {
            return Ok(false);
        }
        let ie = model.require(spec.pen, spec.id)?;
        self.push_with_override(ie, spec.len_override)?;
        Ok(true)
    }

    fn push_with_override(&mut self, ie: Arc<InfoElement>, len_override: u16) -> Result<()> {
        let len = if len_override == 0 {
            ie.default_len
        } else {
            len_override
        };
        if len_override != 0 && self.strict_len && ie.data_type.natural_len().is_some() {
            if len != ie.default_len {
                return Err(Error::LaxSize {
                    field: ie.name.clone(),
                    len,
                });
            }
        }
        if !ie.data_type.validate_len(len) {
            return Err(Error::LaxSize {
                field: ie.name.clone(),
                len,
            });
        }
        self.fields.push((ie, len));
        Ok(())
    }

    /// Sets the options-template scope count. May be called at most once,
    /// and only before [`TemplateBuilder::seal`]. `0` means "all fields
    /// are scope".
    pub fn set_scope_count(&mut self, scope_count: u16) -> Result<()> {
        if self.scope_count.is_some() {
            return Err(Error::SetupError {
                message: "scope count already set".into(),
            });
        }
        if scope_count as usize > self.fields.len() && scope_count != 0 {
            return Err(Error::SetupError {
                message: "scope count exceeds field count".into(),
            });
        }
        self.scope_count = Some(scope_count);
        Ok(())
    }

    /// Computes derived quantities (wire/mem length, offsets, midx,
    /// structural flags, list position indexes) and returns the sealed,
    /// immutable [`Template`].
    pub fn seal(self) -> Arc<Template> {
        let scope_count = match self.scope_count {
            Some(0) => self.fields.len() as u16,
            Some(n) => n,
            None => 0,
        };

        let mut midx_counts: HashMap<(u32, u16), u16> = HashMap::new();
        let mut fields = Vec::with_capacity(self.fields.len());
        let mut offset: u16 = 0;
        let mut wire_fixed_len: u16 = 0;
        let mut record_len_for_decode: u16 = 0;
        let mut is_varlen = false;
        let mut contains_list = false;
        let mut basic_list_positions = Vec::new();
        let mut stl_positions = Vec::new();
        let mut stml_positions = Vec::new();

        for (pos, (canon, len)) in self.fields.into_iter().enumerate() {
            let key = (canon.pen, canon.id);
            let midx = *midx_counts
                .entry(key)
                .and_modify(|v| *v += 1)
                .or_insert(0);

            let field_mem_size = if canon.data_type.is_list() {
                contains_list = true;
                match canon.data_type {
                    crate::ie::DataType::BasicList => basic_list_positions.push(pos),
                    crate::ie::DataType::SubTemplateList => stl_positions.push(pos),
                    crate::ie::DataType::SubTemplateMultiList => stml_positions.push(pos),
                    _ => unreachable!(),
                }
                record_len_for_decode += 1;
                LIST_MEM_SIZE
            } else if len == VARLEN {
                is_varlen = true;
                record_len_for_decode += 1;
                VARFIELD_MEM_SIZE
            } else {
                wire_fixed_len += len;
                record_len_for_decode += len;
                len
            };

            fields.push(TemplateField {
                canon,
                len,
                offset,
                midx,
            });
            offset += field_mem_size;
        }

        Arc::new(Template {
            fields,
            scope_count,
            wire_fixed_len,
            mem_len: offset,
            record_len_for_decode,
            is_varlen,
            contains_list,
            basic_list_positions,
            stl_positions,
            stml_positions,
        })
    }
}
