//! RFC 6313 structured data types: recursive encode/decode for
//! `basicList`, `subTemplateList`, and `subTemplateMultiList` (spec §4.4
//! "List transcoding").

use super::transcode::{decode_value, encode_value, read_fixed_or_varlen, read_varlen, write_varlen};
use crate::error::{Error, Result};
use crate::session::{PairResolution, Session};
use crate::template::Template;
use crate::value::{
    BasicList, FieldValue, ListSemantic, Record, SubTemplateList, SubTemplateMultiList,
    SubTemplateMultiListEntry,
};
use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u32, be_u8};
use std::sync::Arc;

const ENTERPRISE_BIT: u16 = 0x8000;

fn to_malformed(context: &str) -> Error {
    Error::MalformedMessage {
        context: context.to_string(),
        sample: Vec::new(),
    }
}

/// Builds the decoded values for one record of `template` by reading its
/// fields in order, recursing into nested lists via the owning Session's
/// model and template-pair table.
pub fn decode_record_fields<'a>(
    mut input: &'a [u8],
    template: &Arc<Template>,
    session: &mut Session,
) -> Result<(&'a [u8], Vec<FieldValue>)> {
    if input.len() < template.record_len_for_decode as usize {
        return Err(to_malformed("remaining bytes shorter than the template's minimum record length"));
    }
    let mut values = Vec::with_capacity(template.fields.len());
    for field in &template.fields {
        let value = if field.canon.data_type.is_list() {
            let (rest, v) = decode_list_field(input, field.canon.data_type, session)?;
            input = rest;
            v
        } else {
            let (rest, v) = decode_value(input, field.canon.as_ref(), field.len)
                .map_err(|_| to_malformed(&format!("truncated field {}", field.canon.name)))?;
            input = rest;
            v
        };
        values.push(value);
    }
    Ok((input, values))
}

fn decode_list_field<'a>(
    input: &'a [u8],
    dt: crate::ie::DataType,
    session: &mut Session,
) -> Result<(&'a [u8], FieldValue)> {
    let (input, content) = read_varlen(input).map_err(|_| to_malformed("truncated list field"))?;
    match dt {
        crate::ie::DataType::BasicList => {
            let bl = decode_basic_list(content, session)?;
            Ok((input, FieldValue::BasicList(bl)))
        }
        crate::ie::DataType::SubTemplateList => {
            let stl = decode_sub_template_list(content, session)?;
            Ok((input, FieldValue::SubTemplateList(stl)))
        }
        crate::ie::DataType::SubTemplateMultiList => {
            let stml = decode_sub_template_multi_list(content, session)?;
            Ok((input, FieldValue::SubTemplateMultiList(stml)))
        }
        _ => unreachable!("only list data types reach decode_list_field"),
    }
}

/// Resolves which internal template (if any) a record nested under
/// `ext_tid` should be transcoded into, per the template-pair rules
/// (spec §4.3).
fn resolve_internal<'a>(session: &'a Session, ext_tid: u16) -> Option<Arc<Template>> {
    match session.resolve_pair(ext_tid) {
        PairResolution::Drop => None,
        PairResolution::UseExternalAsInternal => session.external_template(ext_tid).cloned(),
        PairResolution::UseInternal(tid) => session.internal_template(tid).cloned(),
    }
}

/// Remaps `external_values` (decoded against `external`) into the field
/// order of `internal`, matching by `(pen, id, midx)` and filling
/// unmatched internal fields with [`FieldValue::Absent`] (spec §4.4
/// step 3).
pub fn remap_values(
    external: &Template,
    external_values: &[FieldValue],
    internal: &Template,
) -> Vec<FieldValue> {
    internal
        .fields
        .iter()
        .map(|f| {
            external
                .find_by_ident_midx(f.pen(), f.id(), f.midx)
                .and_then(|pos| external_values.get(pos))
                .cloned()
                .unwrap_or(FieldValue::Absent)
        })
        .collect()
}

fn decode_basic_list(content: &[u8], session: &mut Session) -> Result<BasicList> {
    let (rest, semantic) = be_u8::<_, nom::error::Error<&[u8]>>(content)
        .map_err(|_| to_malformed("truncated basicList header"))?;
    let (rest, raw_id) = be_u16::<_, nom::error::Error<&[u8]>>(rest)
        .map_err(|_| to_malformed("truncated basicList header"))?;
    let (rest, element_len) = be_u16::<_, nom::error::Error<&[u8]>>(rest)
        .map_err(|_| to_malformed("truncated basicList header"))?;
    let enterprise = raw_id & ENTERPRISE_BIT != 0;
    let id = raw_id & !ENTERPRISE_BIT;
    let (mut rest, pen) = if enterprise {
        let (r, pen) = be_u32::<_, nom::error::Error<&[u8]>>(rest)
            .map_err(|_| to_malformed("truncated basicList pen"))?;
        (r, pen)
    } else {
        (rest, 0u32)
    };

    let element = session.model().borrow_mut().resolve_or_alien(pen, id, element_len);
    let mut values = Vec::new();
    while !rest.is_empty() {
        let (r, bytes) = read_fixed_or_varlen(rest, element_len)
            .map_err(|_| to_malformed("truncated basicList element"))?;
        let (_, value) = decode_value(bytes, element.as_ref(), bytes.len() as u16)
            .map_err(|_| to_malformed("malformed basicList element"))?;
        values.push(value);
        rest = r;
    }

    Ok(BasicList {
        semantic: ListSemantic::from_wire(semantic),
        element,
        element_len,
        values,
    })
}

fn decode_sub_template_list(content: &[u8], session: &mut Session) -> Result<SubTemplateList> {
    if content.is_empty() {
        return Ok(SubTemplateList {
            semantic: ListSemantic::AllOf,
            template_id: 0,
            template: None,
            records: Vec::new(),
        });
    }
    let (rest, semantic) = be_u8::<_, nom::error::Error<&[u8]>>(content)
        .map_err(|_| to_malformed("truncated subTemplateList header"))?;
    let (mut rest, tid) = be_u16::<_, nom::error::Error<&[u8]>>(rest)
        .map_err(|_| to_malformed("truncated subTemplateList header"))?;

    let external = session.external_template(tid).cloned();
    let internal = resolve_internal(session, tid);

    let mut records = Vec::new();
    if let (Some(external), Some(internal)) = (&external, &internal) {
        while !rest.is_empty() {
            let (r, ext_values) = decode_record_fields(rest, external, session)?;
            rest = r;
            let values = if Arc::ptr_eq(external, internal) {
                ext_values
            } else {
                remap_values(external, &ext_values, internal)
            };
            records.push(Record::new(internal.clone(), values));
        }
    }

    Ok(SubTemplateList {
        semantic: ListSemantic::from_wire(semantic),
        template_id: tid,
        template: internal,
        records,
    })
}

fn decode_sub_template_multi_list(
    content: &[u8],
    session: &mut Session,
) -> Result<SubTemplateMultiList> {
    let (mut rest, semantic) = be_u8::<_, nom::error::Error<&[u8]>>(content)
        .map_err(|_| to_malformed("truncated subTemplateMultiList header"))?;

    let mut entries = Vec::new();
    while !rest.is_empty() {
        let (r, tid) = be_u16::<_, nom::error::Error<&[u8]>>(rest)
            .map_err(|_| to_malformed("truncated subTemplateMultiList entry header"))?;
        let (r, entry_len) = be_u16::<_, nom::error::Error<&[u8]>>(r)
            .map_err(|_| to_malformed("truncated subTemplateMultiList entry header"))?;
        let (r, entry_bytes) =
            take::<_, _, nom::error::Error<&[u8]>>(entry_len as usize)(r)
                .map_err(|_| to_malformed("truncated subTemplateMultiList entry"))?;
        rest = r;

        let external = session.external_template(tid).cloned();
        let internal = resolve_internal(session, tid);
        let mut records = Vec::new();
        let mut entry_input = entry_bytes;
        if let (Some(external), Some(internal)) = (&external, &internal) {
            while !entry_input.is_empty() {
                let (ri, ext_values) = decode_record_fields(entry_input, external, session)?;
                entry_input = ri;
                let values = if Arc::ptr_eq(external, internal) {
                    ext_values
                } else {
                    remap_values(external, &ext_values, internal)
                };
                records.push(Record::new(internal.clone(), values));
            }
        }

        entries.push(SubTemplateMultiListEntry {
            template_id: tid,
            template: internal,
            records,
        });
    }

    Ok(SubTemplateMultiList {
        semantic: ListSemantic::from_wire(semantic),
        entries,
    })
}

/// Encodes one record's values against its own template's field list
/// (nested list records carry their layout directly; there is no
/// separate internal/external remapping on the export side).
pub fn encode_record_fields(buf: &mut Vec<u8>, record: &Record) -> Result<()> {
    for (pos, field) in record.template.fields.iter().enumerate() {
        let value = record.values.get(pos);
        if field.canon.data_type.is_list() {
            match value {
                Some(FieldValue::BasicList(bl)) => encode_basic_list(buf, bl)?,
                Some(FieldValue::SubTemplateList(stl)) => encode_sub_template_list(buf, stl)?,
                Some(FieldValue::SubTemplateMultiList(stml)) => {
                    encode_sub_template_multi_list(buf, stml)?
                }
                _ => write_varlen(buf, &[]),
            }
        } else {
            super::transcode::encode_scalar(buf, field, value)?;
        }
    }
    Ok(())
}

pub fn encode_basic_list(buf: &mut Vec<u8>, bl: &BasicList) -> Result<()> {
    let mut content = Vec::new();
    content.push(bl.semantic.to_wire());
    let enterprise = bl.element.pen != 0;
    let mut id = bl.element.id;
    if enterprise {
        id |= ENTERPRISE_BIT;
    }
    content.extend_from_slice(&id.to_be_bytes());
    content.extend_from_slice(&bl.element_len.to_be_bytes());
    if enterprise {
        content.extend_from_slice(&bl.element.pen.to_be_bytes());
    }
    for value in &bl.values {
        if bl.element.data_type.is_varlen_capable() && bl.element_len == crate::ie::VARLEN {
            encode_varlen_value(&mut content, bl.element.data_type, value)?;
        } else {
            encode_value(&mut content, bl.element.data_type, bl.element_len, value)?;
        }
    }
    write_varlen(buf, &content);
    Ok(())
}

fn encode_varlen_value(buf: &mut Vec<u8>, dt: crate::ie::DataType, value: &FieldValue) -> Result<()> {
    let bytes: Vec<u8> = match (dt, value) {
        (crate::ie::DataType::String, FieldValue::String(s)) => s.as_bytes().to_vec(),
        (crate::ie::DataType::OctetArray, FieldValue::OctetArray(b)) => b.clone(),
        _ => Vec::new(),
    };
    write_varlen(buf, &bytes);
    Ok(())
}

fn encode_sub_template_list(buf: &mut Vec<u8>, stl: &SubTemplateList) -> Result<()> {
    let mut content = Vec::new();
    content.push(stl.semantic.to_wire());
    content.extend_from_slice(&stl.template_id.to_be_bytes());
    for record in &stl.records {
        encode_record_fields(&mut content, record)?;
    }
    write_varlen(buf, &content);
    Ok(())
}

fn encode_sub_template_multi_list(buf: &mut Vec<u8>, stml: &SubTemplateMultiList) -> Result<()> {
    let mut content = Vec::new();
    content.push(stml.semantic.to_wire());
    for entry in &stml.entries {
        let mut entry_buf = Vec::new();
        for record in &entry.records {
            encode_record_fields(&mut entry_buf, record)?;
        }
        content.extend_from_slice(&entry.template_id.to_be_bytes());
        content.extend_from_slice(&(entry_buf.len() as u16).to_be_bytes());
        content.extend_from_slice(&entry_buf);
    }
    write_varlen(buf, &content);
    Ok(())
}
