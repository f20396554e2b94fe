//! RFC 5610 element-type options records and this crate's template-info
//! options records: the two "well-known" internal templates a `Session`
//! builds lazily, plus the conversions between their wire records and
//! [`InfoElement`]/[`TemplateInfo`] (spec §4.1 "supplemented", §3
//! "TemplateInfo").

use super::Session;
use crate::error::{Error, Result};
use crate::ie::{DataType, InfoElement, InfoModel, TEMPLATE_METADATA_PEN, VARLEN};
use crate::template::info::{parent, BasicListInfo};
use crate::template::{Template, TemplateBuilder, TemplateInfo};
use crate::value::{FieldValue, ListSemantic, Record, SubTemplateList};
use std::sync::Arc;

fn field(model: &InfoModel, pen: u32, id: u16) -> Result<Arc<InfoElement>> {
    model.require(pen, id)
}

/// Builds the RFC 5610 element-type options template: scope
/// `(privateEnterpriseNumber, informationElementId)`, followed by the
/// element's type, semantics, units, value range, name and description.
pub fn element_type_template(model: &InfoModel) -> Result<Arc<Template>> {
    let mut b = TemplateBuilder::new();
    b.append_existing(field(model, 0, 346)?, 4); // privateEnterpriseNumber
    b.append_existing(field(model, 0, 303)?, 2); // informationElementId
    b.set_scope_count(2)?;
    b.append_existing(field(model, 0, 339)?, 1); // informationElementDataType
    b.append_existing(field(model, 0, 344)?, 1); // informationElementSemantics
    b.append_existing(field(model, 0, 345)?, 2); // informationElementUnits
    b.append_existing(field(model, 0, 342)?, 8); // informationElementRangeBegin
    b.append_existing(field(model, 0, 343)?, 8); // informationElementRangeEnd
    b.append_existing(field(model, 0, 341)?, VARLEN); // informationElementName
    b.append_existing(field(model, 0, 340)?, VARLEN); // informationElementDescription
    Ok(b.seal())
}

/// The template naming one `basicList` used inside a template carrying
/// `TemplateInfo` (spec §3 `BasicListInfo`).
pub fn basic_list_info_template(model: &InfoModel) -> Result<Arc<Template>> {
    let mut b = TemplateBuilder::new();
    b.append_existing(field(model, TEMPLATE_METADATA_PEN, 7)?, 4); // basicListElementPen
    b.append_existing(field(model, TEMPLATE_METADATA_PEN, 8)?, 2); // basicListElementId
    b.append_existing(field(model, TEMPLATE_METADATA_PEN, 9)?, 4); // basicListContentPen
    b.append_existing(field(model, TEMPLATE_METADATA_PEN, 10)?, 2); // basicListContentId
    Ok(b.seal())
}

/// The template-info options template: scope `templateId`, followed by
/// name, description, app label, parent tid, and a `subTemplateList` of
/// `basicListInfo` entries (spec §3 "TemplateInfo").
pub fn template_info_template(model: &InfoModel) -> Result<Arc<Template>> {
    let mut b = TemplateBuilder::new();
    b.append_existing(field(model, TEMPLATE_METADATA_PEN, 1)?, 2); // templateId
    b.set_scope_count(1)?;
    b.append_existing(field(model, TEMPLATE_METADATA_PEN, 2)?, VARLEN); // templateName
    b.append_existing(field(model, TEMPLATE_METADATA_PEN, 3)?, VARLEN); // templateDescription
    b.append_existing(field(model, TEMPLATE_METADATA_PEN, 4)?, 4); // templateAppLabel
    b.append_existing(field(model, TEMPLATE_METADATA_PEN, 5)?, 2); // templateParentTid
    b.append_existing(field(model, TEMPLATE_METADATA_PEN, 6)?, VARLEN); // basicListInfo
    Ok(b.seal())
}

/// Builds an element-type options record describing `element`.
pub fn build_element_type_record(template: &Arc<Template>, element: &InfoElement) -> Record {
    Record::new(
        template.clone(),
        vec![
            FieldValue::Uint(element.pen as u64),
            FieldValue::Uint(element.id as u64),
            FieldValue::Uint(data_type_code(element.data_type) as u64),
            FieldValue::Uint(element.semantics as u64),
            FieldValue::Uint(element.units as u64),
            FieldValue::Uint(element.min),
            FieldValue::Uint(element.max),
            FieldValue::String(element.name.clone()),
            FieldValue::String(element.description.clone()),
        ],
    )
}

/// Recovers an [`InfoElement`] from a decoded element-type record.
pub fn parse_element_type_record(record: &Record) -> Option<InfoElement> {
    let pen = as_u32(record.get(0)?)?;
    let id = as_u16(record.get(1)?)?;
    let type_code = as_u8(record.get(2)?)?;
    let semantics = as_u8(record.get(3)?)?;
    let units = as_u16(record.get(4)?)?;
    let range_min = as_u64(record.get(5)?)?;
    let range_max = as_u64(record.get(6)?)?;
    let name = as_string(record.get(7)?)?;
    let description = as_string(record.get(8)?)?;
    let data_type = data_type_from_code(type_code)?;
    let default_len = data_type.natural_len().unwrap_or(VARLEN);
    Some(
        InfoElement::new(pen, id, name, data_type, default_len)
            .with_semantics(semantics)
            .with_units(units)
            .with_range(range_min, range_max)
            .with_description(description),
    )
}

/// Builds a template-info options record describing `info` for `tid`,
/// nesting a `subTemplateList` of `basicListInfo` entries.
pub fn build_template_info_record(
    template: &Arc<Template>,
    basic_list_info_tmpl: &Arc<Template>,
    tid: u16,
    info: &TemplateInfo,
) -> Record {
    let entries: Vec<Record> = info
        .basic_lists
        .iter()
        .map(|bl| {
            Record::new(
                basic_list_info_tmpl.clone(),
                vec![
                    FieldValue::Uint(bl.basic_list_pen as u64),
                    FieldValue::Uint(bl.basic_list_id as u64),
                    FieldValue::Uint(bl.content_pen as u64),
                    FieldValue::Uint(bl.content_id as u64),
                ],
            )
        })
        .collect();
    let list = SubTemplateList {
        semantic: ListSemantic::AllOf,
        template_id: 0,
        template: Some(basic_list_info_tmpl.clone()),
        records: entries,
    };
    Record::new(
        template.clone(),
        vec![
            FieldValue::Uint(tid as u64),
            FieldValue::String(info.name.clone()),
            FieldValue::String(info.description.clone().unwrap_or_default()),
            FieldValue::Uint(info.app_label.unwrap_or(0) as u64),
            FieldValue::Uint(info.parent_tid as u64),
            FieldValue::SubTemplateList(list),
        ],
    )
}

/// Recovers `(tid, TemplateInfo)` from a decoded template-info record.
pub fn parse_template_info_record(record: &Record) -> Option<(u16, TemplateInfo)> {
    let tid = as_u16(record.get(0)?)?;
    let name = as_string(record.get(1)?)?;
    let description = as_string(record.get(2)?)?;
    let app_label = as_u32(record.get(3)?)?;
    let parent_tid = as_u16(record.get(4)?)?;
    let basic_lists = match record.get(5)? {
        FieldValue::SubTemplateList(stl) => stl
            .records
            .iter()
            .filter_map(|r| {
                Some(BasicListInfo {
                    basic_list_pen: as_u32(r.get(0)?)?,
                    basic_list_id: as_u16(r.get(1)?)?,
                    content_pen: as_u32(r.get(2)?)?,
                    content_id: as_u16(r.get(3)?)?,
                })
            })
            .collect(),
        _ => Vec::new(),
    };
    let mut info = TemplateInfo::new(name).with_parent(parent_tid);
    if !description.is_empty() {
        info = info.with_description(description);
    }
    if app_label != 0 {
        info = info.with_app_label(app_label);
    }
    info.basic_lists = basic_lists;
    Some((tid, info))
}

fn data_type_code(dt: DataType) -> u8 {
    match dt {
        DataType::OctetArray => 0,
        DataType::Uint8 => 1,
        DataType::Uint16 => 2,
        DataType::Uint32 => 3,
        DataType::Uint64 => 4,
        DataType::Int8 => 5,
        DataType::Int16 => 6,
        DataType::Int32 => 7,
        DataType::Int64 => 8,
        DataType::Float32 => 9,
        DataType::Float64 => 10,
        DataType::Bool => 11,
        DataType::MacAddr => 12,
        DataType::String => 13,
        DataType::DateSeconds => 14,
        DataType::DateMilliseconds => 15,
        DataType::DateMicroseconds => 16,
        DataType::DateNanoseconds => 17,
        DataType::Ipv4Addr => 18,
        DataType::Ipv6Addr => 19,
        DataType::BasicList => 20,
        DataType::SubTemplateList => 21,
        DataType::SubTemplateMultiList => 22,
    }
}

fn data_type_from_code(code: u8) -> Option<DataType> {
    Some(match code {
        0 => DataType::OctetArray,
        1 => DataType::Uint8,
        2 => DataType::Uint16,
        3 => DataType::Uint32,
        4 => DataType::Uint64,
        5 => DataType::Int8,
        6 => DataType::Int16,
        7 => DataType::Int32,
        8 => DataType::Int64,
        9 => DataType::Float32,
        10 => DataType::Float64,
        11 => DataType::Bool,
        12 => DataType::MacAddr,
        13 => DataType::String,
        14 => DataType::DateSeconds,
        15 => DataType::DateMilliseconds,
        16 => DataType::DateMicroseconds,
        17 => DataType::DateNanoseconds,
        18 => DataType::Ipv4Addr,
        19 => DataType::Ipv6Addr,
        20 => DataType::BasicList,
        21 => DataType::SubTemplateList,
        22 => DataType::SubTemplateMultiList,
        _ => return None,
    })
}

fn as_u64(v: &FieldValue) -> Option<u64> {
    match v {
        FieldValue::Uint(n) => Some(*n),
        _ => None,
    }
}
fn as_u32(v: &FieldValue) -> Option<u32> {
    as_u64(v).map(|n| n as u32)
}
fn as_u16(v: &FieldValue) -> Option<u16> {
    as_u64(v).map(|n| n as u16)
}
fn as_u8(v: &FieldValue) -> Option<u8> {
    as_u64(v).map(|n| n as u8)
}
fn as_string(v: &FieldValue) -> Option<String> {
    match v {
        FieldValue::String(s) => Some(s.clone()),
        _ => None,
    }
}

impl Session {
    /// Lazily installs the RFC 5610 element-type reader template as an
    /// internal template, returning its tid. Idempotent.
    pub fn ensure_element_type_reader(&mut self) -> Result<u16> {
        if let Some(tid) = self.rfc5610_reader_tid {
            return Ok(tid);
        }
        let template = {
            let model = self.model().borrow();
            element_type_template(&model)?
        };
        let tid = self.next_free_internal_tid()?;
        self.internal_templates.insert(tid, template);
        self.rfc5610_reader_tid = Some(tid);
        Ok(tid)
    }

    /// Lazily installs the template-info reader template as an internal
    /// template, returning its tid. Idempotent.
    pub fn ensure_template_info_reader(&mut self) -> Result<u16> {
        if let Some(tid) = self.template_info_reader_tid {
            return Ok(tid);
        }
        let template = {
            let model = self.model().borrow();
            template_info_template(&model)?
        };
        let tid = self.next_free_internal_tid()?;
        self.internal_templates.insert(tid, template);
        self.template_info_reader_tid = Some(tid);
        Ok(tid)
    }

    /// Registers an information element described by a decoded element-
    /// type options record, when `config.auto_insert_element` is set
    /// (spec §4.1 "supplemented": RFC 5610 auto-learn).
    pub fn auto_ingest_element_type_record(&mut self, record: &Record) {
        if !self.config.auto_insert_element {
            return;
        }
        if let Some(element) = parse_element_type_record(record) {
            let pen = element.pen;
            let id = element.id;
            self.model.borrow_mut().add_element(element);
            self.metrics
                .elements_auto_learned
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            self.hooks
                .trigger(&super::TemplateEvent::ElementLearned { pen, id });
        }
    }

    /// Attaches `TemplateInfo` decoded from a template-info options
    /// record to the external template it names, in the current domain,
    /// when `config.auto_attach_metadata` is set.
    pub fn auto_ingest_template_info_record(&mut self, record: &Record) {
        if !self.config.auto_attach_metadata {
            return;
        }
        if let Some((tid, info)) = parse_template_info_record(record) {
            self.domains
                .entry(self.current_domain)
                .or_insert_with(super::DomainState::new)
                .template_info
                .insert(tid, info);
            self.hooks
                .trigger(&super::TemplateEvent::MetadataAttached { tid });
        }
    }

    /// Walks the `parent_tid` chain recorded in this domain's
    /// `TemplateInfo` table starting at `tid`, returning the path from
    /// `tid` up to (but not including) a top-level ancestor. Fails if an
    /// intermediate tid has no `TemplateInfo` attached.
    pub fn walk_template_path(&self, tid: u16) -> Result<Vec<u16>> {
        let mut path = vec![tid];
        let mut current = tid;
        loop {
            let info = self
                .domain()
                .and_then(|d| d.template_info.get(&current))
                .ok_or(Error::SetupError {
                    message: format!("tid {current} has no TemplateInfo attached"),
                })?;
            match info.parent_tid {
                parent::TOP_LEVEL | parent::NOT_APPLICABLE => break,
                parent::ANY_FIRST_LEVEL => break,
                next => {
                    if path.contains(&next) {
                        return Err(Error::SetupError {
                            message: format!("template parent cycle at tid {next}"),
                        });
                    }
                    path.push(next);
                    current = next;
                }
            }
        }
        Ok(path)
    }
}
