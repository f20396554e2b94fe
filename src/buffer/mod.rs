//! The message buffer and transcoder: IPFIX message/set framing, the
//! append-record and read-record algorithms, and the "automatic next
//! message" policy (spec §3 "Buffer", §4.4).

pub mod lists;
pub mod transcode;

use crate::error::{Error, Result};
use crate::ie::InfoElement;
use crate::session::{self, Session};
use crate::template::{Template, TemplateBuilder};
use crate::transport::{CollectTransport, ExportTransport, MAX_MESSAGE_LEN};
use crate::value::{FieldValue, Record};
use log::{debug, trace, warn};
use nom::number::complete::{be_u16, be_u32};
use std::sync::Arc;

const IPFIX_VERSION: u16 = 10;
const MESSAGE_HEADER_LEN: usize = 16;
const SET_HEADER_LEN: usize = 4;
const TEMPLATE_SET_ID: u16 = 2;
const OPTIONS_TEMPLATE_SET_ID: u16 = 3;
const DATA_SET_MIN_ID: u16 = 256;
const ENTERPRISE_BIT: u16 = 0x8000;

type NomErr<'a> = nom::error::Error<&'a [u8]>;

fn malformed(context: &str, sample: &[u8]) -> Error {
    Error::MalformedMessage {
        context: context.to_string(),
        sample: sample.iter().take(16).copied().collect(),
    }
}

struct DataSetCursor {
    ext_tid: u16,
    end: usize,
}

/// Single-threaded codec state bound to one [`Session`] and exactly one
/// transport direction (spec §3 "Buffer"; §5 "single-threaded
/// cooperative").
pub struct Buffer {
    pub session: Session,
    export_transport: Option<Box<dyn ExportTransport>>,
    collect_transport: Option<Box<dyn CollectTransport>>,

    write_buf: Vec<u8>,
    open_set_pos: Option<usize>,
    open_set_id: Option<u16>,
    pending_records: u32,
    export_time_secs: u32,

    read_buf: Box<[u8; MAX_MESSAGE_LEN]>,
    read_len: usize,
    read_cursor: usize,
    data_set: Option<DataSetCursor>,

    internal_tid: Option<u16>,
    external_tid: Option<u16>,

    element_type_shape: Option<Arc<Template>>,
    template_info_shape: Option<Arc<Template>>,

    element_type_export_tid: Option<u16>,
    template_info_export_tid: Option<u16>,
}

impl Buffer {
    fn new(session: Session) -> Self {
        Buffer {
            session,
            export_transport: None,
            collect_transport: None,
            write_buf: Vec::new(),
            open_set_pos: None,
            open_set_id: None,
            pending_records: 0,
            export_time_secs: 0,
            read_buf: Box::new([0u8; MAX_MESSAGE_LEN]),
            read_len: 0,
            read_cursor: 0,
            data_set: None,
            internal_tid: None,
            external_tid: None,
            element_type_shape: None,
            template_info_shape: None,
            element_type_export_tid: None,
            template_info_export_tid: None,
        }
    }

    pub fn for_export(session: Session, transport: impl ExportTransport + 'static) -> Self {
        let mut buffer = Buffer::new(session);
        buffer.export_transport = Some(Box::new(transport));
        buffer
    }

    pub fn for_collect(session: Session, transport: impl CollectTransport + 'static) -> Self {
        let mut buffer = Buffer::new(session);
        buffer.collect_transport = Some(Box::new(transport));
        buffer
    }

    pub fn set_export_time(&mut self, unix_secs: u32) {
        self.export_time_secs = unix_secs;
    }

    pub fn set_internal_template(&mut self, tid: u16) {
        self.internal_tid = Some(tid);
    }

    pub fn set_external_template(&mut self, tid: u16) {
        self.external_tid = Some(tid);
    }

    fn element_type_shape(&mut self) -> Result<Arc<Template>> {
        if let Some(t) = &self.element_type_shape {
            return Ok(t.clone());
        }
        let tid = self.session.ensure_element_type_reader()?;
        let t = self
            .session
            .internal_template(tid)
            .expect("just installed")
            .clone();
        self.element_type_shape = Some(t.clone());
        Ok(t)
    }

    fn template_info_shape(&mut self) -> Result<Arc<Template>> {
        if let Some(t) = &self.template_info_shape {
            return Ok(t.clone());
        }
        let tid = self.session.ensure_template_info_reader()?;
        let t = self
            .session
            .internal_template(tid)
            .expect("just installed")
            .clone();
        self.template_info_shape = Some(t.clone());
        Ok(t)
    }

    // ---- writing -----------------------------------------------------

    fn ensure_message_open(&mut self) {
        if self.write_buf.is_empty() {
            self.write_buf.resize(MESSAGE_HEADER_LEN, 0);
        }
    }

    fn close_open_set(&mut self) {
        if let Some(pos) = self.open_set_pos.take() {
            let len = (self.write_buf.len() - pos) as u16;
            self.write_buf[pos + 2..pos + 4].copy_from_slice(&len.to_be_bytes());
        }
        self.open_set_id = None;
    }

    /// Appends the internal record transcoded into the buffer's current
    /// external template, opening a new set or emitting the current
    /// message as needed (spec §4.4 "Appending a record").
    pub fn append_record(&mut self, record: &Record) -> Result<()> {
        if self.export_transport.is_none() {
            return Err(Error::SetupError {
                message: "append_record called on a non-exporting Buffer".into(),
            });
        }
        let internal_tid = self.internal_tid.ok_or(Error::SetupError {
            message: "no internal template set on buffer".into(),
        })?;
        let external_tid = self.external_tid.ok_or(Error::SetupError {
            message: "no external template set on buffer".into(),
        })?;
        let internal = self
            .session
            .internal_template(internal_tid)
            .cloned()
            .ok_or(Error::TemplateNotFound {
                template_id: internal_tid,
            })?;
        let external = self
            .session
            .external_template(external_tid)
            .cloned()
            .ok_or(Error::TemplateNotFound {
                template_id: external_tid,
            })?;

        let mut record_bytes = Vec::new();
        transcode_to_external(&mut record_bytes, &external, &internal, &record.values)?;

        self.ensure_message_open();
        let need_new_set = self.open_set_id != Some(external_tid);
        if need_new_set {
            self.close_open_set();
        }
        let projected_len = self.write_buf.len()
            + if need_new_set { SET_HEADER_LEN } else { 0 }
            + record_bytes.len();
        if projected_len > MAX_MESSAGE_LEN {
            if !self.session.config.auto_next_message {
                return Err(Error::EndOfMessage);
            }
            self.emit_message()?;
            self.ensure_message_open();
        }

        if self.open_set_id != Some(external_tid) {
            self.open_set_pos = Some(self.write_buf.len());
            self.write_buf.extend_from_slice(&external_tid.to_be_bytes());
            self.write_buf.extend_from_slice(&0u16.to_be_bytes());
            self.open_set_id = Some(external_tid);
        }
        self.write_buf.extend_from_slice(&record_bytes);
        self.pending_records += 1;
        self.session
            .metrics
            .records_encoded
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(())
    }

    /// Writes a template-set (or options-template-set, per the
    /// template's scope count) record for the external template at `tid`
    /// in the current domain, opening its own set distinct from any
    /// in-progress data set (spec §4.4 "appending a record"'s wire-format
    /// companion: set id 2/3, the mirror of [`Buffer::install_template_set`]).
    ///
    /// When enabled, also emits an RFC 5610 element-type record for each
    /// non-standard IE the template uses, and a template-info record for
    /// the template itself, both ahead of the template set proper (spec
    /// §4.3 step 4, §4.5).
    pub fn append_template(&mut self, tid: u16) -> Result<()> {
        self.append_template_impl(tid, true)
    }

    fn append_template_impl(&mut self, tid: u16, emit_metadata: bool) -> Result<()> {
        let template = self
            .session
            .external_template(tid)
            .cloned()
            .ok_or(Error::TemplateNotFound { template_id: tid })?;

        if emit_metadata {
            if self.session.config.export_rfc5610_elements {
                self.export_element_type_records(&template)?;
            }
            if self.session.config.export_template_metadata {
                self.export_template_info_record(tid)?;
            }
        }

        let mut record = Vec::new();
        record.extend_from_slice(&tid.to_be_bytes());
        record.extend_from_slice(&(template.fields.len() as u16).to_be_bytes());
        if template.is_options_template() {
            record.extend_from_slice(&template.scope_count.to_be_bytes());
        }
        for field in &template.fields {
            let enterprise = field.pen() != 0;
            let mut raw_id = field.id();
            if enterprise {
                raw_id |= ENTERPRISE_BIT;
            }
            record.extend_from_slice(&raw_id.to_be_bytes());
            record.extend_from_slice(&field.len.to_be_bytes());
            if enterprise {
                record.extend_from_slice(&field.pen().to_be_bytes());
            }
        }
        let set_id = if template.is_options_template() {
            OPTIONS_TEMPLATE_SET_ID
        } else {
            TEMPLATE_SET_ID
        };
        self.write_template_record(set_id, &record)?;
        debug!("template {tid} exported ({} fields)", template.fields.len());
        Ok(())
    }

    /// Writes a template withdrawal record (a template-set record with a
    /// zero field count) for `tid`, the wire-format counterpart of
    /// [`Session::remove_external_template`] (spec §4.4 step 2 "a
    /// template set with a zero record-length field is a template
    /// withdrawal").
    pub fn append_template_withdrawal(&mut self, tid: u16) -> Result<()> {
        let mut record = Vec::new();
        record.extend_from_slice(&tid.to_be_bytes());
        record.extend_from_slice(&0u16.to_be_bytes());
        self.write_template_record(TEMPLATE_SET_ID, &record)?;
        debug!("template withdrawal for tid {tid} exported");
        Ok(())
    }

    /// Lazily adds the RFC 5610 element-type template for export (both
    /// external and internal, at one tid) and emits its template set once,
    /// returning that tid and the template shape subsequent records are
    /// built against.
    fn ensure_element_type_export(&mut self) -> Result<(u16, Arc<Template>)> {
        if let Some(tid) = self.element_type_export_tid {
            let shape = self
                .session
                .external_template(tid)
                .cloned()
                .ok_or(Error::TemplateNotFound { template_id: tid })?;
            return Ok((tid, shape));
        }
        let template = {
            let model = self.session.model().borrow();
            session::metadata::element_type_template(&model)?
        };
        let outcome = self.session.add_for_export(template.clone(), None)?;
        self.element_type_export_tid = Some(outcome.tid);
        self.append_template_impl(outcome.tid, false)?;
        Ok((outcome.tid, template))
    }

    /// As [`Buffer::ensure_element_type_export`] for the template-info
    /// template.
    fn ensure_template_info_export(&mut self) -> Result<(u16, Arc<Template>)> {
        if let Some(tid) = self.template_info_export_tid {
            let shape = self
                .session
                .external_template(tid)
                .cloned()
                .ok_or(Error::TemplateNotFound { template_id: tid })?;
            return Ok((tid, shape));
        }
        let template = {
            let model = self.session.model().borrow();
            session::metadata::template_info_template(&model)?
        };
        let outcome = self.session.add_for_export(template.clone(), None)?;
        self.template_info_export_tid = Some(outcome.tid);
        self.append_template_impl(outcome.tid, false)?;
        Ok((outcome.tid, template))
    }

    /// Writes `record` (already laid out against `shape`) as a data
    /// record in the data set for `tid`, the options-record counterpart
    /// of [`Buffer::append_record`] for the metadata templates, which are
    /// never looked up as a Session's `internal_tid`/`external_tid`.
    fn write_metadata_record(&mut self, tid: u16, shape: &Arc<Template>, record: &Record) -> Result<()> {
        let mut bytes = Vec::new();
        transcode_to_external(&mut bytes, shape, shape, &record.values)?;
        self.write_template_record(tid, &bytes)
    }

    /// Emits one RFC 5610 element-type record for each distinct
    /// non-standard (enterprise) IE `template` uses, ahead of `template`'s
    /// own template set (spec §4.3 step 4: "emitted... once per
    /// non-standard IE before the normal template set on each template
    /// export").
    fn export_element_type_records(&mut self, template: &Arc<Template>) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        let elements: Vec<Arc<InfoElement>> = template
            .fields
            .iter()
            .filter(|f| f.pen() != 0 && seen.insert((f.pen(), f.id())))
            .map(|f| f.canon.clone())
            .collect();
        if elements.is_empty() {
            return Ok(());
        }
        let (tid, shape) = self.ensure_element_type_export()?;
        for element in &elements {
            let record = session::metadata::build_element_type_record(&shape, element);
            self.write_metadata_record(tid, &shape, &record)?;
        }
        Ok(())
    }

    /// Emits a template-info record for `tid`'s attached `TemplateInfo`,
    /// if any (spec §4.5: "emitted... whenever the associated template is
    /// exported").
    fn export_template_info_record(&mut self, tid: u16) -> Result<()> {
        let Some(info) = self.session.template_info(tid).cloned() else {
            return Ok(());
        };
        let basic_list_shape = {
            let model = self.session.model().borrow();
            session::metadata::basic_list_info_template(&model)?
        };
        let (info_tid, shape) = self.ensure_template_info_export()?;
        let record = session::metadata::build_template_info_record(&shape, &basic_list_shape, tid, &info);
        self.write_metadata_record(info_tid, &shape, &record)
    }

    fn write_template_record(&mut self, set_id: u16, record: &[u8]) -> Result<()> {
        if self.export_transport.is_none() {
            return Err(Error::SetupError {
                message: "append_template called on a non-exporting Buffer".into(),
            });
        }
        self.ensure_message_open();
        let need_new_set = self.open_set_id != Some(set_id);
        if need_new_set {
            self.close_open_set();
        }
        let projected_len = self.write_buf.len()
            + if need_new_set { SET_HEADER_LEN } else { 0 }
            + record.len();
        if projected_len > MAX_MESSAGE_LEN {
            if !self.session.config.auto_next_message {
                return Err(Error::EndOfMessage);
            }
            self.emit_message()?;
            self.ensure_message_open();
        }
        if self.open_set_id != Some(set_id) {
            self.open_set_pos = Some(self.write_buf.len());
            self.write_buf.extend_from_slice(&set_id.to_be_bytes());
            self.write_buf.extend_from_slice(&0u16.to_be_bytes());
            self.open_set_id = Some(set_id);
        }
        self.write_buf.extend_from_slice(record);
        Ok(())
    }

    /// Finalizes the open set and message, writes it to the transport,
    /// and advances the session's sequence number by the number of data
    /// records emitted (spec §4.4 "Emitting a message").
    pub fn emit_message(&mut self) -> Result<()> {
        if self.export_transport.is_none() {
            return Err(Error::SetupError {
                message: "emit_message called on a non-exporting Buffer".into(),
            });
        }
        if self.write_buf.is_empty() {
            return Ok(());
        }
        self.close_open_set();
        let total_len = self.write_buf.len() as u16;
        self.write_buf[0..2].copy_from_slice(&IPFIX_VERSION.to_be_bytes());
        self.write_buf[2..4].copy_from_slice(&total_len.to_be_bytes());
        self.write_buf[4..8].copy_from_slice(&self.export_time_secs.to_be_bytes());
        self.write_buf[8..12].copy_from_slice(&self.session.sequence().to_be_bytes());
        self.write_buf[12..16].copy_from_slice(&self.session.current_domain().to_be_bytes());

        // Taken out and restored (rather than held as a live borrow across
        // the self-field writes above) so the write call doesn't conflict
        // with the rest of this method needing whole-`self` access.
        let mut transport = self.export_transport.take().expect("checked above");
        let sent = transport.write_message(&self.write_buf);
        self.export_transport = Some(transport);
        sent?;

        trace!(
            "emitted message: {total_len} octets, {} records, sequence now {}",
            self.pending_records,
            self.session.sequence().wrapping_add(self.pending_records)
        );
        self.session.advance_sequence(self.pending_records);
        self.write_buf.clear();
        self.open_set_pos = None;
        self.open_set_id = None;
        self.pending_records = 0;
        Ok(())
    }

    // ---- reading -------------------------------------------------------

    fn load_next_message(&mut self) -> Result<()> {
        let Some(transport) = self.collect_transport.as_mut() else {
            return Err(Error::SetupError {
                message: "next_record called on a non-collecting Buffer".into(),
            });
        };
        let len = transport.read_message(&mut self.read_buf)?;
        if len < MESSAGE_HEADER_LEN {
            return Err(malformed("message shorter than header", &self.read_buf[..len]));
        }
        let (_, version) =
            be_u16::<_, NomErr>(&self.read_buf[0..2]).map_err(|_| malformed("header", &[]))?;
        let (_, total_len) =
            be_u16::<_, NomErr>(&self.read_buf[2..4]).map_err(|_| malformed("header", &[]))?;
        let (_, domain) =
            be_u32::<_, NomErr>(&self.read_buf[12..16]).map_err(|_| malformed("header", &[]))?;
        if version != IPFIX_VERSION {
            return Err(malformed("unexpected message version", &self.read_buf[..4]));
        }
        if total_len as usize != len || !(MESSAGE_HEADER_LEN..=MAX_MESSAGE_LEN).contains(&(total_len as usize)) {
            return Err(malformed("inconsistent message length", &self.read_buf[..4]));
        }
        self.session.set_current_domain(domain);
        self.read_len = len;
        self.read_cursor = MESSAGE_HEADER_LEN;
        self.data_set = None;
        trace!("loaded message: {len} octets, domain {domain}");
        Ok(())
    }

    /// Feeds raw octets into the bound collector in disconnected mode
    /// (spec §6 "disconnected" mode); a no-op for a collector that has no
    /// pending-byte buffer of its own.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<()> {
        let transport = self.collect_transport.as_mut().ok_or(Error::SetupError {
            message: "feed called on a non-collecting Buffer".into(),
        })?;
        transport.feed(bytes);
        Ok(())
    }

    fn install_template_set(&mut self, body: &[u8], options: bool) -> Result<()> {
        let mut rest = body;
        while rest.len() >= 4 {
            let (r, tid) = be_u16::<_, NomErr>(rest).map_err(|_| malformed("template record", rest))?;
            let (r, field_count) =
                be_u16::<_, NomErr>(r).map_err(|_| malformed("template record", rest))?;
            rest = r;
            if field_count == 0 {
                debug!("template withdrawal record for tid {tid}");
                self.session.remove_external_template(tid);
                continue;
            }
            let scope_count = if options {
                if rest.len() < 2 {
                    return Err(malformed("options template record", rest));
                }
                let (r, scope_count) =
                    be_u16::<_, NomErr>(rest).map_err(|_| malformed("options template record", rest))?;
                rest = r;
                scope_count
            } else {
                0
            };

            let mut builder = TemplateBuilder::new();
            for _ in 0..field_count {
                if rest.len() < 4 {
                    return Err(malformed("template field specifier", rest));
                }
                let (r, raw_id) =
                    be_u16::<_, NomErr>(rest).map_err(|_| malformed("template field", rest))?;
                let (r, len) = be_u16::<_, NomErr>(r).map_err(|_| malformed("template field", rest))?;
                let enterprise = raw_id & ENTERPRISE_BIT != 0;
                let id = raw_id & !ENTERPRISE_BIT;
                let (r, pen) = if enterprise {
                    if r.len() < 4 {
                        return Err(malformed("enterprise template field pen", rest));
                    }
                    be_u32::<_, NomErr>(r).map_err(|_| malformed("template field pen", rest))?
                } else {
                    (r, 0u32)
                };
                rest = r;
                {
                    let mut model = self.session.model().borrow_mut();
                    builder.append_by_example_element(&mut model, pen, id, len)?;
                }
            }
            if options && scope_count > 0 {
                builder.set_scope_count(scope_count)?;
            }
            let template = builder.seal();
            self.session.install_decoded_template(tid, template);
        }
        Ok(())
    }

    fn template_matches_shape(candidate: &Template, shape: &Template) -> bool {
        candidate.fields.len() == shape.fields.len()
            && candidate
                .fields
                .iter()
                .zip(shape.fields.iter())
                .all(|(a, b)| a.pen() == b.pen() && a.id() == b.id())
    }

    /// Reads (recursing across messages under automatic-next-message
    /// mode) until it can return the next decoded data record, skipping
    /// sets for templates the session has not learned and transparently
    /// consuming recognized RFC 5610 / template-info options records
    /// (spec §4.4 "Reading a record").
    pub fn next_record(&mut self) -> Result<Record> {
        loop {
            if let Some(ds) = &self.data_set {
                if self.read_cursor < ds.end {
                    let ext_tid = ds.ext_tid;
                    let external = self
                        .session
                        .external_template(ext_tid)
                        .cloned()
                        .ok_or(Error::TemplateNotFound { template_id: ext_tid })?;
                    let (rest, ext_values) = lists::decode_record_fields(
                        &self.read_buf[self.read_cursor..ds.end],
                        &external,
                        &mut self.session,
                    )?;
                    let consumed = (ds.end - self.read_cursor) - rest.len();
                    self.read_cursor += consumed;
                    if self.read_cursor >= ds.end {
                        self.data_set = None;
                    }

                    self.session
                        .metrics
                        .records_decoded
                        .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

                    if self.session.config.auto_insert_element {
                        let shape = self.element_type_shape()?;
                        if Self::template_matches_shape(&external, &shape) {
                            let record = Record::new(external.clone(), ext_values);
                            self.session.auto_ingest_element_type_record(&record);
                            continue;
                        }
                    }
                    if self.session.config.auto_attach_metadata {
                        let shape = self.template_info_shape()?;
                        if Self::template_matches_shape(&external, &shape) {
                            let record = Record::new(external.clone(), ext_values);
                            self.session.auto_ingest_template_info_record(&record);
                            continue;
                        }
                    }

                    let values = match self.internal_tid.and_then(|tid| self.session.internal_template(tid)) {
                        Some(internal) if !Arc::ptr_eq(internal, &external) => {
                            let internal = internal.clone();
                            let remapped = lists::remap_values(&external, &ext_values, &internal);
                            return Ok(Record::new(internal, remapped));
                        }
                        _ => ext_values,
                    };
                    return Ok(Record::new(external, values));
                } else {
                    self.data_set = None;
                    continue;
                }
            }

            if self.read_cursor >= self.read_len {
                if self.read_len > 0 && !self.session.config.auto_next_message {
                    return Err(Error::EndOfMessage);
                }
                self.load_next_message()?;
                continue;
            }

            if self.read_len - self.read_cursor < SET_HEADER_LEN {
                return Err(malformed("truncated set header", &self.read_buf[self.read_cursor..self.read_len]));
            }
            let header = &self.read_buf[self.read_cursor..self.read_cursor + SET_HEADER_LEN];
            let (_, set_id) = be_u16::<_, NomErr>(&header[0..2]).map_err(|_| malformed("set header", header))?;
            let (_, set_len) = be_u16::<_, NomErr>(&header[2..4]).map_err(|_| malformed("set header", header))?;
            let set_len = set_len as usize;
            if set_len < SET_HEADER_LEN || self.read_cursor + set_len > self.read_len {
                return Err(malformed("set length out of range", header));
            }
            let body_start = self.read_cursor + SET_HEADER_LEN;
            let body_end = self.read_cursor + set_len;
            // Copied out of read_buf so the &mut self calls below (which
            // need to install templates into self.session) don't conflict
            // with a borrow of self.read_buf.
            let body = self.read_buf[body_start..body_end].to_vec();

            match set_id {
                TEMPLATE_SET_ID => {
                    self.install_template_set(&body, false)?;
                    self.read_cursor = body_end;
                }
                OPTIONS_TEMPLATE_SET_ID => {
                    self.install_template_set(&body, true)?;
                    self.read_cursor = body_end;
                }
                id if id >= DATA_SET_MIN_ID => {
                    if self.session.external_template(id).is_some() {
                        self.read_cursor = body_start;
                        self.data_set = Some(DataSetCursor { ext_tid: id, end: body_end });
                    } else {
                        warn!("data set for unknown external template {id} skipped");
                        self.session
                            .metrics
                            .sets_skipped_unknown_template
                            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                        self.read_cursor = body_end;
                    }
                }
                _ => {
                    self.read_cursor = body_end;
                }
            }
        }
    }
}

/// Encodes `internal_values` (laid out per `internal`) into the wire
/// layout of `external`, matching fields by `(pen, id, midx)` and
/// writing zero bytes for any external field with no internal match
/// (spec §4.4 step 3).
fn transcode_to_external(
    buf: &mut Vec<u8>,
    external: &Template,
    internal: &Template,
    internal_values: &[FieldValue],
) -> Result<()> {
    for field in &external.fields {
        let value = internal
            .find_by_ident_midx(field.pen(), field.id(), field.midx)
            .and_then(|pos| internal_values.get(pos));
        if field.canon.data_type.is_list() {
            match value {
                Some(FieldValue::BasicList(bl)) => lists::encode_basic_list(buf, bl)?,
                Some(FieldValue::SubTemplateList(stl)) => encode_stl(buf, stl)?,
                Some(FieldValue::SubTemplateMultiList(stml)) => encode_stml(buf, stml)?,
                _ => transcode::write_varlen(buf, &[]),
            }
        } else {
            transcode::encode_scalar(buf, field, value)?;
        }
    }
    Ok(())
}

fn encode_stl(buf: &mut Vec<u8>, stl: &crate::value::SubTemplateList) -> Result<()> {
    let mut content = Vec::new();
    content.push(stl.semantic.to_wire());
    content.extend_from_slice(&stl.template_id.to_be_bytes());
    for record in &stl.records {
        lists::encode_record_fields(&mut content, record)?;
    }
    transcode::write_varlen(buf, &content);
    Ok(())
}

fn encode_stml(buf: &mut Vec<u8>, stml: &crate::value::SubTemplateMultiList) -> Result<()> {
    let mut content = Vec::new();
    content.push(stml.semantic.to_wire());
    for entry in &stml.entries {
        let mut entry_buf = Vec::new();
        for record in &entry.records {
            lists::encode_record_fields(&mut entry_buf, record)?;
        }
        content.extend_from_slice(&entry.template_id.to_be_bytes());
        content.extend_from_slice(&(entry_buf.len() as u16).to_be_bytes());
        content.extend_from_slice(&entry_buf);
    }
    transcode::write_varlen(buf, &content);
    Ok(())
}
