mod common;

use common::SharedExporter;
use ipfix::template::FieldSpecifier;
use ipfix::{Buffer, Config, FieldValue, InfoModel, MemoryCollector, Record, Session, TemplateBuilder};
use std::cell::RefCell;
use std::rc::Rc;

/// A variable-length string field carrying a payload of 300 octets
/// (past the 254-octet single-byte threshold) must be framed with the
/// 3-octet extended prefix (`0xFF` followed by a 2-octet length), and
/// must decode back to the exact original content.
#[test]
fn payload_past_254_octets_uses_the_extended_length_prefix() {
    let model = Rc::new(RefCell::new(InfoModel::builtin()));

    let mut builder = TemplateBuilder::new();
    builder
        .append_by_specifier(
            &model.borrow(),
            &FieldSpecifier {
                name: "informationElementName".into(),
                len_override: 0,
                flags: 0,
            },
            0,
        )
        .unwrap();
    let template = builder.seal();

    let session = Session::with_config(model.clone(), Config::new());
    let exported = SharedExporter::default();
    let mut export_buffer = Buffer::for_export(session, exported.clone());

    let outcome = export_buffer
        .session
        .add_for_export(template.clone(), None)
        .unwrap();
    export_buffer.set_internal_template(outcome.tid);
    export_buffer.set_external_template(outcome.tid);
    export_buffer.append_template(outcome.tid).unwrap();

    let payload: String = std::iter::repeat('x').take(300).collect();
    export_buffer
        .append_record(&Record::new(template.clone(), vec![FieldValue::String(payload.clone())]))
        .unwrap();
    export_buffer.emit_message().unwrap();

    let messages = exported.0.borrow();
    let message = &messages[0];
    let mut needle = vec![0xFFu8];
    needle.extend_from_slice(&300u16.to_be_bytes());
    needle.extend_from_slice(payload.as_bytes());
    assert!(
        message.windows(needle.len()).any(|w| w == needle.as_slice()),
        "expected the 3-octet extended length prefix followed by the full payload"
    );
    drop(messages);

    let mut collect_session = Session::with_config(model, Config::new());
    collect_session
        .add_template(true, outcome.tid, template, None)
        .unwrap();
    let mut collector = MemoryCollector::new();
    for message in exported.0.borrow().iter() {
        collector.push_message(message.clone());
    }
    let mut collect_buffer = Buffer::for_collect(collect_session, collector);
    collect_buffer.set_internal_template(outcome.tid);

    let decoded = collect_buffer.next_record().unwrap();
    assert_eq!(decoded.values, vec![FieldValue::String(payload)]);
}
