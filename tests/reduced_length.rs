mod common;

use common::SharedExporter;
use ipfix::template::FieldSpecifier;
use ipfix::{Buffer, Config, FieldValue, InfoModel, MemoryCollector, Record, Session, TemplateBuilder};
use std::cell::RefCell;
use std::rc::Rc;

/// Exports `packetTotalCount` at a 4-octet reduced length while the
/// internal template keeps the element's natural 8-octet width, then
/// decodes the same way on the collect side, confirming the high 32 bits
/// are dropped rather than raising a malformed-message error.
#[test]
fn reduced_length_field_round_trips_through_its_low_bits() {
    let model = Rc::new(RefCell::new(InfoModel::builtin()));

    let mut external_builder = TemplateBuilder::new();
    external_builder
        .append_by_specifier(
            &model.borrow(),
            &FieldSpecifier {
                name: "packetTotalCount".into(),
                len_override: 4,
                flags: 0,
            },
            0,
        )
        .unwrap();
    let external = external_builder.seal();

    let mut internal_builder = TemplateBuilder::new();
    internal_builder
        .append_by_specifier(
            &model.borrow(),
            &FieldSpecifier {
                name: "packetTotalCount".into(),
                len_override: 0,
                flags: 0,
            },
            0,
        )
        .unwrap();
    let internal = internal_builder.seal();

    let session = Session::with_config(model.clone(), Config::new());
    let exported = SharedExporter::default();
    let mut export_buffer = Buffer::for_export(session, exported.clone());

    let outcome = export_buffer
        .session
        .add_template(false, 0, external.clone(), None)
        .unwrap();
    export_buffer
        .session
        .add_template(true, outcome.tid, internal.clone(), None)
        .unwrap();
    export_buffer.set_internal_template(outcome.tid);
    export_buffer.set_external_template(outcome.tid);
    export_buffer.append_template(outcome.tid).unwrap();

    let record = Record::new(internal.clone(), vec![FieldValue::Uint(0x0000_0001_0000_0000)]);
    export_buffer.append_record(&record).unwrap();
    export_buffer.emit_message().unwrap();

    let mut collect_session = Session::with_config(model, Config::new());
    collect_session
        .add_template(true, outcome.tid, internal, None)
        .unwrap();
    let mut collector = MemoryCollector::new();
    for message in exported.0.borrow().iter() {
        collector.push_message(message.clone());
    }
    let mut collect_buffer = Buffer::for_collect(collect_session, collector);
    collect_buffer.set_internal_template(outcome.tid);

    let decoded = collect_buffer.next_record().unwrap();
    assert_eq!(decoded.values, vec![FieldValue::Uint(0)]);
}
