mod common;

use common::SharedExporter;
use ipfix::template::FieldSpecifier;
use ipfix::{
    BasicList, Buffer, Config, FieldValue, InfoModel, ListSemantic, MemoryCollector, Record,
    Session, TemplateBuilder,
};
use std::cell::RefCell;
use std::rc::Rc;

/// A `basicList` of three `destinationTransportPort` values (IE id 11)
/// under an `AllOf` semantic must produce the exact RFC 6313 list
/// content octets, and must decode back to the same three values.
#[test]
fn basic_list_of_three_ports_matches_exact_wire_bytes() {
    let model = Rc::new(RefCell::new(InfoModel::builtin()));

    let mut builder = TemplateBuilder::new();
    builder
        .append_by_specifier(
            &model.borrow(),
            &FieldSpecifier {
                name: "basicListContainer".into(),
                len_override: 0,
                flags: 0,
            },
            0,
        )
        .unwrap();
    let template = builder.seal();

    let element = model.borrow().require(0, 11).unwrap();
    let list = BasicList {
        semantic: ListSemantic::AllOf,
        element,
        element_len: 2,
        values: vec![FieldValue::Uint(80), FieldValue::Uint(443), FieldValue::Uint(8080)],
    };

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

    export_buffer
        .append_record(&Record::new(template.clone(), vec![FieldValue::BasicList(list)]))
        .unwrap();
    export_buffer.emit_message().unwrap();

    let expected_content = hex::decode("03000B0002005001BB1F90").unwrap();
    let messages = exported.0.borrow();
    assert!(
        messages[0]
            .windows(expected_content.len())
            .any(|w| w == expected_content.as_slice()),
        "expected the exact basicList content octets on the wire"
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
    match &decoded.values[0] {
        FieldValue::BasicList(bl) => {
            assert_eq!(bl.count(), 3);
            assert_eq!(bl.get(0), Some(&FieldValue::Uint(80)));
            assert_eq!(bl.get(1), Some(&FieldValue::Uint(443)));
            assert_eq!(bl.get(2), Some(&FieldValue::Uint(8080)));
            assert_eq!(bl.element.id, 11);
        }
        other => panic!("expected a decoded basicList, got {other:?}"),
    }
}
