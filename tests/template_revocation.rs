mod common;

use common::SharedExporter;
use ipfix::template::FieldSpecifier;
use ipfix::{Buffer, Config, FieldValue, InfoModel, MemoryCollector, Record, Session, TemplateBuilder};
use std::cell::RefCell;
use std::net::Ipv4Addr;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn spec(name: &str) -> FieldSpecifier {
    FieldSpecifier {
        name: name.to_string(),
        len_override: 0,
        flags: 0,
    }
}

const TID: u16 = 300;

/// A template is exported, withdrawn, and re-added at the same tid with
/// a different field list. Records before the withdrawal must decode
/// under the first layout and records after it under the second, and
/// the collector's new-template callback must fire exactly once per
/// layout.
#[test]
fn a_reused_tid_decodes_each_layout_it_was_withdrawn_and_redefined_under() {
    let model = Rc::new(RefCell::new(InfoModel::builtin()));

    let mut first_builder = TemplateBuilder::new();
    first_builder
        .append_by_specifier(&model.borrow(), &spec("sourceIPv4Address"), 0)
        .unwrap();
    let first_template = first_builder.seal();

    let mut second_builder = TemplateBuilder::new();
    second_builder
        .append_by_specifier(&model.borrow(), &spec("sourceIPv4Address"), 0)
        .unwrap();
    second_builder
        .append_by_specifier(&model.borrow(), &spec("destinationIPv4Address"), 0)
        .unwrap();
    let second_template = second_builder.seal();

    let session = Session::with_config(model.clone(), Config::new());
    let exported = SharedExporter::default();
    let mut export_buffer = Buffer::for_export(session, exported.clone());

    export_buffer
        .session
        .add_template(false, TID, first_template.clone(), None)
        .unwrap();
    export_buffer
        .session
        .add_template(true, TID, first_template.clone(), None)
        .unwrap();
    export_buffer.set_internal_template(TID);
    export_buffer.set_external_template(TID);
    export_buffer.append_template(TID).unwrap();

    let first_records: Vec<Record> = (0..10)
        .map(|i| Record::new(first_template.clone(), vec![FieldValue::Ipv4(Ipv4Addr::new(10, 0, 0, i))]))
        .collect();
    for record in &first_records {
        export_buffer.append_record(record).unwrap();
    }

    export_buffer.append_template_withdrawal(TID).unwrap();
    export_buffer.session.remove_external_template(TID);

    export_buffer
        .session
        .add_template(false, TID, second_template.clone(), None)
        .unwrap();
    export_buffer
        .session
        .add_template(true, TID, second_template.clone(), None)
        .unwrap();
    export_buffer.set_internal_template(TID);
    export_buffer.set_external_template(TID);
    export_buffer.append_template(TID).unwrap();

    let second_records: Vec<Record> = (0..5)
        .map(|i| {
            Record::new(
                second_template.clone(),
                vec![
                    FieldValue::Ipv4(Ipv4Addr::new(10, 0, 1, i)),
                    FieldValue::Ipv4(Ipv4Addr::new(10, 0, 2, i)),
                ],
            )
        })
        .collect();
    for record in &second_records {
        export_buffer.append_record(record).unwrap();
    }
    export_buffer.emit_message().unwrap();

    let mut collect_session = Session::with_config(model, Config::new());
    let new_template_calls = Arc::new(AtomicUsize::new(0));
    let counter = new_template_calls.clone();
    collect_session.set_new_template_callback(move |_tid, _template| {
        counter.fetch_add(1, Ordering::Relaxed);
        None
    });

    let mut collector = MemoryCollector::new();
    for message in exported.0.borrow().iter() {
        collector.push_message(message.clone());
    }
    let mut collect_buffer = Buffer::for_collect(collect_session, collector);

    for expected in &first_records {
        collect_buffer.set_internal_template(TID);
        let decoded = collect_buffer.next_record().unwrap();
        assert_eq!(decoded.values, expected.values);
    }
    for expected in &second_records {
        collect_buffer.set_internal_template(TID);
        let decoded = collect_buffer.next_record().unwrap();
        assert_eq!(decoded.values, expected.values);
    }

    assert_eq!(new_template_calls.load(Ordering::Relaxed), 2);
}
