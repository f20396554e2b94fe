mod common;

use common::SharedExporter;
use ipfix::template::FieldSpecifier;
use ipfix::{
    Buffer, Config, FieldValue, InfoModel, MemoryCollector, Record, Session, TemplateBuilder,
};
use std::cell::RefCell;
use std::net::Ipv4Addr;
use std::rc::Rc;

fn spec(name: &str, len_override: u16) -> FieldSpecifier {
    FieldSpecifier {
        name: name.to_string(),
        len_override,
        flags: 0,
    }
}

fn build_template(model: &InfoModel) -> std::sync::Arc<ipfix::Template> {
    let mut builder = TemplateBuilder::new();
    for (name, len) in [
        ("flowStartMilliseconds", 0),
        ("flowEndMilliseconds", 0),
        ("sourceIPv4Address", 0),
        ("destinationIPv4Address", 0),
        ("sourceTransportPort", 0),
        ("destinationTransportPort", 0),
        ("protocolIdentifier", 0),
        ("paddingOctets", 3),
        ("packetTotalCount", 0),
        ("octetTotalCount", 0),
        ("ipPayloadPacketSection", 0),
    ] {
        builder
            .append_by_specifier(model, &spec(name, len), 0)
            .unwrap();
    }
    builder.seal()
}

fn make_record(template: &std::sync::Arc<ipfix::Template>, seed: u64) -> Record {
    let values = vec![
        FieldValue::DateMilliseconds(1_700_000_000_000 + seed),
        FieldValue::DateMilliseconds(1_700_000_001_000 + seed),
        FieldValue::Ipv4(Ipv4Addr::new(10, 0, 0, seed as u8)),
        FieldValue::Ipv4(Ipv4Addr::new(10, 0, 1, seed as u8)),
        FieldValue::Uint(1024 + seed),
        FieldValue::Uint(80),
        FieldValue::Uint(6),
        FieldValue::OctetArray(vec![0, 0, 0]),
        FieldValue::Uint(100 + seed),
        FieldValue::Uint(64000 + seed),
        FieldValue::OctetArray(vec![0xAB; seed as usize + 1]),
    ];
    Record::new(template.clone(), values)
}

#[test]
fn round_trips_five_records_through_an_in_memory_transport() {
    let model = Rc::new(RefCell::new(InfoModel::builtin()));
    let template = build_template(&model.borrow());

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

    let records: Vec<Record> = (0..5).map(|i| make_record(&template, i)).collect();
    for record in &records {
        export_buffer.append_record(record).unwrap();
    }
    export_buffer.emit_message().unwrap();

    let mut collect_session = Session::with_config(model, Config::new());
    collect_session
        .add_template(true, outcome.tid, template.clone(), None)
        .unwrap();
    let mut collector = MemoryCollector::new();
    for message in exported.0.borrow().iter() {
        collector.push_message(message.clone());
    }
    let mut collect_buffer = Buffer::for_collect(collect_session, collector);
    collect_buffer.set_internal_template(outcome.tid);

    for expected in &records {
        let decoded = collect_buffer.next_record().unwrap();
        // paddingOctets is stripped from the external template (spec
        // §4.3 "add-for-export"), so it round-trips as Absent rather
        // than its original placeholder bytes.
        let mut expected_values = expected.values.clone();
        expected_values[7] = FieldValue::Absent;
        assert_eq!(decoded.values, expected_values);
    }
}

#[test]
fn wire_fixed_len_equals_sum_of_fixed_field_lengths() {
    let model = InfoModel::builtin();
    let template = build_template(&model);
    let expected: u16 = template
        .fields
        .iter()
        .filter(|f| !f.is_varlen() && !f.canon.data_type.is_list())
        .map(|f| f.len)
        .sum();
    assert_eq!(template.wire_fixed_len, expected);
}

#[test]
fn repeated_elements_get_sequential_midx() {
    let model = InfoModel::builtin();
    let mut builder = TemplateBuilder::new();
    builder
        .append_by_specifier(&model, &spec("sourceTransportPort", 0), 0)
        .unwrap();
    builder
        .append_by_specifier(&model, &spec("sourceTransportPort", 0), 0)
        .unwrap();
    builder
        .append_by_specifier(&model, &spec("sourceTransportPort", 0), 0)
        .unwrap();
    let template = builder.seal();
    let midxs: Vec<u16> = template.fields.iter().map(|f| f.midx).collect();
    assert_eq!(midxs, vec![0, 1, 2]);
}
