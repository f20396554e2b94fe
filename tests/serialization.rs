use ipfix::template::FieldSpecifier;
use ipfix::{FieldValue, InfoModel, Record, TemplateBuilder};
use std::net::Ipv4Addr;

fn spec(name: &str) -> FieldSpecifier {
    FieldSpecifier {
        name: name.to_string(),
        len_override: 0,
        flags: 0,
    }
}

#[test]
fn record_serializes_tagged_field_values() {
    let model = InfoModel::builtin();
    let mut builder = TemplateBuilder::new();
    builder.append_by_specifier(&model, &spec("sourceIPv4Address"), 0).unwrap();
    builder.append_by_specifier(&model, &spec("packetTotalCount"), 0).unwrap();
    let template = builder.seal();

    let record = Record::new(
        template,
        vec![FieldValue::Ipv4(Ipv4Addr::new(192, 0, 2, 1)), FieldValue::Uint(42)],
    );
    let json = serde_json::to_string(&record).expect("failed to serialize record");

    assert!(json.contains("\"Ipv4\":\"192.0.2.1\""));
    assert!(json.contains("\"Uint\":42"));
}

#[test]
fn record_json_pretty_print_has_newlines() {
    let model = InfoModel::builtin();
    let mut builder = TemplateBuilder::new();
    builder.append_by_specifier(&model, &spec("protocolIdentifier"), 0).unwrap();
    let template = builder.seal();

    let record = Record::new(template, vec![FieldValue::Uint(6)]);
    let json = serde_json::to_string_pretty(&record).expect("failed to serialize record");

    assert!(json.contains('\n'));
    assert!(json.contains("\"Uint\""));
}

#[test]
fn absent_value_serializes_as_a_unit_variant() {
    let value = FieldValue::Absent;
    let json = serde_json::to_string(&value).expect("failed to serialize value");
    assert_eq!(json, "\"Absent\"");
}
