mod common;

use common::SharedExporter;
use ipfix::template::FieldSpecifier;
use ipfix::{
    Buffer, Config, FieldValue, InfoModel, ListSemantic, MemoryCollector, Record, Session,
    SubTemplateMultiList, SubTemplateMultiListEntry, TemplateBuilder,
};
use std::cell::RefCell;
use std::net::Ipv4Addr;
use std::rc::Rc;

fn spec(name: &str) -> FieldSpecifier {
    FieldSpecifier {
        name: name.to_string(),
        len_override: 0,
        flags: 0,
    }
}

/// A `subTemplateMultiList` carrying one entry under each of two
/// differently-shaped templates: the collector pairs the first entry's
/// template to itself (full decode) and disables the second, so only
/// the first entry's record survives decode.
#[test]
fn second_entrys_template_can_be_disabled_while_the_first_decodes() {
    let model = Rc::new(RefCell::new(InfoModel::builtin()));

    let mut addr_builder = TemplateBuilder::new();
    addr_builder
        .append_by_specifier(&model.borrow(), &spec("sourceIPv4Address"), 0)
        .unwrap();
    addr_builder
        .append_by_specifier(&model.borrow(), &spec("destinationIPv4Address"), 0)
        .unwrap();
    let addr_template = addr_builder.seal();

    let mut name_builder = TemplateBuilder::new();
    name_builder
        .append_by_specifier(&model.borrow(), &spec("informationElementName"), 0)
        .unwrap();
    let name_template = name_builder.seal();

    let mut parent_builder = TemplateBuilder::new();
    parent_builder
        .append_by_specifier(&model.borrow(), &spec("subTemplateMultiListContainer"), 0)
        .unwrap();
    let parent_template = parent_builder.seal();

    let session = Session::with_config(model.clone(), Config::new());
    let exported = SharedExporter::default();
    let mut export_buffer = Buffer::for_export(session, exported.clone());

    let addr_outcome = export_buffer
        .session
        .add_for_export(addr_template.clone(), None)
        .unwrap();
    let name_outcome = export_buffer
        .session
        .add_for_export(name_template.clone(), None)
        .unwrap();
    let parent_outcome = export_buffer
        .session
        .add_for_export(parent_template.clone(), None)
        .unwrap();

    export_buffer.append_template(addr_outcome.tid).unwrap();
    export_buffer.append_template(name_outcome.tid).unwrap();
    export_buffer.append_template(parent_outcome.tid).unwrap();

    let addr_record = Record::new(
        addr_template.clone(),
        vec![
            FieldValue::Ipv4(Ipv4Addr::new(192, 0, 2, 1)),
            FieldValue::Ipv4(Ipv4Addr::new(192, 0, 2, 254)),
        ],
    );
    let name_record = Record::new(
        name_template.clone(),
        vec![FieldValue::String("octetDeltaCount".into())],
    );

    let stml = SubTemplateMultiList {
        semantic: ListSemantic::ExactlyOneOf,
        entries: vec![
            SubTemplateMultiListEntry {
                template_id: addr_outcome.tid,
                template: None,
                records: vec![addr_record.clone()],
            },
            SubTemplateMultiListEntry {
                template_id: name_outcome.tid,
                template: None,
                records: vec![name_record],
            },
        ],
    };

    export_buffer.set_internal_template(parent_outcome.tid);
    export_buffer.set_external_template(parent_outcome.tid);
    export_buffer
        .append_record(&Record::new(
            parent_template.clone(),
            vec![FieldValue::SubTemplateMultiList(stml)],
        ))
        .unwrap();
    export_buffer.emit_message().unwrap();

    let mut collect_session = Session::with_config(model, Config::new());
    collect_session
        .add_template(true, parent_outcome.tid, parent_template, None)
        .unwrap();
    collect_session
        .add_template(true, addr_outcome.tid, addr_template, None)
        .unwrap();
    collect_session.set_template_pair(addr_outcome.tid, addr_outcome.tid);
    collect_session.set_template_pair(name_outcome.tid, ipfix::session::PAIR_DISABLE);

    let mut collector = MemoryCollector::new();
    for message in exported.0.borrow().iter() {
        collector.push_message(message.clone());
    }
    let mut collect_buffer = Buffer::for_collect(collect_session, collector);
    collect_buffer.set_internal_template(parent_outcome.tid);

    let decoded = collect_buffer.next_record().unwrap();
    match &decoded.values[0] {
        FieldValue::SubTemplateMultiList(stml) => {
            assert_eq!(stml.entry_count(), 2);
            let first = &stml.entries[0];
            assert_eq!(first.records.len(), 1);
            assert_eq!(first.records[0].values, addr_record.values);

            let second = &stml.entries[1];
            assert!(second.records.is_empty());
            assert!(second.template.is_none());
        }
        other => panic!("expected a decoded subTemplateMultiList, got {other:?}"),
    }
}
