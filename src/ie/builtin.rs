//! Built-in IANA information elements (spec §4.1 "supplemented"), covering
//! the fields named in spec.md's test scenarios plus a representative
//! slice of commonly exported flow fields, in the style of the teacher's
//! built-in `IANAIPFixField`/`CiscoIPFixField` lookup tables.

use super::types::DataType;
use super::{InfoElement, VARLEN};

macro_rules! ie {
    ($id:expr, $name:expr, $ty:expr, $len:expr) => {
        InfoElement::new(0, $id, $name, $ty, $len)
    };
}

macro_rules! ie_ent {
    ($pen:expr, $id:expr, $name:expr, $ty:expr, $len:expr) => {
        InfoElement::new($pen, $id, $name, $ty, $len)
    };
}

/// CERT's enterprise number, reused here (as libfixbuf's own template
/// metadata extension does) for the template-info options records this
/// crate's session metadata support reads and writes. Not an IANA IE
/// registration -- just this crate borrowing its teacher lineage's PEN
/// for an extension with no standard home.
pub const TEMPLATE_METADATA_PEN: u32 = 6871;

pub fn builtin_elements() -> Vec<InfoElement> {
    vec![
        ie!(1, "octetDeltaCount", DataType::Uint64, 8),
        ie!(2, "packetDeltaCount", DataType::Uint64, 8),
        ie!(4, "protocolIdentifier", DataType::Uint8, 1),
        ie!(7, "sourceTransportPort", DataType::Uint16, 2).endian(),
        ie!(8, "sourceIPv4Address", DataType::Ipv4Addr, 4),
        ie!(10, "ingressInterface", DataType::Uint32, 4).endian(),
        ie!(11, "destinationTransportPort", DataType::Uint16, 2).endian(),
        ie!(12, "destinationIPv4Address", DataType::Ipv4Addr, 4),
        ie!(14, "egressInterface", DataType::Uint32, 4).endian(),
        ie!(21, "flowEndSysUpTime", DataType::Uint32, 4).endian(),
        ie!(22, "flowStartSysUpTime", DataType::Uint32, 4).endian(),
        ie!(27, "sourceIPv6Address", DataType::Ipv6Addr, 16),
        ie!(28, "destinationIPv6Address", DataType::Ipv6Addr, 16),
        ie!(61, "flowDirection", DataType::Uint8, 1),
        ie!(85, "octetTotalCount", DataType::Uint64, 8).reversible(),
        ie!(86, "packetTotalCount", DataType::Uint64, 8).reversible(),
        ie!(152, "flowStartMilliseconds", DataType::DateMilliseconds, 8),
        ie!(153, "flowEndMilliseconds", DataType::DateMilliseconds, 8),
        ie!(154, "flowStartMicroseconds", DataType::DateMicroseconds, 8),
        ie!(155, "flowEndMicroseconds", DataType::DateMicroseconds, 8),
        ie!(156, "flowStartNanoseconds", DataType::DateNanoseconds, 8),
        ie!(157, "flowEndNanoseconds", DataType::DateNanoseconds, 8),
        ie!(160, "systemInitTimeMilliseconds", DataType::DateMilliseconds, 8),
        ie!(161, "flowDurationMilliseconds", DataType::Uint32, 4).endian(),
        ie!(173, "ipPayloadPacketSection", DataType::OctetArray, VARLEN),
        ie!(180, "udpSourcePort", DataType::Uint16, 2).endian(),
        ie!(181, "udpDestinationPort", DataType::Uint16, 2).endian(),
        ie!(182, "tcpSourcePort", DataType::Uint16, 2).endian(),
        ie!(183, "tcpDestinationPort", DataType::Uint16, 2).endian(),
        ie!(210, "paddingOctets", DataType::OctetArray, VARLEN),
        ie!(225, "postNATSourceIPv4Address", DataType::Ipv4Addr, 4),
        ie!(226, "postNATDestinationIPv4Address", DataType::Ipv4Addr, 4),
        ie!(233, "natEvent", DataType::Uint8, 1),
        ie!(291, "confirmedBytes", DataType::Uint64, 8),
        ie!(292, "confirmedPackets", DataType::Uint64, 8),
        // RFC 6313 container types: element-only placeholders so a
        // field_specifier can name the list's own IE.
        ie!(291 + 200, "basicListContainer", DataType::BasicList, VARLEN),
        ie!(291 + 201, "subTemplateListContainer", DataType::SubTemplateList, VARLEN),
        ie!(
            291 + 202,
            "subTemplateMultiListContainer",
            DataType::SubTemplateMultiList,
            VARLEN
        ),
        // RFC 5610 element-type options record fields.
        ie!(346, "privateEnterpriseNumber", DataType::Uint32, 4).endian(),
        ie!(339, "informationElementDataType", DataType::Uint8, 1),
        ie!(344, "informationElementSemantics", DataType::Uint8, 1),
        ie!(345, "informationElementUnits", DataType::Uint16, 2).endian(),
        ie!(342, "informationElementRangeBegin", DataType::Uint64, 8).endian(),
        ie!(343, "informationElementRangeEnd", DataType::Uint64, 8).endian(),
        ie!(341, "informationElementName", DataType::String, VARLEN),
        ie!(340, "informationElementDescription", DataType::String, VARLEN),
        ie!(303, "informationElementId", DataType::Uint16, 2).endian(),
        // Template metadata options record fields, under TEMPLATE_METADATA_PEN.
        ie_ent!(TEMPLATE_METADATA_PEN, 1, "templateId", DataType::Uint16, 2).endian(),
        ie_ent!(TEMPLATE_METADATA_PEN, 2, "templateName", DataType::String, VARLEN),
        ie_ent!(TEMPLATE_METADATA_PEN, 3, "templateDescription", DataType::String, VARLEN),
        ie_ent!(TEMPLATE_METADATA_PEN, 4, "templateAppLabel", DataType::Uint32, 4).endian(),
        ie_ent!(TEMPLATE_METADATA_PEN, 5, "templateParentTid", DataType::Uint16, 2).endian(),
        ie_ent!(TEMPLATE_METADATA_PEN, 6, "basicListInfo", DataType::SubTemplateList, VARLEN),
        ie_ent!(TEMPLATE_METADATA_PEN, 7, "basicListElementPen", DataType::Uint32, 4).endian(),
        ie_ent!(TEMPLATE_METADATA_PEN, 8, "basicListElementId", DataType::Uint16, 2).endian(),
        ie_ent!(TEMPLATE_METADATA_PEN, 9, "basicListContentPen", DataType::Uint32, 4).endian(),
        ie_ent!(TEMPLATE_METADATA_PEN, 10, "basicListContentId", DataType::Uint16, 2).endian(),
    ]
}
