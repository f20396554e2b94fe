#![doc = include_str!("../README.md")]

pub mod buffer;
pub mod error;
pub mod ie;
pub mod session;
pub mod template;
pub mod transport;
pub mod value;

pub use buffer::Buffer;
pub use error::{Error, Result};
pub use ie::{DataType, InfoElement, InfoModel};
pub use session::{Config, Session};
pub use template::{Template, TemplateBuilder, TemplateInfo};
pub use transport::{
    CollectTransport, ExportTransport, IoCollector, IoExporter, MemoryCollector, MemoryExporter,
    Transport,
};
pub use value::{
    BasicList, FieldValue, ListSemantic, Record, SubTemplateList, SubTemplateMultiList,
    SubTemplateMultiListEntry,
};
