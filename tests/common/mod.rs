use ipfix::{ExportTransport, Result};
use std::cell::RefCell;
use std::rc::Rc;

/// An in-memory export transport whose emitted messages stay reachable
/// after the owning `Buffer` is done with it, via the shared handle kept
/// by the test.
#[derive(Clone, Default)]
pub struct SharedExporter(pub Rc<RefCell<Vec<Vec<u8>>>>);

impl ExportTransport for SharedExporter {
    fn write_message(&mut self, message: &[u8]) -> Result<()> {
        self.0.borrow_mut().push(message.to_vec());
        Ok(())
    }
}
