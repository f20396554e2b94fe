//! Session-level configuration, generalizing the teacher's
//! `variable_versions::Config` (cache sizing, TTL, enterprise registry)
//! to the knobs spec §4.3/§4.4 name for a Session/Buffer pair.

/// Configuration for a [`crate::session::Session`] and the
/// [`crate::buffer::Buffer`] it is bound to.
#[derive(Debug, Clone)]
pub struct Config {
    /// When appending/emitting would overflow the current message, emit
    /// it and retry rather than returning `EndOfMessage` (spec §4.4).
    pub auto_next_message: bool,
    /// RFC 5610 auto-learn: register IEs described by incoming
    /// element-type options records.
    pub auto_insert_element: bool,
    /// Auto-recognize and consume template-info options records
    /// following a template set on read, and auto-emit them on
    /// external template add.
    pub auto_attach_metadata: bool,
    /// Export RFC 5610 element-type records for non-standard IEs before
    /// each template export.
    pub export_rfc5610_elements: bool,
    /// Export template-info metadata whenever its associated template is
    /// exported.
    pub export_template_metadata: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            auto_next_message: true,
            auto_insert_element: false,
            auto_attach_metadata: false,
            export_rfc5610_elements: false,
            export_template_metadata: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }
}
