//! Per-observation-domain session state: internal/external template
//! tables, template-pair mapping, metadata bookkeeping, sequence numbers,
//! and new-template callback dispatch (spec §3, §4.3).

pub mod config;
mod domain;
pub mod hooks;
pub mod metadata;
pub mod metrics;
mod pairs;

pub use config::Config;
pub use domain::DomainState;
pub use hooks::{TemplateEvent, TemplateHooks};
pub use metrics::{SessionMetrics, SessionMetricsSnapshot};
pub use pairs::{PairResolution, TemplatePairs, DISABLE as PAIR_DISABLE};

use crate::error::{Error, Result};
use crate::ie::InfoModel;
use crate::template::{Template, TemplateInfo};
use log::{debug, trace, warn};
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

/// Shared, interior-mutable handle to an [`InfoModel`]. `Rc<RefCell<_>>`
/// rather than `Arc<Mutex<_>>` because the core is single-threaded
/// cooperative (spec §5) — there is no concurrent access to guard
/// against, only aliasing within one thread (alien-element synthesis and
/// RFC 5610 auto-ingest both need to mutate the model while a decode is
/// in progress).
pub type SharedModel = Rc<RefCell<InfoModel>>;

/// The outcome of [`Session::add_template`], reported back to the
/// [`crate::buffer::Buffer`] that drives wire emission (kept out of
/// `Session` itself to avoid a Session -> Buffer back-pointer — the
/// "pointer-heavy template and session graphs" pattern Design Notes §9
/// calls out).
#[derive(Debug, Clone)]
pub struct TemplateAddOutcome {
    pub tid: u16,
    pub revoked: Option<u16>,
    /// True when this was an external add and the caller (a Buffer bound
    /// for export) should emit the template (and any `TemplateInfo`) onto
    /// the wire.
    pub needs_export: bool,
}

type TemplateContext = Box<dyn Any>;
type NewTemplateCallback = Box<dyn FnMut(u16, &Arc<Template>) -> Option<TemplateContext>>;

/// Per-observation-domain session state bound to one [`InfoModel`].
pub struct Session {
    model: SharedModel,
    internal_templates: HashMap<u16, Arc<Template>>,
    domains: HashMap<u32, DomainState>,
    current_domain: u32,
    pairs: TemplatePairs,
    callback: Option<NewTemplateCallback>,
    pub hooks: TemplateHooks,
    pub metrics: SessionMetrics,
    pub config: Config,
    next_internal_tid: u16,
    next_external_tid: u16,
    pub(crate) rfc5610_reader_tid: Option<u16>,
    pub(crate) template_info_reader_tid: Option<u16>,
}

impl Session {
    pub fn new(model: SharedModel) -> Self {
        Session {
            model,
            internal_templates: HashMap::new(),
            domains: HashMap::new(),
            current_domain: 0,
            pairs: TemplatePairs::new(),
            callback: None,
            hooks: TemplateHooks::new(),
            metrics: SessionMetrics::new(),
            config: Config::new(),
            next_internal_tid: 65535,
            next_external_tid: 256,
            rfc5610_reader_tid: None,
            template_info_reader_tid: None,
        }
    }

    pub fn with_config(model: SharedModel, config: Config) -> Self {
        let mut session = Session::new(model);
        session.config = config;
        session
    }

    pub fn model(&self) -> &SharedModel {
        &self.model
    }

    pub fn set_new_template_callback<F>(&mut self, cb: F)
    where
        F: FnMut(u16, &Arc<Template>) -> Option<TemplateContext> + 'static,
    {
        self.callback = Some(Box::new(cb));
    }

    // -- domain switching -------------------------------------------------

    pub fn current_domain(&self) -> u32 {
        self.current_domain
    }

    /// Hot-swaps the external-template and template-info tables for
    /// `domain`, allocating empty tables on first use (spec §4.3 "Domain
    /// switching").
    pub fn set_current_domain(&mut self, domain: u32) {
        self.domains.entry(domain).or_insert_with(DomainState::new);
        self.current_domain = domain;
    }

    fn domain_mut(&mut self) -> &mut DomainState {
        self.domains
            .entry(self.current_domain)
            .or_insert_with(DomainState::new)
    }

    fn domain(&self) -> Option<&DomainState> {
        self.domains.get(&self.current_domain)
    }

    pub fn sequence(&self) -> u32 {
        self.domain().map(|d| d.sequence).unwrap_or(0)
    }

    pub(crate) fn advance_sequence(&mut self, data_records: u32) {
        self.domain_mut().sequence = self.domain_mut().sequence.wrapping_add(data_records);
    }

    // -- template pairs -----------------------------------------------------

    pub fn set_template_pair(&mut self, ext_tid: u16, internal_tid: u16) {
        self.pairs.set(ext_tid, internal_tid);
    }

    pub fn clear_template_pair(&mut self, ext_tid: u16) {
        self.pairs.clear(ext_tid);
    }

    pub fn resolve_pair(&self, ext_tid: u16) -> PairResolution {
        self.pairs
            .resolve(ext_tid, |tid| self.internal_templates.contains_key(&tid))
    }

    // -- template tables ----------------------------------------------------

    pub fn internal_template(&self, tid: u16) -> Option<&Arc<Template>> {
        self.internal_templates.get(&tid)
    }

    pub fn external_template(&self, tid: u16) -> Option<&Arc<Template>> {
        self.domain().and_then(|d| d.external_templates.get(&tid))
    }

    pub fn external_template_in(&self, domain: u32, tid: u16) -> Option<&Arc<Template>> {
        self.domains
            .get(&domain)
            .and_then(|d| d.external_templates.get(&tid))
    }

    pub fn template_info(&self, tid: u16) -> Option<&TemplateInfo> {
        self.domain().and_then(|d| d.template_info.get(&tid))
    }

    fn next_free_internal_tid(&self) -> Result<u16> {
        let start = self.next_internal_tid;
        let mut candidate = start;
        loop {
            if !self.internal_templates.contains_key(&candidate)
                && Some(candidate) != self.rfc5610_reader_tid
                && Some(candidate) != self.template_info_reader_tid
            {
                return Ok(candidate);
            }
            if candidate == 256 {
                return Err(Error::TemplateFull);
            }
            candidate -= 1;
            if candidate == start {
                return Err(Error::TemplateFull);
            }
        }
    }

    fn next_free_external_tid(&self) -> Result<u16> {
        let start = self.next_external_tid;
        let mut candidate = start;
        loop {
            if self.domain().map(|d| !d.external_templates.contains_key(&candidate)).unwrap_or(true) {
                return Ok(candidate);
            }
            if candidate == 65535 {
                return Err(Error::TemplateFull);
            }
            candidate += 1;
            if candidate == start {
                return Err(Error::TemplateFull);
            }
        }
    }

    /// Adds `template` to the session (spec §4.3 steps 1-7). `desired_tid
    /// == 0` auto-assigns (internal tids scan downward from 65535,
    /// external upward from 256). Returns the outcome the caller (a
    /// [`crate::buffer::Buffer`]) uses to decide whether to emit the
    /// template on the wire.
    pub fn add_template(
        &mut self,
        internal: bool,
        desired_tid: u16,
        template: Arc<Template>,
        info: Option<TemplateInfo>,
    ) -> Result<TemplateAddOutcome> {
        if !internal {
            if let Some(ref info) = info {
                if !info.is_valid_for_export() {
                    return Err(Error::SetupError {
                        message: "TemplateInfo must have a non-empty name to be attached"
                            .into(),
                    });
                }
            }
        }

        // Step 1: relocate a special internal template that would
        // collide with the requested id.
        if internal && desired_tid != 0 {
            if Some(desired_tid) == self.rfc5610_reader_tid {
                self.relocate_special_internal(desired_tid, true);
            } else if Some(desired_tid) == self.template_info_reader_tid {
                self.relocate_special_internal(desired_tid, false);
            }
        }

        let tid = if desired_tid != 0 {
            desired_tid
        } else if internal {
            self.next_free_internal_tid()?
        } else {
            self.next_free_external_tid()?
        };

        let mut revoked = None;
        if internal {
            if self.internal_templates.contains_key(&tid) {
                revoked = Some(tid);
                self.metrics.template_collisions.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                warn!("internal template {tid} replaced without prior removal");
            }
            self.internal_templates.insert(tid, template);
        } else {
            let had_prior = self.domain().map(|d| d.external_templates.contains_key(&tid)).unwrap_or(false);
            if had_prior {
                revoked = Some(tid);
                self.metrics.template_collisions.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                warn!("external template {tid} redefined in domain {} without prior withdrawal", self.current_domain);
                self.hooks.trigger(&TemplateEvent::Collision { tid });
            }
            if let Some(ref info) = info {
                if self.domain().map(|d| d.template_info.contains_key(&tid)).unwrap_or(false) {
                    return Err(Error::SetupError {
                        message: format!("tid {tid} already has TemplateInfo attached"),
                    });
                }
                self.domain_mut().template_info.insert(tid, info.clone());
                self.hooks.trigger(&TemplateEvent::MetadataAttached { tid });
            }
            self.domain_mut().external_templates.insert(tid, template);
        }

        self.metrics.templates_added.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.hooks.trigger(&TemplateEvent::Learned { tid, internal });
        debug!("{} template {tid} admitted", if internal { "internal" } else { "external" });

        Ok(TemplateAddOutcome {
            tid,
            revoked,
            needs_export: !internal,
        })
    }

    /// Convenience: adds `template` once externally (stripping padding)
    /// and once internally at the same (returned) tid, so one id
    /// round-trips a record's layout to and from the wire (spec §4.3
    /// "Add-for-export").
    pub fn add_for_export(
        &mut self,
        template: Arc<Template>,
        info: Option<TemplateInfo>,
    ) -> Result<TemplateAddOutcome> {
        let stripped = template
            .copy(crate::template::CopyOptions {
                strip_padding: true,
                discard_scope: false,
            })
            .seal();
        let outcome = self.add_template(false, 0, stripped, info)?;
        self.add_template(true, outcome.tid, template, None)?;
        Ok(outcome)
    }

    /// Removes the external template at `tid` in the current domain,
    /// along with any attached `TemplateInfo` (Open Question 1 in
    /// DESIGN.md). Returns `true` if a template was actually present.
    pub fn remove_external_template(&mut self, tid: u16) -> bool {
        let removed = self.domain_mut().external_templates.remove(&tid).is_some();
        self.domain_mut().template_info.remove(&tid);
        self.domain_mut().template_contexts.remove(&tid);
        if removed {
            self.metrics.templates_revoked.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            self.hooks.trigger(&TemplateEvent::Revoked { tid });
            debug!("external template {tid} withdrawn");
        } else {
            warn!("withdrawal of external template {tid} with no matching template");
        }
        removed
    }

    fn relocate_special_internal(&mut self, old_tid: u16, is_rfc5610: bool) {
        if let Ok(new_tid) = self.next_free_internal_tid() {
            if let Some(t) = self.internal_templates.remove(&old_tid) {
                self.internal_templates.insert(new_tid, t);
            }
            if is_rfc5610 {
                self.rfc5610_reader_tid = Some(new_tid);
            } else {
                self.template_info_reader_tid = Some(new_tid);
            }
        }
    }

    /// Invokes the new-template callback (if any) for an externally
    /// installed template, storing the returned per-template context.
    /// Called by the buffer/transcoder after decoding and installing a
    /// template set (spec §4.3 "New-template callback").
    pub(crate) fn dispatch_new_template_callback(&mut self, tid: u16, template: &Arc<Template>) {
        if let Some(mut cb) = self.callback.take() {
            let ctx = cb(tid, template);
            self.callback = Some(cb);
            if let Some(ctx) = ctx {
                self.domain_mut().template_contexts.insert(tid, ctx);
            }
        }
    }

    /// Registers (or updates) an external template received from the
    /// wire, in the current domain, then fires the new-template
    /// callback. Used by the buffer/transcoder's set-walking loop.
    pub(crate) fn install_decoded_template(&mut self, tid: u16, template: Arc<Template>) {
        let had_prior = self
            .domain()
            .map(|d| d.external_templates.contains_key(&tid))
            .unwrap_or(false);
        if had_prior {
            self.hooks.trigger(&TemplateEvent::Collision { tid });
            self.metrics.template_collisions.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            warn!("external template {tid} redefined on the wire without prior withdrawal");
        }
        self.domain_mut().external_templates.insert(tid, template.clone());
        self.metrics.templates_added.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.hooks.trigger(&TemplateEvent::Learned {
            tid,
            internal: false,
        });
        trace!("external template {tid} decoded from the wire");
        self.dispatch_new_template_callback(tid, &template);
    }
}
