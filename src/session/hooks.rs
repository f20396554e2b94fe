//! Template lifecycle events, generalized from the teacher's
//! `template_events::{TemplateEvent, TemplateHook, TemplateHooks}` (fixed
//! NetFlow-v9/IPFIX `Learned/Collision/Evicted/Expired/MissingTemplate`
//! set keyed by protocol) to this crate's own IPFIX session lifecycle.

use std::sync::Arc;

/// Session-level template/metadata lifecycle events.
#[derive(Debug, Clone)]
pub enum TemplateEvent {
    /// A new external (or internal) template was installed under `tid`.
    Learned { tid: u16, internal: bool },
    /// A tid already occupied was reused with a different (or
    /// refreshed) definition.
    Collision { tid: u16 },
    /// An external template was withdrawn (zero-length template record,
    /// or displaced by a colliding add).
    Revoked { tid: u16 },
    /// Template-info metadata was attached to `tid`.
    MetadataAttached { tid: u16 },
    /// RFC 5610 auto-ingest registered a new element in the model.
    ElementLearned { pen: u32, id: u16 },
}

pub type TemplateHook = Arc<dyn Fn(&TemplateEvent) + Send + Sync + 'static>;

/// Container for registered template event hooks.
#[derive(Clone, Default)]
pub struct TemplateHooks {
    hooks: Vec<TemplateHook>,
}

impl std::fmt::Debug for TemplateHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateHooks")
            .field("hook_count", &self.hooks.len())
            .finish()
    }
}

impl TemplateHooks {
    pub fn new() -> Self {
        TemplateHooks::default()
    }

    pub fn register<F>(&mut self, hook: F)
    where
        F: Fn(&TemplateEvent) + Send + Sync + 'static,
    {
        self.hooks.push(Arc::new(hook));
    }

    pub fn trigger(&self, event: &TemplateEvent) {
        for hook in &self.hooks {
            hook(event);
        }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn hooks_trigger_in_registration_order() {
        let mut hooks = TemplateHooks::new();
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let l1 = log.clone();
        let l2 = log.clone();
        hooks.register(move |_| l1.lock().unwrap().push(1));
        hooks.register(move |_| l2.lock().unwrap().push(2));
        hooks.trigger(&TemplateEvent::Learned {
            tid: 256,
            internal: false,
        });
        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn empty_hooks_container() {
        let hooks = TemplateHooks::new();
        assert!(hooks.is_empty());
        assert_eq!(hooks.len(), 0);
    }

    #[test]
    fn counts_accumulate_across_triggers() {
        let mut hooks = TemplateHooks::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        hooks.register(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        hooks.trigger(&TemplateEvent::Revoked { tid: 300 });
        hooks.trigger(&TemplateEvent::Revoked { tid: 300 });
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
