//! Component instances and their hook slot store.
//!
//! An [`Instance`] owns every hook record of one mounted component. Records
//! are kept in an append-only array and identified by call order: the Nth
//! hook call of a render always maps to slot N.

use crate::error::{HookError, Result};
use crate::hooks::ContextId;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};

/// The collaborator that mounted an instance.
pub trait InstanceHost {
    /// Request an asynchronous re-render of `instance`.
    fn request_update(&self, instance: &Instance);

    /// Read the value provided for a context, if any.
    fn read_context(&self, _context: ContextId) -> Option<Rc<dyn Any>> {
        None
    }
}

/// A zero-argument lifecycle callback.
pub type LifecycleHandler = Rc<dyn Fn()>;

/// Unique identifier for an instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct InstanceId(pub usize);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

static NEXT_INSTANCE_ID: AtomicUsize = AtomicUsize::new(0);

fn next_instance_id() -> InstanceId {
    InstanceId(NEXT_INSTANCE_ID.fetch_add(1, Ordering::SeqCst))
}

/// The kind of record stored in a slot.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HookKind {
    State,
    Reducer,
    Ref,
    Memo,
    Effect,
    LayoutEffect,
}

impl HookKind {
    /// Name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            HookKind::State => "use_state",
            HookKind::Reducer => "use_reducer",
            HookKind::Ref => "use_ref",
            HookKind::Memo => "use_memo",
            HookKind::Effect => "use_effect",
            HookKind::LayoutEffect => "use_layout_effect",
        }
    }
}

/// Metadata about a hook slot, for inspection tooling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookMeta {
    /// The hook family that owns the slot.
    pub hook_type: &'static str,
    /// The type of the stored record.
    pub value_type: &'static str,
}

/// Outcome of claiming a slot.
pub(crate) enum Slot<S> {
    /// The slot already holds a record from an earlier render.
    Occupied(Rc<S>),
    /// First call at this index; the record must be created.
    Vacant(usize),
}

struct HookSlot {
    kind: HookKind,
    value_type: &'static str,
    value: Rc<dyn Any>,
}

/// Slot array plus the per-render cursor.
#[derive(Default)]
struct HookSlots {
    slots: Vec<HookSlot>,
    cursor: usize,
    /// Hook count of the last completed render.
    expected_count: Option<usize>,
    render_count: usize,
}

#[derive(Default)]
struct Lifecycle {
    did_mount: Vec<LifecycleHandler>,
    did_update: Vec<LifecycleHandler>,
    will_unmount: Vec<LifecycleHandler>,
}

pub(crate) struct InstanceInner {
    id: InstanceId,
    hooks: RefCell<HookSlots>,
    render_scheduled: Cell<bool>,
    lifecycle: RefCell<Lifecycle>,
    host: Rc<dyn InstanceHost>,
}

/// A mounted component's hook state.
///
/// Cloning yields another handle to the same instance.
#[derive(Clone)]
pub struct Instance {
    inner: Rc<InstanceInner>,
}

impl Instance {
    /// Create an instance with no hooks, owned by `host`.
    pub fn new(host: Rc<dyn InstanceHost>) -> Self {
        Self {
            inner: Rc::new(InstanceInner {
                id: next_instance_id(),
                hooks: RefCell::new(HookSlots::default()),
                render_scheduled: Cell::new(false),
                lifecycle: RefCell::new(Lifecycle::default()),
                host,
            }),
        }
    }

    pub fn id(&self) -> InstanceId {
        self.inner.id
    }

    /// Whether both handles refer to the same instance.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<InstanceInner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<InstanceInner>) -> Option<Instance> {
        weak.upgrade().map(|inner| Instance { inner })
    }

    /// Number of allocated hook slots.
    pub fn hook_count(&self) -> usize {
        self.inner.hooks.borrow().slots.len()
    }

    /// Number of completed renders.
    pub fn render_count(&self) -> usize {
        self.inner.hooks.borrow().render_count
    }

    /// Whether a render-phase update asked for the current render to restart.
    pub fn is_render_scheduled(&self) -> bool {
        self.inner.render_scheduled.get()
    }

    pub(crate) fn schedule_render(&self) {
        self.inner.render_scheduled.set(true);
    }

    /// Ask the host for an asynchronous re-render.
    pub fn update(&self) {
        self.inner.host.request_update(self);
    }

    pub(crate) fn read_context(&self, context: ContextId) -> Option<Rc<dyn Any>> {
        self.inner.host.read_context(context)
    }

    /// Reset the cursor and the restart flag before a render.
    pub(crate) fn begin_render(&self) {
        self.inner.hooks.borrow_mut().cursor = 0;
        self.inner.render_scheduled.set(false);
    }

    /// Finish a render, optionally verifying the hook count.
    pub(crate) fn end_render(&self, check_count: bool) -> Result<()> {
        let mut hooks = self.inner.hooks.borrow_mut();
        let actual = hooks.cursor;
        if check_count
            && let Some(expected) = hooks.expected_count
            && actual != expected
        {
            return Err(HookError::HookCountMismatch {
                expected,
                actual,
                render: hooks.render_count,
            });
        }
        hooks.expected_count = Some(actual);
        hooks.render_count += 1;
        Ok(())
    }

    /// Claim the next slot: returns its index and whether it is new.
    pub(crate) fn next_slot(&self) -> (usize, bool) {
        let mut hooks = self.inner.hooks.borrow_mut();
        let index = hooks.cursor;
        hooks.cursor += 1;
        (index, index >= hooks.slots.len())
    }

    /// Claim the next slot and return the record stored there, if any.
    pub(crate) fn claim_slot<S: Any>(&self, kind: HookKind, check_order: bool) -> Result<Slot<S>> {
        let (index, is_first) = self.next_slot();
        if is_first {
            return Ok(Slot::Vacant(index));
        }

        let (stored_kind, value) = {
            let hooks = self.inner.hooks.borrow();
            let slot = &hooks.slots[index];
            (slot.kind, Rc::clone(&slot.value))
        };
        if check_order && stored_kind != kind {
            return Err(HookError::HookOrderMismatch {
                index,
                previous: stored_kind.name(),
                current: kind.name(),
            });
        }
        value
            .downcast::<S>()
            .map(Slot::Occupied)
            .map_err(|_| HookError::SlotTypeMismatch {
                index,
                expected: std::any::type_name::<S>(),
            })
    }

    /// Store `record` in the vacant slot `index`.
    pub(crate) fn fill_slot<S: Any>(&self, index: usize, kind: HookKind, record: S) -> Result<Rc<S>> {
        let mut hooks = self.inner.hooks.borrow_mut();
        if hooks.slots.len() != index {
            return Err(HookError::SlotTypeMismatch {
                index,
                expected: std::any::type_name::<S>(),
            });
        }
        let record = Rc::new(record);
        hooks.slots.push(HookSlot {
            kind,
            value_type: std::any::type_name::<S>(),
            value: Rc::clone(&record) as Rc<dyn Any>,
        });
        tracing::trace!(instance = %self.inner.id, index, hook = kind.name(), "allocated hook slot");
        Ok(record)
    }

    /// Get the record at the next slot, creating it with `init` on first call.
    ///
    /// The initializer runs without the slot array borrowed.
    pub(crate) fn use_slot<S: Any>(
        &self,
        kind: HookKind,
        check_order: bool,
        init: impl FnOnce() -> S,
    ) -> Result<(Rc<S>, bool)> {
        match self.claim_slot(kind, check_order)? {
            Slot::Occupied(record) => Ok((record, false)),
            Slot::Vacant(index) => Ok((self.fill_slot(index, kind, init())?, true)),
        }
    }

    /// Debug information about every allocated slot.
    pub fn hooks_debug_info(&self) -> Vec<HookMeta> {
        self.inner
            .hooks
            .borrow()
            .slots
            .iter()
            .map(|slot| HookMeta {
                hook_type: slot.kind.name(),
                value_type: slot.value_type,
            })
            .collect()
    }

    /// Register a handler for [`did_mount`](Self::did_mount).
    pub fn on_did_mount(&self, handler: LifecycleHandler) {
        self.inner.lifecycle.borrow_mut().did_mount.push(handler);
    }

    /// Register a handler for [`did_update`](Self::did_update).
    pub fn on_did_update(&self, handler: LifecycleHandler) {
        self.inner.lifecycle.borrow_mut().did_update.push(handler);
    }

    /// Register a handler for [`will_unmount`](Self::will_unmount).
    pub fn on_will_unmount(&self, handler: LifecycleHandler) {
        self.inner.lifecycle.borrow_mut().will_unmount.push(handler);
    }

    /// Run mount handlers in registration order. Called once after the
    /// first render is committed.
    pub fn did_mount(&self) {
        let handlers = self.inner.lifecycle.borrow().did_mount.clone();
        run_handlers(&handlers);
    }

    /// Run update handlers in registration order. Called after every
    /// later render is committed.
    pub fn did_update(&self) {
        let handlers = self.inner.lifecycle.borrow().did_update.clone();
        run_handlers(&handlers);
    }

    /// Run unmount handlers in registration order. Called once at teardown.
    pub fn will_unmount(&self) {
        let handlers = self.inner.lifecycle.borrow().will_unmount.clone();
        run_handlers(&handlers);
    }
}

fn run_handlers(handlers: &[LifecycleHandler]) {
    for handler in handlers {
        handler();
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.inner.id)
            .field("hooks", &self.hook_count())
            .field("render_scheduled", &self.inner.render_scheduled.get())
            .finish()
    }
}
