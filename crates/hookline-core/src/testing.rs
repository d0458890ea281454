//! Test doubles shared by the unit tests.

use crate::hooks::ContextId;
use crate::instance::{Instance, InstanceHost};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

/// Host that counts update requests and serves provided context values.
#[derive(Default)]
pub(crate) struct RecordingHost {
    updates: Cell<usize>,
    contexts: RefCell<HashMap<ContextId, Rc<dyn Any>>>,
}

impl RecordingHost {
    pub(crate) fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub(crate) fn update_count(&self) -> usize {
        self.updates.get()
    }

    pub(crate) fn provide<T: Any>(&self, context: ContextId, value: T) {
        self.contexts.borrow_mut().insert(context, Rc::new(value));
    }
}

impl InstanceHost for RecordingHost {
    fn request_update(&self, _instance: &Instance) {
        self.updates.set(self.updates.get() + 1);
    }

    fn read_context(&self, context: ContextId) -> Option<Rc<dyn Any>> {
        self.contexts.borrow().get(&context).cloned()
    }
}
