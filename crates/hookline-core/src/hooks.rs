//! React-style hooks for keeping state across renders.
//!
//! A render function receives a [`Hooks`] value and calls hooks on it. The
//! Nth hook call of a render always reads and writes slot N of the
//! instance, so hooks must be called in the same order on every render.
//!
//! # Example
//!
//! ```
//! use hookline_core::{deps, Instance, InstanceHost, Runtime};
//! use std::rc::Rc;
//!
//! struct Host;
//! impl InstanceHost for Host {
//!     fn request_update(&self, _instance: &Instance) {}
//! }
//!
//! let runtime = Runtime::default();
//! let instance = Instance::new(Rc::new(Host));
//!
//! let label = runtime.render(&instance, |hooks| {
//!     let (count, _set_count) = hooks.use_state(|| 1_u32)?;
//!     let doubled = hooks.use_memo(|| count * 2, deps![count])?;
//!     Ok(format!("{count} x 2 = {doubled}"))
//! })?;
//! assert_eq!(label, "1 x 2 = 2");
//! # Ok::<(), hookline_core::HookError>(())
//! ```
//!
//! # Rules of Hooks
//!
//! - Call hooks at the top level of the render function.
//! - Don't call hooks inside conditionals, loops or after early returns.
//!
//! Breaking these rules shifts every later hook onto the wrong slot. With
//! [`EngineConfig::check_hook_order`](crate::EngineConfig::check_hook_order)
//! enabled (the default in debug builds), such renders fail with
//! [`HookError::HookCountMismatch`] or [`HookError::HookOrderMismatch`].
//!
//! # Updates
//!
//! [`SetState`] and [`Dispatch`] can be called at any time. Called while
//! their own component renders, the render restarts with the new state.
//! Called later, pending passive effects are flushed first and the host is
//! asked for a new render.

use crate::equality::{Deps, SameValue, inputs_changed};
use crate::error::{HookError, Result};
use crate::instance::{HookKind, Instance, InstanceInner, Slot};
use crate::runtime::Runtime;
use crate::update::{UpdatePhase, route_update};
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Access to hooks for the component currently rendering.
pub struct Hooks<'a> {
    runtime: &'a Runtime,
    instance: &'a Instance,
}

impl<'a> Hooks<'a> {
    pub(crate) fn new(runtime: &'a Runtime, instance: &'a Instance) -> Self {
        Self { runtime, instance }
    }

    pub fn runtime(&self) -> &Runtime {
        self.runtime
    }

    pub fn instance(&self) -> &Instance {
        self.instance
    }

    /// Fail unless this component is the one rendering right now.
    pub(crate) fn ensure_rendering(&self, hook: &'static str) -> Result<()> {
        if self.runtime.is_rendering_instance(self.instance) {
            Ok(())
        } else {
            Err(HookError::InvalidContext { hook })
        }
    }

    pub(crate) fn claim<S: Any>(&self, kind: HookKind) -> Result<Slot<S>> {
        self.ensure_rendering(kind.name())?;
        self.instance
            .claim_slot(kind, self.runtime.config().check_hook_order)
    }

    pub(crate) fn fill<S: Any>(&self, index: usize, kind: HookKind, record: S) -> Result<Rc<S>> {
        self.instance.fill_slot(index, kind, record)
    }

    /// Create or retrieve a state value with a stable setter.
    ///
    /// `init` runs only on the first render. The returned value is a
    /// snapshot; read it again on the next render after setting it.
    pub fn use_state<T>(&self, init: impl FnOnce() -> T) -> Result<(T, SetState<T>)>
    where
        T: Clone + SameValue + 'static,
    {
        self.ensure_rendering("use_state")?;
        let (slot, _) = self.instance.use_slot(
            HookKind::State,
            self.runtime.config().check_hook_order,
            || {
                let cell = Rc::new(RefCell::new(init()));
                StateSlot {
                    setter: SetState {
                        cell: Rc::clone(&cell),
                        owner: self.instance.downgrade(),
                        runtime: self.runtime.clone(),
                    },
                    cell,
                }
            },
        )?;
        let value = slot.cell.borrow().clone();
        Ok((value, slot.setter.clone()))
    }

    /// Create or retrieve reducer-managed state.
    ///
    /// On the first render the state is `initial`, or
    /// `reducer(initial, action)` when `initial_action` is given. Dispatched
    /// actions queue up and are folded into the state, in dispatch order,
    /// the next time this hook runs.
    pub fn use_reducer<S, A, R>(
        &self,
        reducer: R,
        initial: S,
        initial_action: Option<A>,
    ) -> Result<(S, Dispatch<A>)>
    where
        S: Clone + 'static,
        A: 'static,
        R: Fn(S, A) -> S,
    {
        let slot = match self.claim::<ReducerSlot<S, A>>(HookKind::Reducer)? {
            Slot::Occupied(slot) => slot,
            Slot::Vacant(index) => {
                let value = match initial_action {
                    Some(action) => reducer(initial, action),
                    None => initial,
                };
                let queue = Rc::new(RefCell::new(Vec::new()));
                let record = ReducerSlot {
                    value: RefCell::new(value),
                    dispatch: Dispatch {
                        queue: Rc::clone(&queue),
                        owner: self.instance.downgrade(),
                        runtime: self.runtime.clone(),
                    },
                    queue,
                };
                self.fill(index, HookKind::Reducer, record)?
            }
        };

        let actions = std::mem::take(&mut *slot.queue.borrow_mut());
        let mut value = slot.value.borrow().clone();
        for action in actions {
            value = reducer(value, action);
        }
        *slot.value.borrow_mut() = value.clone();
        Ok((value, slot.dispatch.clone()))
    }

    /// Create or retrieve a mutable cell that persists across renders.
    ///
    /// Writing to the cell never triggers a render.
    pub fn use_ref<T: 'static>(&self, init: impl FnOnce() -> T) -> Result<RefHandle<T>> {
        self.ensure_rendering("use_ref")?;
        let (slot, _) = self.instance.use_slot(
            HookKind::Ref,
            self.runtime.config().check_hook_order,
            || RefHandle {
                inner: Rc::new(RefCell::new(init())),
            },
        )?;
        Ok(RefHandle::clone(&slot))
    }

    /// Memoize a computation until `inputs` change.
    ///
    /// `create` runs on the first render and on every render whose inputs
    /// differ from the ones the cached value was computed with.
    pub fn use_memo<T>(&self, create: impl FnOnce() -> T, inputs: Deps) -> Result<T>
    where
        T: Clone + 'static,
    {
        match self.claim::<MemoSlot<T>>(HookKind::Memo)? {
            Slot::Vacant(index) => {
                let value = create();
                self.fill(
                    index,
                    HookKind::Memo,
                    MemoSlot {
                        value: RefCell::new(value.clone()),
                        inputs: RefCell::new(inputs),
                    },
                )?;
                Ok(value)
            }
            Slot::Occupied(slot) => {
                let changed = {
                    let prev = slot.inputs.borrow();
                    inputs_changed(Some(prev.as_slice()), &inputs)
                };
                if changed {
                    let value = create();
                    *slot.value.borrow_mut() = value.clone();
                    *slot.inputs.borrow_mut() = inputs;
                    Ok(value)
                } else {
                    Ok(slot.value.borrow().clone())
                }
            }
        }
    }

    /// Keep the same callback until `inputs` change.
    ///
    /// The returned `Rc` is identical across renders with equal inputs, so
    /// it can itself be used as a dependency.
    pub fn use_callback<F: 'static>(&self, callback: F, inputs: Deps) -> Result<Rc<F>> {
        self.use_memo(move || Rc::new(callback), inputs)
    }

    /// Read a context value provided by the host, falling back to the
    /// context's default. Does not occupy a hook slot.
    pub fn use_context<T: Clone + 'static>(&self, context: &Context<T>) -> Result<T> {
        self.ensure_rendering("use_context")?;
        let provided = self
            .instance
            .read_context(context.id())
            .and_then(|value| value.downcast_ref::<T>().cloned());
        Ok(provided.unwrap_or_else(|| context.default_value().clone()))
    }
}

// ============================================================================
// State
// ============================================================================

struct StateSlot<T> {
    cell: Rc<RefCell<T>>,
    setter: SetState<T>,
}

/// A requested state change.
pub enum Update<T> {
    /// Replace the state with this value.
    Value(T),
    /// Compute the new state from the current one.
    With(Box<dyn FnOnce(&T) -> T>),
}

impl<T> fmt::Debug for Update<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Value(_) => f.write_str("Update::Value(..)"),
            Update::With(_) => f.write_str("Update::With(..)"),
        }
    }
}

/// Setter returned by [`Hooks::use_state`].
///
/// The same setter is returned on every render; clones compare equal.
pub struct SetState<T> {
    cell: Rc<RefCell<T>>,
    owner: Weak<InstanceInner>,
    runtime: Runtime,
}

impl<T: Clone + SameValue + 'static> SetState<T> {
    /// Replace the state.
    pub fn set(&self, value: T) {
        self.apply(Update::Value(value));
    }

    /// Compute the new state from the current one.
    pub fn update(&self, f: impl FnOnce(&T) -> T + 'static) {
        self.apply(Update::With(Box::new(f)));
    }

    /// Apply an update, skipping it when the new value is the same as the
    /// stored one.
    pub fn apply(&self, update: Update<T>) -> UpdatePhase {
        let next = match update {
            Update::Value(value) => value,
            Update::With(f) => {
                let current = self.cell.borrow().clone();
                f(&current)
            }
        };
        if next.same_value(&self.cell.borrow()) {
            return UpdatePhase::Unchanged;
        }
        let cell = Rc::clone(&self.cell);
        route_update(&self.runtime, &self.owner, move || {
            *cell.borrow_mut() = next;
        })
    }

    /// The most recently stored value.
    pub fn get(&self) -> T {
        self.cell.borrow().clone()
    }
}

impl<T> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
            owner: Weak::clone(&self.owner),
            runtime: self.runtime.clone(),
        }
    }
}

impl<T> PartialEq for SetState<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<T> SameValue for SetState<T> {
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

impl<T> fmt::Debug for SetState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetState").finish_non_exhaustive()
    }
}

// ============================================================================
// Reducer
// ============================================================================

struct ReducerSlot<S, A> {
    value: RefCell<S>,
    queue: Rc<RefCell<Vec<A>>>,
    dispatch: Dispatch<A>,
}

/// Dispatcher returned by [`Hooks::use_reducer`].
///
/// Dispatching only queues the action; the reducer runs on the next render.
pub struct Dispatch<A> {
    queue: Rc<RefCell<Vec<A>>>,
    owner: Weak<InstanceInner>,
    runtime: Runtime,
}

impl<A> Dispatch<A> {
    /// Queue `action` and schedule a render.
    pub fn dispatch(&self, action: A) -> UpdatePhase {
        let queue = Rc::clone(&self.queue);
        route_update(&self.runtime, &self.owner, move || {
            queue.borrow_mut().push(action);
        })
    }

    /// Number of actions waiting for the next render.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

impl<A> Clone for Dispatch<A> {
    fn clone(&self) -> Self {
        Self {
            queue: Rc::clone(&self.queue),
            owner: Weak::clone(&self.owner),
            runtime: self.runtime.clone(),
        }
    }
}

impl<A> PartialEq for Dispatch<A> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.queue, &other.queue)
    }
}

impl<A> SameValue for Dispatch<A> {
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

impl<A> fmt::Debug for Dispatch<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("pending", &self.pending())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Ref
// ============================================================================

/// Handle to a ref value created by [`Hooks::use_ref`].
pub struct RefHandle<T> {
    inner: Rc<RefCell<T>>,
}

impl<T> RefHandle<T> {
    /// Create a standalone ref, e.g. to forward into a child component.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(value)),
        }
    }

    /// Get a reference to the current value.
    pub fn borrow(&self) -> std::cell::Ref<'_, T> {
        self.inner.borrow()
    }

    /// Get a mutable reference to the current value.
    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, T> {
        self.inner.borrow_mut()
    }

    /// Set the value directly.
    pub fn set(&self, value: T) {
        *self.inner.borrow_mut() = value;
    }
}

impl<T: Clone> RefHandle<T> {
    /// Get a clone of the current value.
    pub fn get(&self) -> T {
        self.inner.borrow().clone()
    }
}

impl<T> Clone for RefHandle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for RefHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> SameValue for RefHandle<T> {
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }
}

impl<T: fmt::Debug> fmt::Debug for RefHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefHandle")
            .field("current", &*self.inner.borrow())
            .finish()
    }
}

// ============================================================================
// Memo
// ============================================================================

struct MemoSlot<T> {
    value: RefCell<T>,
    inputs: RefCell<Deps>,
}

// ============================================================================
// Context
// ============================================================================

/// Unique identifier for a [`Context`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ContextId(pub usize);

static NEXT_CONTEXT_ID: AtomicUsize = AtomicUsize::new(0);

/// A typed key for values provided by the host, with a fallback default.
///
/// # Example
///
/// ```
/// use hookline_core::Context;
///
/// #[derive(Clone)]
/// struct Theme {
///     dark: bool,
/// }
///
/// let theme = Context::new(Theme { dark: false });
/// assert!(!theme.default_value().dark);
/// ```
pub struct Context<T> {
    id: ContextId,
    default: T,
}

impl<T> Context<T> {
    pub fn new(default: T) -> Self {
        Self {
            id: ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::SeqCst)),
            default,
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    /// The value seen by components when nothing is provided.
    pub fn default_value(&self) -> &T {
        &self.default
    }
}

impl<T: Clone> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            default: self.default.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("default", &self.default)
            .finish()
    }
}
