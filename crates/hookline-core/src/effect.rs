//! Effect hooks: side effects that run after a render is committed.
//!
//! Two flavours share one implementation:
//!
//! - *layout* effects run synchronously when the host commits a render,
//! - *passive* effects are queued on the runtime's scheduler and run in one
//!   batch before the next render pass (or earlier, when a state update
//!   forces a flush).
//!
//! Each effect hook registers three lifecycle handlers on its instance the
//! first time it is called: setup on mount, teardown on unmount, and a
//! dependency check on every update. Later renders only swap in the newest
//! effect closure and dependency list, so the handlers always run the most
//! recent closure.
//!
//! Effect bodies and cleanups run inside an effect frame. State updates
//! issued from an effect are therefore always treated as requests for a new
//! render, never as restarts of a render in progress.

use crate::equality::{Dep, Deps, SameValue, inputs_changed};
use crate::error::Result;
use crate::hooks::{Hooks, RefHandle};
use crate::instance::{HookKind, Slot};
use crate::runtime::{Frame, Runtime};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Cleanup = Box<dyn FnOnce()>;
type EffectFn = Box<dyn FnOnce() -> Option<Cleanup>>;

/// Stored record of one effect hook.
struct EffectHook {
    deferred: bool,
    runtime: Runtime,
    /// Setup to run next; taken when it runs.
    create: RefCell<Option<EffectFn>>,
    /// Cleanup returned by the last setup; taken when it runs.
    destroy: RefCell<Option<Cleanup>>,
    inputs: RefCell<Deps>,
    prev_inputs: RefCell<Option<Deps>>,
}

impl EffectHook {
    fn create(self: &Rc<Self>, immediately: bool) {
        if !immediately && self.deferred {
            let this = Rc::clone(self);
            self.runtime
                .schedule_before_next_render(Box::new(move || this.create(true)));
            return;
        }

        let Some(effect) = self.create.borrow_mut().take() else {
            return;
        };
        let cleanup = {
            let _frame = self.runtime.enter(Frame::Effect);
            effect()
        };
        *self.destroy.borrow_mut() = cleanup;
        tracing::trace!(deferred = self.deferred, "effect ran");
    }

    fn destroy(self: &Rc<Self>, immediately: bool) {
        if !immediately && self.deferred {
            let this = Rc::clone(self);
            self.runtime
                .schedule_before_next_render(Box::new(move || this.destroy(true)));
            return;
        }

        let Some(cleanup) = self.destroy.borrow_mut().take() else {
            return;
        };
        let _frame = self.runtime.enter(Frame::Effect);
        cleanup();
        tracing::trace!(deferred = self.deferred, "effect cleaned up");
    }

    /// Re-run the effect if its dependencies changed since the last render.
    fn commit_update(self: &Rc<Self>) {
        let changed = {
            let prev = self.prev_inputs.borrow();
            inputs_changed(prev.as_deref(), &self.inputs.borrow())
        };
        if changed {
            self.destroy(false);
            self.create(false);
        }
    }
}

impl<'a> Hooks<'a> {
    /// Run a passive side effect after render when `deps` change.
    ///
    /// With `deps` set to `None` the effect runs after every render; with an
    /// empty list it runs once after mount.
    ///
    /// # Example
    ///
    /// ```ignore
    /// hooks.use_effect(move || println!("count is {count}"), Some(deps![count]))?;
    /// ```
    pub fn use_effect(&self, effect: impl FnOnce() + 'static, deps: Option<Deps>) -> Result<()> {
        self.use_effect_impl(without_cleanup(effect), deps, true)
    }

    /// Like [`use_effect`](Self::use_effect), but the effect returns a
    /// cleanup that runs before the next effect run and on unmount.
    ///
    /// # Example
    ///
    /// ```ignore
    /// hooks.use_effect_cleanup(
    ///     move || {
    ///         let subscription = subscribe(id);
    ///         move || subscription.cancel()
    ///     },
    ///     Some(deps![id]),
    /// )?;
    /// ```
    pub fn use_effect_cleanup<C>(
        &self,
        effect: impl FnOnce() -> C + 'static,
        deps: Option<Deps>,
    ) -> Result<()>
    where
        C: FnOnce() + 'static,
    {
        self.use_effect_impl(with_cleanup(effect), deps, true)
    }

    /// Run a side effect synchronously when the render is committed.
    pub fn use_layout_effect(
        &self,
        effect: impl FnOnce() + 'static,
        deps: Option<Deps>,
    ) -> Result<()> {
        self.use_effect_impl(without_cleanup(effect), deps, false)
    }

    /// Layout-effect counterpart of [`use_effect_cleanup`](Self::use_effect_cleanup).
    pub fn use_layout_effect_cleanup<C>(
        &self,
        effect: impl FnOnce() -> C + 'static,
        deps: Option<Deps>,
    ) -> Result<()>
    where
        C: FnOnce() + 'static,
    {
        self.use_effect_impl(with_cleanup(effect), deps, false)
    }

    /// Run a passive effect once after mount; its cleanup runs on unmount.
    pub fn use_mount<C>(&self, effect: impl FnOnce() -> C + 'static) -> Result<()>
    where
        C: FnOnce() + 'static,
    {
        self.use_effect_cleanup(effect, Some(Deps::new()))
    }

    /// Expose a value through a ref passed in by a parent.
    ///
    /// The value is produced by `create` in a layout effect and cleared when
    /// the effect is torn down. The ref itself is appended to `inputs`, so
    /// handing in a different ref rebinds the value.
    pub fn use_imperative_handle<T: 'static>(
        &self,
        target: &ForwardedRef<T>,
        create: impl FnOnce() -> T + 'static,
        inputs: Option<Deps>,
    ) -> Result<()> {
        let deps = inputs.map(|mut deps| {
            deps.push(Dep::new(target.clone()));
            deps
        });
        let target = target.clone();
        self.use_layout_effect_cleanup(
            move || {
                target.attach(create());
                move || target.detach()
            },
            deps,
        )
    }

    fn use_effect_impl(&self, effect: EffectFn, deps: Option<Deps>, deferred: bool) -> Result<()> {
        // Without a dependency list every render's closure counts as new.
        let inputs = deps.unwrap_or_else(|| vec![Dep::identity()]);
        let kind = if deferred {
            HookKind::Effect
        } else {
            HookKind::LayoutEffect
        };

        match self.claim::<EffectHook>(kind)? {
            Slot::Vacant(index) => {
                let hook = self.fill(
                    index,
                    kind,
                    EffectHook {
                        deferred,
                        runtime: self.runtime().clone(),
                        create: RefCell::new(Some(effect)),
                        destroy: RefCell::new(None),
                        prev_inputs: RefCell::new(Some(inputs.clone())),
                        inputs: RefCell::new(inputs),
                    },
                )?;

                let instance = self.instance();
                let on_mount = Rc::clone(&hook);
                instance.on_did_mount(Rc::new(move || on_mount.create(false)));
                let on_unmount = Rc::clone(&hook);
                instance.on_will_unmount(Rc::new(move || on_unmount.destroy(false)));
                instance.on_did_update(Rc::new(move || hook.commit_update()));
            }
            Slot::Occupied(hook) => {
                let previous = hook.inputs.replace(inputs);
                *hook.prev_inputs.borrow_mut() = Some(previous);
                *hook.create.borrow_mut() = Some(effect);
            }
        }
        Ok(())
    }
}

fn without_cleanup(effect: impl FnOnce() + 'static) -> EffectFn {
    Box::new(move || {
        effect();
        None
    })
}

fn with_cleanup<C: FnOnce() + 'static>(effect: impl FnOnce() -> C + 'static) -> EffectFn {
    Box::new(move || Some(Box::new(effect()) as Cleanup))
}

/// A ref handed to [`Hooks::use_imperative_handle`].
pub enum ForwardedRef<T> {
    /// Called with the value on attach and with `None` on detach.
    Callback(Rc<dyn Fn(Option<T>)>),
    /// Holds the value while attached.
    Object(RefHandle<Option<T>>),
}

impl<T> ForwardedRef<T> {
    /// Wrap a callback ref.
    pub fn callback(f: impl Fn(Option<T>) + 'static) -> Self {
        ForwardedRef::Callback(Rc::new(f))
    }

    fn attach(&self, value: T) {
        match self {
            ForwardedRef::Callback(f) => f(Some(value)),
            ForwardedRef::Object(handle) => handle.set(Some(value)),
        }
    }

    fn detach(&self) {
        match self {
            ForwardedRef::Callback(f) => f(None),
            ForwardedRef::Object(handle) => handle.set(None),
        }
    }
}

impl<T> Clone for ForwardedRef<T> {
    fn clone(&self) -> Self {
        match self {
            ForwardedRef::Callback(f) => ForwardedRef::Callback(Rc::clone(f)),
            ForwardedRef::Object(handle) => ForwardedRef::Object(handle.clone()),
        }
    }
}

impl<T> From<RefHandle<Option<T>>> for ForwardedRef<T> {
    fn from(handle: RefHandle<Option<T>>) -> Self {
        ForwardedRef::Object(handle)
    }
}

impl<T> SameValue for ForwardedRef<T> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (ForwardedRef::Callback(a), ForwardedRef::Callback(b)) => Rc::ptr_eq(a, b),
            (ForwardedRef::Object(a), ForwardedRef::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl<T> fmt::Debug for ForwardedRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwardedRef::Callback(_) => f.write_str("ForwardedRef::Callback(..)"),
            ForwardedRef::Object(_) => f.write_str("ForwardedRef::Object(..)"),
        }
    }
}
