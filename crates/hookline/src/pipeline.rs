//! Headless render pipeline.
//!
//! [`Pipeline`] owns a set of mounted components and drives them through
//! the hook engine: it renders them, commits lifecycle events, runs passive
//! effects before each render pass, and re-renders whatever requested an
//! update. Output is kept in memory, which makes the pipeline useful for
//! tests and for hosts that do their own presentation.

use hookline_core::{
    Context, ContextId, EngineConfig, HookError, HookMeta, Hooks, Instance, InstanceHost,
    PassiveEffectQueue, Runtime,
};
use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Default bound on [`Pipeline::run_until_idle`].
pub const DEFAULT_MAX_FLUSH_PASSES: usize = 100;

/// Errors raised while driving components.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error(transparent)]
    Hook(#[from] HookError),

    #[error("no mounted component with id {0}")]
    UnknownComponent(ComponentId),

    #[error("still rendering after {passes} flush passes")]
    NotIdle { passes: usize },
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Settings handed to the hook engine.
    pub engine: EngineConfig,
    /// Maximum number of passes [`Pipeline::run_until_idle`] performs.
    pub max_flush_passes: usize,
}

impl PipelineConfig {
    pub fn engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn max_flush_passes(mut self, passes: usize) -> Self {
        self.max_flush_passes = passes;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            max_flush_passes: DEFAULT_MAX_FLUSH_PASSES,
        }
    }
}

/// Identifies a mounted component within one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentId(pub usize);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

/// State shared between the pipeline and the hosts of its instances.
#[derive(Default)]
struct Shared {
    dirty: RefCell<VecDeque<ComponentId>>,
    contexts: RefCell<HashMap<ContextId, Rc<dyn Any>>>,
}

impl Shared {
    fn mark_dirty(&self, id: ComponentId) {
        let mut dirty = self.dirty.borrow_mut();
        if !dirty.contains(&id) {
            dirty.push_back(id);
        }
    }

    fn is_dirty(&self, id: ComponentId) -> bool {
        self.dirty.borrow().contains(&id)
    }

    fn forget(&self, id: ComponentId) {
        self.dirty.borrow_mut().retain(|pending| *pending != id);
    }
}

struct ComponentHost {
    id: ComponentId,
    shared: Rc<Shared>,
}

impl InstanceHost for ComponentHost {
    fn request_update(&self, _instance: &Instance) {
        tracing::trace!(component = %self.id, "update requested");
        self.shared.mark_dirty(self.id);
    }

    fn read_context(&self, context: ContextId) -> Option<Rc<dyn Any>> {
        self.shared.contexts.borrow().get(&context).cloned()
    }
}

type RenderFn<O> = Box<dyn FnMut(&Hooks<'_>) -> hookline_core::Result<O>>;

struct Component<O> {
    instance: Instance,
    render: RenderFn<O>,
    output: O,
}

/// Mounts components and keeps them rendered.
///
/// # Example
///
/// ```
/// use hookline::pipeline::Pipeline;
///
/// let mut pipeline = Pipeline::default();
/// let id = pipeline.mount(|hooks| {
///     let (name, _set_name) = hooks.use_state(|| "world".to_string())?;
///     Ok(format!("hello {name}"))
/// })?;
/// assert_eq!(pipeline.output(id).map(String::as_str), Some("hello world"));
/// # Ok::<(), hookline::pipeline::PipelineError>(())
/// ```
pub struct Pipeline<O = String> {
    runtime: Runtime,
    queue: Rc<PassiveEffectQueue>,
    shared: Rc<Shared>,
    components: BTreeMap<ComponentId, Component<O>>,
    next_id: usize,
    max_flush_passes: usize,
}

impl<O: 'static> Pipeline<O> {
    pub fn new(config: PipelineConfig) -> Self {
        let queue = Rc::new(PassiveEffectQueue::new());
        Self {
            runtime: Runtime::new(queue.clone(), config.engine),
            queue,
            shared: Rc::new(Shared::default()),
            components: BTreeMap::new(),
            next_id: 0,
            max_flush_passes: config.max_flush_passes,
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Render a new component and commit its mount.
    pub fn mount(
        &mut self,
        render: impl FnMut(&Hooks<'_>) -> hookline_core::Result<O> + 'static,
    ) -> Result<ComponentId> {
        let id = ComponentId(self.next_id);
        self.next_id += 1;

        let instance = Instance::new(Rc::new(ComponentHost {
            id,
            shared: Rc::clone(&self.shared),
        }));
        let mut render: RenderFn<O> = Box::new(render);

        self.runtime.flush_passive_effects();
        let output = self.runtime.render(&instance, |hooks| render(hooks))?;
        self.components.insert(
            id,
            Component {
                instance: instance.clone(),
                render,
                output,
            },
        );
        instance.did_mount();
        tracing::debug!(component = %id, hooks = instance.hook_count(), "mounted");
        Ok(id)
    }

    /// Perform one render pass.
    ///
    /// Passive effects queued so far run first. Then every component that
    /// requested an update is rendered again, in request order, and its
    /// update is committed. Returns how many components were rendered.
    pub fn flush(&mut self) -> Result<usize> {
        self.runtime.flush_passive_effects();

        let mut pending: VecDeque<ComponentId> = self.shared.dirty.take();
        let mut rendered = 0;
        while let Some(id) = pending.pop_front() {
            let Some(component) = self.components.get_mut(&id) else {
                continue;
            };
            let output = match self
                .runtime
                .render(&component.instance, |hooks| (component.render)(hooks))
            {
                Ok(output) => output,
                Err(err) => {
                    for rest in pending {
                        self.shared.mark_dirty(rest);
                    }
                    tracing::warn!(component = %id, error = %err, "render failed");
                    return Err(err.into());
                }
            };
            component.output = output;
            component.instance.did_update();
            rendered += 1;
        }

        if rendered > 0 {
            tracing::debug!(rendered, "render pass complete");
        }
        Ok(rendered)
    }

    /// Flush until no component is dirty and no passive effect is queued.
    ///
    /// Returns the total number of renders performed.
    pub fn run_until_idle(&mut self) -> Result<usize> {
        let mut total = 0;
        for _ in 0..self.max_flush_passes {
            if !self.has_pending_work() {
                return Ok(total);
            }
            total += self.flush()?;
        }

        if self.has_pending_work() {
            tracing::warn!(passes = self.max_flush_passes, "pipeline did not settle");
            return Err(PipelineError::NotIdle {
                passes: self.max_flush_passes,
            });
        }
        Ok(total)
    }

    /// Tear a component down.
    ///
    /// Cleanups run before this returns, including passive ones.
    pub fn unmount(&mut self, id: ComponentId) -> Result<()> {
        let component = self
            .components
            .remove(&id)
            .ok_or(PipelineError::UnknownComponent(id))?;

        component.instance.will_unmount();
        self.shared.forget(id);
        drop(component);
        self.runtime.flush_passive_effects();
        tracing::debug!(component = %id, "unmounted");
        Ok(())
    }

    /// Output of the component's latest render.
    pub fn output(&self, id: ComponentId) -> Option<&O> {
        self.components.get(&id).map(|component| &component.output)
    }

    /// Whether the component is waiting for a render.
    pub fn is_dirty(&self, id: ComponentId) -> bool {
        self.shared.is_dirty(id)
    }

    pub fn hooks_debug_info(&self, id: ComponentId) -> Option<Vec<HookMeta>> {
        self.components
            .get(&id)
            .map(|component| component.instance.hooks_debug_info())
    }

    /// Provide `value` for `context` to every component.
    ///
    /// Mounted components are queued for a render so they pick it up.
    pub fn provide_context<T: Any>(&mut self, context: &Context<T>, value: T) {
        self.shared
            .contexts
            .borrow_mut()
            .insert(context.id(), Rc::new(value));
        for id in self.components.keys() {
            self.shared.mark_dirty(*id);
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    fn has_pending_work(&self) -> bool {
        !self.shared.dirty.borrow().is_empty() || !self.queue.is_empty()
    }
}

impl<O: 'static> Default for Pipeline<O> {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}

impl<O> fmt::Debug for Pipeline<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("components", &self.components.len())
            .field("dirty", &self.shared.dirty.borrow().len())
            .field("queued_effects", &self.queue.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hookline_core::{Dispatch, HookKind, SetState, deps};
    use std::cell::Cell;

    type Log = Rc<RefCell<Vec<String>>>;
    type Captured<T> = Rc<RefCell<Option<T>>>;

    fn pipeline() -> Pipeline<String> {
        Pipeline::default()
    }

    fn captured<T>() -> Captured<T> {
        Rc::new(RefCell::new(None))
    }

    fn counter(
        setter: Captured<SetState<u32>>,
    ) -> impl FnMut(&Hooks<'_>) -> hookline_core::Result<String> {
        move |hooks| {
            let (count, set_count) = hooks.use_state(|| 0_u32)?;
            *setter.borrow_mut() = Some(set_count);
            Ok(count.to_string())
        }
    }

    fn setter_of<T: Clone>(slot: &Captured<T>) -> T {
        slot.borrow().clone().unwrap()
    }

    #[test]
    fn mount_renders_and_stores_output() {
        let mut pipeline = pipeline();
        let id = pipeline.mount(counter(captured())).unwrap();

        assert_eq!(pipeline.output(id).unwrap(), "0");
        assert!(!pipeline.is_dirty(id));
        assert_eq!(pipeline.len(), 1);
    }

    #[test]
    fn setter_marks_dirty_and_flush_rerenders() {
        let mut pipeline = pipeline();
        let slot = captured();
        let id = pipeline.mount(counter(slot.clone())).unwrap();
        let set_count = setter_of(&slot);

        set_count.set(1);
        assert!(pipeline.is_dirty(id));
        assert_eq!(pipeline.output(id).unwrap(), "0");

        assert_eq!(pipeline.flush().unwrap(), 1);
        assert_eq!(pipeline.output(id).unwrap(), "1");
        assert!(!pipeline.is_dirty(id));
    }

    #[test]
    fn repeated_updates_render_once() {
        let mut pipeline = pipeline();
        let slot = captured();
        let id = pipeline.mount(counter(slot.clone())).unwrap();
        let set_count = setter_of(&slot);

        set_count.update(|n| n + 1);
        set_count.update(|n| n + 1);
        set_count.update(|n| n + 1);

        assert_eq!(pipeline.flush().unwrap(), 1);
        assert_eq!(pipeline.output(id).unwrap(), "3");
    }

    #[test]
    fn same_value_does_not_dirty() {
        let mut pipeline = pipeline();
        let slot = captured();
        let id = pipeline.mount(counter(slot.clone())).unwrap();

        setter_of(&slot).set(0);
        assert!(!pipeline.is_dirty(id));
        assert_eq!(pipeline.flush().unwrap(), 0);
    }

    #[test]
    fn render_phase_updates_settle_before_output() {
        let mut pipeline = pipeline();
        let renders = Rc::new(Cell::new(0));

        let seen = Rc::clone(&renders);
        let id = pipeline
            .mount(move |hooks| {
                seen.set(seen.get() + 1);
                let (count, set_count) = hooks.use_state(|| 0_u32)?;
                if count < 3 {
                    set_count.set(count + 1);
                }
                Ok(count.to_string())
            })
            .unwrap();

        assert_eq!(pipeline.output(id).unwrap(), "3");
        assert_eq!(renders.get(), 4);
        assert!(!pipeline.is_dirty(id));
    }

    #[test]
    fn passive_effects_run_before_next_pass() {
        let mut pipeline = pipeline();
        let log: Log = Rc::new(RefCell::new(Vec::new()));

        let effect_log = Rc::clone(&log);
        pipeline
            .mount(move |hooks| {
                let log = Rc::clone(&effect_log);
                hooks.use_effect(move || log.borrow_mut().push("effect".into()), Some(deps![]))?;
                Ok(String::new())
            })
            .unwrap();

        assert!(log.borrow().is_empty());
        pipeline.flush().unwrap();
        assert_eq!(*log.borrow(), vec!["effect"]);
    }

    #[test]
    fn effect_lifecycle_follows_mount_update_unmount() {
        let mut pipeline = pipeline();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let slot = captured();

        let effect_log = Rc::clone(&log);
        let setter = slot.clone();
        let id = pipeline
            .mount(move |hooks| {
                let (page, set_page) = hooks.use_state(|| 1_u32)?;
                *setter.borrow_mut() = Some(set_page);
                let log = Rc::clone(&effect_log);
                hooks.use_effect_cleanup(
                    move || {
                        log.borrow_mut().push(format!("subscribe {page}"));
                        move || log.borrow_mut().push(format!("unsubscribe {page}"))
                    },
                    Some(deps![page]),
                )?;
                Ok(format!("page {page}"))
            })
            .unwrap();

        pipeline.run_until_idle().unwrap();
        assert_eq!(*log.borrow(), vec!["subscribe 1"]);

        setter_of(&slot).set(2);
        pipeline.run_until_idle().unwrap();
        assert_eq!(pipeline.output(id).unwrap(), "page 2");
        assert_eq!(
            *log.borrow(),
            vec!["subscribe 1", "unsubscribe 1", "subscribe 2"]
        );

        pipeline.unmount(id).unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["subscribe 1", "unsubscribe 1", "subscribe 2", "unsubscribe 2"]
        );
        assert!(pipeline.output(id).is_none());
        assert!(pipeline.is_empty());
    }

    #[test]
    fn unchanged_deps_keep_effects_alive_across_renders() {
        let mut pipeline = pipeline();
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let tick_slot = captured();

        let effect_log = Rc::clone(&log);
        let ticker = tick_slot.clone();
        let id = pipeline
            .mount(move |hooks| {
                let (page, _) = hooks.use_state(|| 1_u32)?;
                let (tick, set_tick) = hooks.use_state(|| 0_u32)?;
                *ticker.borrow_mut() = Some(set_tick);
                let log = Rc::clone(&effect_log);
                hooks.use_effect_cleanup(
                    move || {
                        log.borrow_mut().push(format!("subscribe {page}"));
                        move || log.borrow_mut().push(format!("unsubscribe {page}"))
                    },
                    Some(deps![page, "x"]),
                )?;
                Ok(format!("page {page} tick {tick}"))
            })
            .unwrap();
        pipeline.run_until_idle().unwrap();

        let set_tick = setter_of(&tick_slot);
        for tick in 1..=3 {
            set_tick.set(tick);
            pipeline.run_until_idle().unwrap();
        }

        assert_eq!(pipeline.output(id).unwrap(), "page 1 tick 3");
        assert_eq!(*log.borrow(), vec!["subscribe 1"]);
    }

    #[test]
    fn memo_is_reused_until_its_inputs_change() {
        let mut pipeline = pipeline();
        let computed = Rc::new(Cell::new(0));
        let page_slot = captured();
        let tick_slot = captured();

        let counter = Rc::clone(&computed);
        let pages = page_slot.clone();
        let ticker = tick_slot.clone();
        let id = pipeline
            .mount(move |hooks| {
                let (page, set_page) = hooks.use_state(|| 1_u32)?;
                let (tick, set_tick) = hooks.use_state(|| 0_u32)?;
                *pages.borrow_mut() = Some(set_page);
                *ticker.borrow_mut() = Some(set_tick);
                let counter = Rc::clone(&counter);
                let title = hooks.use_memo(
                    move || {
                        counter.set(counter.get() + 1);
                        format!("page {page}")
                    },
                    deps![page, "x"],
                )?;
                Ok(format!("{title} tick {tick}"))
            })
            .unwrap();

        setter_of(&tick_slot).set(1);
        setter_of(&tick_slot).set(2);
        pipeline.run_until_idle().unwrap();
        assert_eq!(pipeline.output(id).unwrap(), "page 1 tick 2");
        assert_eq!(computed.get(), 1);

        setter_of(&page_slot).set(2);
        pipeline.run_until_idle().unwrap();
        assert_eq!(pipeline.output(id).unwrap(), "page 2 tick 2");
        assert_eq!(computed.get(), 2);
    }

    #[test]
    fn effect_driven_state_settles() {
        let mut pipeline = pipeline();
        let id = pipeline
            .mount(|hooks| {
                let (loaded, set_loaded) = hooks.use_state(|| false)?;
                hooks.use_effect(move || set_loaded.set(true), Some(deps![]))?;
                Ok(if loaded { "ready" } else { "loading" }.to_string())
            })
            .unwrap();

        assert_eq!(pipeline.output(id).unwrap(), "loading");
        assert_eq!(pipeline.run_until_idle().unwrap(), 1);
        assert_eq!(pipeline.output(id).unwrap(), "ready");
    }

    #[test]
    fn runaway_effects_are_reported() {
        let mut pipeline: Pipeline<String> =
            Pipeline::new(PipelineConfig::default().max_flush_passes(5));
        pipeline
            .mount(|hooks| {
                let (n, set_n) = hooks.use_state(|| 0_u64)?;
                hooks.use_effect(move || set_n.set(n + 1), None)?;
                Ok(n.to_string())
            })
            .unwrap();

        assert_eq!(
            pipeline.run_until_idle(),
            Err(PipelineError::NotIdle { passes: 5 })
        );
    }

    #[test]
    fn reducer_dispatch_from_outside() {
        let mut pipeline = pipeline();
        let slot: Captured<Dispatch<i64>> = captured();

        let dispatcher = slot.clone();
        let id = pipeline
            .mount(move |hooks| {
                let (total, dispatch) = hooks.use_reducer(|sum: i64, n: i64| sum + n, 0, None)?;
                *dispatcher.borrow_mut() = Some(dispatch);
                Ok(total.to_string())
            })
            .unwrap();

        let dispatch = setter_of(&slot);
        dispatch.dispatch(5);
        dispatch.dispatch(-2);
        pipeline.flush().unwrap();
        assert_eq!(pipeline.output(id).unwrap(), "3");
    }

    #[test]
    fn provided_context_reaches_components() {
        let mut pipeline = pipeline();
        let theme = Context::new("light");

        let consumer = theme.clone();
        let id = pipeline
            .mount(move |hooks| Ok(hooks.use_context(&consumer)?.to_string()))
            .unwrap();
        assert_eq!(pipeline.output(id).unwrap(), "light");

        pipeline.provide_context(&theme, "dark");
        assert!(pipeline.is_dirty(id));
        pipeline.flush().unwrap();
        assert_eq!(pipeline.output(id).unwrap(), "dark");
    }

    #[test]
    fn unknown_component_is_an_error() {
        let mut pipeline = pipeline();
        let id = pipeline.mount(counter(captured())).unwrap();
        pipeline.unmount(id).unwrap();

        assert_eq!(
            pipeline.unmount(id),
            Err(PipelineError::UnknownComponent(id))
        );
    }

    #[test]
    fn updates_after_unmount_are_ignored() {
        let mut pipeline = pipeline();
        let slot = captured();
        let id = pipeline.mount(counter(slot.clone())).unwrap();
        let set_count = setter_of(&slot);
        slot.borrow_mut().take();
        pipeline.unmount(id).unwrap();

        set_count.set(9);
        assert!(!pipeline.is_dirty(id));
        assert_eq!(pipeline.flush().unwrap(), 0);
    }

    #[test]
    fn debug_info_lists_hooks() {
        let mut pipeline = pipeline();
        let id = pipeline
            .mount(|hooks| {
                hooks.use_state(|| 0_u8)?;
                hooks.use_ref(|| 0_u8)?;
                hooks.use_effect(|| {}, None)?;
                Ok(String::new())
            })
            .unwrap();

        let kinds: Vec<&str> = pipeline
            .hooks_debug_info(id)
            .unwrap()
            .iter()
            .map(|meta| meta.hook_type)
            .collect();
        assert_eq!(
            kinds,
            vec![
                HookKind::State.name(),
                HookKind::Ref.name(),
                HookKind::Effect.name()
            ]
        );
    }

    #[test]
    fn render_errors_surface_as_hook_errors() {
        let mut pipeline: Pipeline<String> = Pipeline::new(
            PipelineConfig::default()
                .engine(EngineConfig::default().max_render_restarts(Some(2))),
        );
        let result = pipeline.mount(|hooks| {
            let (n, set_n) = hooks.use_state(|| 0_u32)?;
            set_n.set(n + 1);
            Ok(String::new())
        });

        assert_eq!(
            result,
            Err(PipelineError::Hook(HookError::TooManyRenderRestarts {
                limit: 2
            }))
        );
        assert!(pipeline.is_empty());
    }
}
