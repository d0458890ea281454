//! Counter demo: mounts a reducer-driven component, dispatches a few
//! actions and unmounts it, logging each commit.

use hookline::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

enum Action {
    Increment,
    Add(i64),
    Reset,
}

fn reduce(count: i64, action: Action) -> i64 {
    match action {
        Action::Increment => count + 1,
        Action::Add(n) => count + n,
        Action::Reset => 0,
    }
}

fn main() -> Result<(), PipelineError> {
    hookline::init_tracing();

    let mut pipeline = Pipeline::default();
    let dispatcher: Rc<RefCell<Option<Dispatch<Action>>>> = Rc::new(RefCell::new(None));

    let slot = Rc::clone(&dispatcher);
    let id = pipeline.mount(move |hooks| {
        let (count, dispatch) = hooks.use_reducer(reduce, 0, None)?;
        *slot.borrow_mut() = Some(dispatch);

        let parity = hooks.use_memo(
            || if count % 2 == 0 { "even" } else { "odd" },
            deps![count],
        )?;

        hooks.use_effect_cleanup(
            move || {
                tracing::info!(count, "count committed");
                move || tracing::info!(count, "count replaced")
            },
            Some(deps![count]),
        )?;

        Ok(format!("count = {count} ({parity})"))
    })?;
    pipeline.run_until_idle()?;
    println!("{}", pipeline.output(id).map(String::as_str).unwrap_or_default());

    let Some(dispatch) = dispatcher.borrow().clone() else {
        return Ok(());
    };
    for action in [Action::Increment, Action::Add(4), Action::Increment, Action::Reset] {
        dispatch.dispatch(action);
        pipeline.run_until_idle()?;
        println!("{}", pipeline.output(id).map(String::as_str).unwrap_or_default());
    }

    pipeline.unmount(id)?;
    Ok(())
}
