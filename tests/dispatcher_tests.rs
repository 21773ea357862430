//! Integration tests for the exit event dispatcher.

use simphase::common::{SimError, SimResult, Tick};
use simphase::sim::{
    handler_fn, Decision, ExitCategory, ExitEvent, ExitEventDispatcher, HandlerTask, RunEnd,
    RunOutcome, SimulationEngine, StepSequence, TerminalHandler, UnhandledExit,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Engine that replays a fixed list of outcomes.
struct ScriptedEngine {
    script: VecDeque<SimResult<RunOutcome>>,
    tick: Tick,
    calls: usize,
    bound: Option<Tick>,
}

impl ScriptedEngine {
    fn new(script: Vec<SimResult<RunOutcome>>) -> Self {
        Self {
            script: script.into(),
            tick: 0,
            calls: 0,
            bound: None,
        }
    }
}

impl SimulationEngine for ScriptedEngine {
    fn run_until_pause(&mut self) -> SimResult<RunOutcome> {
        self.calls += 1;
        let outcome = self.script.pop_front().unwrap_or(Ok(RunOutcome::Completed));
        if let Ok(RunOutcome::Paused(event)) = &outcome {
            self.tick = event.tick;
        }
        outcome
    }

    fn current_tick(&self) -> Tick {
        self.tick
    }

    fn read_counter(&self, name: &str) -> Option<f64> {
        match name {
            "final_tick" => Some(self.tick as f64),
            _ => None,
        }
    }

    fn counter_names(&self) -> Vec<String> {
        vec!["final_tick".to_string()]
    }

    fn reset_counters(&mut self) {}

    fn set_tick_bound(&mut self, tick: Tick) {
        self.bound = Some(tick);
    }
}

fn pause(category: ExitCategory, tick: Tick) -> SimResult<RunOutcome> {
    Ok(RunOutcome::Paused(ExitEvent::new(category, "scripted", tick)))
}

type Trace = Rc<RefCell<Vec<String>>>;

fn recorder(trace: &Trace, label: &'static str, decision: Decision) -> impl HandlerTask {
    let trace = trace.clone();
    handler_fn(label, move |event, _sim| {
        trace.borrow_mut().push(format!("{}@{}", label, event.tick));
        Ok(decision)
    })
}

/// Tests that handlers resume in registration order on every recurrence.
#[test]
fn test_registration_order_across_recurrences() {
    let engine = ScriptedEngine::new(vec![
        pause(ExitCategory::Generic, 10),
        pause(ExitCategory::Generic, 20),
        pause(ExitCategory::Generic, 30),
    ]);
    let trace: Trace = Rc::default();
    let mut dispatcher = ExitEventDispatcher::new(engine);
    dispatcher
        .register(ExitCategory::Generic, recorder(&trace, "a", Decision::Continue))
        .register(ExitCategory::Generic, recorder(&trace, "b", Decision::Continue))
        .register(ExitCategory::Generic, recorder(&trace, "c", Decision::Continue));

    let summary = dispatcher.run().unwrap();

    assert_eq!(summary.end, RunEnd::Completed);
    assert_eq!(summary.exits, 3);
    assert_eq!(
        *trace.borrow(),
        vec!["a@10", "b@10", "c@10", "a@20", "b@20", "c@20", "a@30", "b@30", "c@30"]
    );
    assert_eq!(dispatcher.handler_names(ExitCategory::Generic), vec!["a", "b", "c"]);
}

/// Tests that a Stop does not skip the remaining handlers of the same occurrence.
#[test]
fn test_stop_does_not_short_circuit() {
    let engine = ScriptedEngine::new(vec![
        pause(ExitCategory::WorkRegionEnd, 5),
        pause(ExitCategory::WorkRegionEnd, 6),
    ]);
    let trace: Trace = Rc::default();
    let mut dispatcher = ExitEventDispatcher::new(engine);
    dispatcher
        .register(ExitCategory::WorkRegionEnd, recorder(&trace, "first", Decision::Stop))
        .register(ExitCategory::WorkRegionEnd, recorder(&trace, "second", Decision::Continue));

    let summary = dispatcher.run().unwrap();

    assert_eq!(summary.end, RunEnd::Stopped);
    assert_eq!(summary.exits, 1);
    assert_eq!(*trace.borrow(), vec!["first@5", "second@5"]);
    assert_eq!(dispatcher.engine().calls, 1);
}

/// Tests that a run can be resumed after a handler stopped it.
#[test]
fn test_run_resumes_after_stop() {
    let engine = ScriptedEngine::new(vec![
        pause(ExitCategory::Generic, 1),
        pause(ExitCategory::Generic, 2),
    ]);
    let trace: Trace = Rc::default();
    let mut dispatcher = ExitEventDispatcher::new(engine);
    dispatcher.register(ExitCategory::Generic, recorder(&trace, "h", Decision::Stop));

    assert_eq!(dispatcher.run().unwrap().end, RunEnd::Stopped);
    let second = dispatcher.run().unwrap();
    assert_eq!(second.end, RunEnd::Stopped);
    assert_eq!(second.exits, 2);
    assert_eq!(second.last_event.map(|e| e.tick), Some(2));
    assert_eq!(dispatcher.run().unwrap().end, RunEnd::Completed);
}

/// Tests that the terminal fallback stops the loop after one unhandled occurrence.
#[test]
fn test_terminal_fallback_stops_after_one_event() {
    let engine = ScriptedEngine::new(vec![
        pause(ExitCategory::Generic, 42),
        pause(ExitCategory::Generic, 43),
    ]);
    let mut dispatcher = ExitEventDispatcher::new(engine);
    dispatcher.set_fallback(TerminalHandler::new());

    let summary = dispatcher.run().unwrap();

    assert_eq!(summary.end, RunEnd::Stopped);
    assert_eq!(summary.exits, 1);
    assert_eq!(summary.final_tick, 42);
    assert_eq!(dispatcher.engine().calls, 1);
}

/// Tests the default policy for a category with no handler and no fallback.
#[test]
fn test_unhandled_category_fails_by_default() {
    let engine = ScriptedEngine::new(vec![pause(ExitCategory::Boot, 1)]);
    let mut dispatcher = ExitEventDispatcher::new(engine);

    let err = dispatcher.run().unwrap_err();
    assert!(matches!(err, SimError::NotFound(_)));
}

/// Tests that unhandled categories are skipped under the Continue policy.
#[test]
fn test_unhandled_category_continue_policy() {
    let engine = ScriptedEngine::new(vec![
        pause(ExitCategory::Boot, 1),
        pause(ExitCategory::Generic, 2),
    ]);
    let mut dispatcher = ExitEventDispatcher::new(engine);
    dispatcher.on_unhandled(UnhandledExit::Continue);

    let summary = dispatcher.run().unwrap();
    assert_eq!(summary.end, RunEnd::Completed);
    assert_eq!(summary.exits, 2);
}

/// Tests that an engine fault aborts the run before any handler sees it.
#[test]
fn test_engine_fault_aborts_without_handlers() {
    let engine = ScriptedEngine::new(vec![
        pause(ExitCategory::Generic, 1),
        Err(SimError::EngineFault("segfault in model".to_string())),
        pause(ExitCategory::Generic, 3),
    ]);
    let trace: Trace = Rc::default();
    let mut dispatcher = ExitEventDispatcher::new(engine);
    dispatcher.register(ExitCategory::Generic, recorder(&trace, "h", Decision::Continue));

    let err = dispatcher.run().unwrap_err();
    assert!(matches!(err, SimError::EngineFault(_)));
    assert_eq!(*trace.borrow(), vec!["h@1"]);

    // The fault is sticky: the engine is not advanced again.
    assert_eq!(dispatcher.run().unwrap_err(), err);
    assert_eq!(dispatcher.engine().calls, 2);
}

/// Tests that non-fault engine errors surface as engine faults.
#[test]
fn test_engine_error_is_reported_as_fault() {
    let engine = ScriptedEngine::new(vec![Err(SimError::NotFound("workload".to_string()))]);
    let mut dispatcher = ExitEventDispatcher::new(engine);
    dispatcher.set_fallback(TerminalHandler::new());

    assert!(matches!(dispatcher.run(), Err(SimError::EngineFault(_))));
}

/// Tests that a pause earlier in time than its predecessor is rejected.
#[test]
fn test_out_of_order_pause_is_fault() {
    let engine = ScriptedEngine::new(vec![
        pause(ExitCategory::Generic, 100),
        pause(ExitCategory::Generic, 50),
    ]);
    let trace: Trace = Rc::default();
    let mut dispatcher = ExitEventDispatcher::new(engine);
    dispatcher.register(ExitCategory::Generic, recorder(&trace, "h", Decision::Continue));

    assert!(matches!(dispatcher.run(), Err(SimError::EngineFault(_))));
    assert_eq!(*trace.borrow(), vec!["h@100"]);
}

/// Tests that equal ticks are accepted as monotonic.
#[test]
fn test_same_tick_pauses_are_accepted() {
    let engine = ScriptedEngine::new(vec![
        pause(ExitCategory::Boot, 7),
        pause(ExitCategory::WorkRegionBegin, 7),
    ]);
    let mut dispatcher = ExitEventDispatcher::new(engine);
    dispatcher.on_unhandled(UnhandledExit::Continue);

    assert_eq!(dispatcher.run().unwrap().exits, 2);
}

/// Tests that a handler error aborts the run with that error.
#[test]
fn test_handler_error_aborts_run() {
    let engine = ScriptedEngine::new(vec![pause(ExitCategory::Generic, 1)]);
    let mut dispatcher = ExitEventDispatcher::new(engine);
    dispatcher.register(
        ExitCategory::Generic,
        handler_fn("switcher", |_event, sim| {
            sim.switch_core(0)?;
            Ok(Decision::Continue)
        }),
    );

    // The scripted engine has no processor to switch.
    assert!(matches!(dispatcher.run(), Err(SimError::NotFound(_))));
}

/// Tests that closure handlers keep captured state between resumptions.
#[test]
fn test_handler_state_persists_across_resumptions() {
    let engine = ScriptedEngine::new(vec![
        pause(ExitCategory::Generic, 1),
        pause(ExitCategory::Generic, 2),
        pause(ExitCategory::Generic, 3),
        pause(ExitCategory::Generic, 4),
    ]);
    let seen = Rc::new(RefCell::new(0));
    let observed = seen.clone();
    let mut count = 0;
    let mut dispatcher = ExitEventDispatcher::new(engine);
    dispatcher.register(
        ExitCategory::Generic,
        handler_fn("counter", move |_event, _sim| {
            count += 1;
            *observed.borrow_mut() = count;
            Ok(Decision::stop_if(count == 3))
        }),
    );

    let summary = dispatcher.run().unwrap();
    assert_eq!(summary.end, RunEnd::Stopped);
    assert_eq!(*seen.borrow(), 3);
    assert_eq!(summary.final_tick, 3);
}

/// Tests that a step sequence runs one step per occurrence and stops when exhausted.
#[test]
fn test_step_sequence_yields_stop_when_exhausted() {
    let engine = ScriptedEngine::new(vec![
        pause(ExitCategory::Generic, 1),
        pause(ExitCategory::Generic, 2),
        pause(ExitCategory::Generic, 3),
        pause(ExitCategory::Generic, 4),
    ]);
    let trace: Trace = Rc::default();
    let (t1, t2) = (trace.clone(), trace.clone());
    let sequence = StepSequence::new("steps")
        .step(move |event, _sim| {
            t1.borrow_mut().push(format!("dump@{}", event.tick));
            Ok(Decision::Continue)
        })
        .step(move |event, _sim| {
            t2.borrow_mut().push(format!("reset@{}", event.tick));
            Ok(Decision::Continue)
        });
    assert_eq!(sequence.remaining(), 2);

    let mut dispatcher = ExitEventDispatcher::new(engine);
    dispatcher.register(ExitCategory::Generic, sequence);
    let summary = dispatcher.run().unwrap();

    assert_eq!(summary.end, RunEnd::Stopped);
    assert_eq!(summary.final_tick, 3);
    assert_eq!(*trace.borrow(), vec!["dump@1", "reset@2"]);
}

/// Tests that the handler context turns a relative tick budget into an absolute bound.
#[test]
fn test_set_max_ticks_is_relative_to_now() {
    let engine = ScriptedEngine::new(vec![pause(ExitCategory::Generic, 1_000)]);
    let mut dispatcher = ExitEventDispatcher::new(engine);
    dispatcher.register(
        ExitCategory::Generic,
        handler_fn("bound", |_event, sim| {
            assert_eq!(sim.set_max_ticks(500), 1_500);
            Ok(Decision::Stop)
        }),
    );

    dispatcher.run().unwrap();
    assert_eq!(dispatcher.engine().bound, Some(1_500));
}

/// Tests that the dispatcher can sample statistics after a run.
#[test]
fn test_stats_after_completion() {
    let engine = ScriptedEngine::new(vec![pause(ExitCategory::Generic, 9)]);
    let mut dispatcher = ExitEventDispatcher::new(engine);
    dispatcher.on_unhandled(UnhandledExit::Continue);
    dispatcher.run().unwrap();

    let snapshot = dispatcher.stats().snapshot_all().unwrap();
    assert_eq!(snapshot.get("final_tick").unwrap(), 9.0);
    assert!(matches!(
        dispatcher.stats().snapshot(&["sim_insts"]),
        Err(SimError::NotFound(_))
    ));
}

/// Tests that handlers observe the paused engine without advancing it.
#[test]
fn test_handlers_never_advance_engine() {
    let engine = ScriptedEngine::new(vec![
        pause(ExitCategory::Generic, 100),
        pause(ExitCategory::WorkRegionBegin, 200),
        pause(ExitCategory::Generic, 300),
    ]);
    let seen: Rc<RefCell<Vec<(ExitCategory, Tick)>>> = Rc::default();
    let mut dispatcher = ExitEventDispatcher::new(engine);
    let log = seen.clone();
    dispatcher.set_fallback(handler_fn("observer", move |event, sim| {
        assert_eq!(sim.tick(), event.tick);
        let snapshot = sim.stats().snapshot_all()?;
        assert_eq!(snapshot.tick(), event.tick);
        sim.stats().reset();
        sim.set_max_ticks(50);
        assert!(matches!(sim.processor(), Err(SimError::NotFound(_))));
        log.borrow_mut().push((event.category, event.tick));
        Ok(Decision::Continue)
    }));

    let summary = dispatcher.run().unwrap();

    assert_eq!(summary.end, RunEnd::Completed);
    assert_eq!(summary.exits, 3);
    assert_eq!(dispatcher.engine().calls, 4);
    assert_eq!(
        *seen.borrow(),
        vec![
            (ExitCategory::Generic, 100),
            (ExitCategory::WorkRegionBegin, 200),
            (ExitCategory::Generic, 300),
        ]
    );
}
