//! Exit Event Dispatcher.
//!
//! The dispatcher is the only component that advances the engine. Each turn
//! of its loop runs the engine to its next pause, classifies the pause by
//! category, and resumes the handlers registered for that category in
//! registration order. Every handler for an occurrence runs, even after one
//! of them has asked to stop; the loop ends only once they all have.
//!
//! Handlers are resumable tasks: the same task object is resumed on every
//! occurrence of its category, so whatever it captured survives from one
//! pause to the next.

use super::engine::SimulationEngine;
use super::event::{ExitCategory, ExitEvent, RunOutcome};
use crate::common::{SimError, SimResult, Tick};
use crate::core::{CoreSwitchController, CoreVariant};
use crate::stats::StatsSampler;
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, error, info, warn};

/// What a handler wants the run loop to do after the current occurrence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Keep running once every handler of the occurrence has run.
    Continue,
    /// End the run once every handler of the occurrence has run.
    Stop,
}

impl Decision {
    /// `Stop` if `stop` holds, otherwise `Continue`.
    pub fn stop_if(stop: bool) -> Self {
        if stop {
            Decision::Stop
        } else {
            Decision::Continue
        }
    }

    /// Returns `true` for `Stop`.
    pub fn is_stop(self) -> bool {
        self == Decision::Stop
    }
}

/// A handler's view of the paused simulation.
pub struct SimContext<'a> {
    engine: &'a mut dyn SimulationEngine,
}

impl<'a> SimContext<'a> {
    /// Wraps the engine the dispatcher has paused.
    pub fn new(engine: &'a mut dyn SimulationEngine) -> Self {
        Self { engine }
    }

    /// Current simulated tick.
    pub fn tick(&self) -> Tick {
        self.engine.current_tick()
    }

    /// Statistics access for this pause.
    pub fn stats(&mut self) -> StatsSampler<'_> {
        StatsSampler::new(&mut *self.engine)
    }

    /// The engine's switchable processor.
    ///
    /// # Errors
    ///
    /// `NotFound` if the engine simulates no processing elements.
    pub fn processor(&self) -> SimResult<&CoreSwitchController> {
        self.engine
            .processor()
            .ok_or_else(|| SimError::NotFound("engine has no switchable processor".to_string()))
    }

    fn processor_mut(&mut self) -> SimResult<&mut CoreSwitchController> {
        self.engine
            .processor_mut()
            .ok_or_else(|| SimError::NotFound("engine has no switchable processor".to_string()))
    }

    /// Activates the next variant of one element and returns it.
    pub fn switch_core(&mut self, element_id: usize) -> SimResult<CoreVariant> {
        self.processor_mut()?.switch(element_id).cloned()
    }

    /// Activates a named variant of one element and returns it.
    pub fn switch_core_to(&mut self, element_id: usize, variant: &str) -> SimResult<CoreVariant> {
        self.processor_mut()?.switch_to(element_id, variant).cloned()
    }

    /// Activates the next variant of every element.
    pub fn switch_all_cores(&mut self) -> SimResult<()> {
        self.processor_mut()?.switch_all()
    }

    /// Bounds the remaining simulated time to `remaining` ticks from now.
    ///
    /// Returns the absolute tick at which the engine will pause with `MaxTick`.
    pub fn set_max_ticks(&mut self, remaining: Tick) -> Tick {
        let bound = self.engine.current_tick().saturating_add(remaining);
        self.engine.set_tick_bound(bound);
        info!(bound, "tick bound set");
        bound
    }
}

/// A resumable unit of work registered against one exit category.
pub trait HandlerTask {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Continues the task for one occurrence of its category.
    ///
    /// # Errors
    ///
    /// Any error aborts the run; the dispatcher returns it from `run`.
    fn resume(&mut self, event: &ExitEvent, sim: &mut SimContext<'_>) -> SimResult<Decision>;
}

/// A handler backed by a closure; captured variables persist across resumptions.
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> HandlerTask for FnHandler<F>
where
    F: FnMut(&ExitEvent, &mut SimContext<'_>) -> SimResult<Decision>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, event: &ExitEvent, sim: &mut SimContext<'_>) -> SimResult<Decision> {
        (self.f)(event, sim)
    }
}

/// Wraps a closure as a [`HandlerTask`].
pub fn handler_fn<F>(name: impl Into<String>, f: F) -> FnHandler<F>
where
    F: FnMut(&ExitEvent, &mut SimContext<'_>) -> SimResult<Decision>,
{
    FnHandler {
        name: name.into(),
        f,
    }
}

type Step = Box<dyn FnOnce(&ExitEvent, &mut SimContext<'_>) -> SimResult<Decision>>;

/// A handler that runs one step per resumption, in order.
///
/// Once every step has run, further resumptions yield `Stop`.
pub struct StepSequence {
    name: String,
    steps: VecDeque<Step>,
}

impl StepSequence {
    /// Creates an empty sequence; it yields `Stop` until steps are added.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: VecDeque::new(),
        }
    }

    /// Appends a step.
    pub fn step<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&ExitEvent, &mut SimContext<'_>) -> SimResult<Decision> + 'static,
    {
        self.steps.push_back(Box::new(f));
        self
    }

    /// Steps not yet run.
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl HandlerTask for StepSequence {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, event: &ExitEvent, sim: &mut SimContext<'_>) -> SimResult<Decision> {
        match self.steps.pop_front() {
            Some(step) => step(event, sim),
            None => {
                warn!(handler = %self.name, %event, "handler sequence exhausted, stopping");
                Ok(Decision::Stop)
            }
        }
    }
}

/// What to do with a pause whose category has no handler and no fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnhandledExit {
    /// Abort the run with `NotFound`.
    Fail,
    /// Log and keep running.
    Continue,
}

/// Why a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunEnd {
    /// A handler yielded `Stop`.
    Stopped,
    /// The engine had no more pausing points.
    Completed,
}

/// Result of one `run` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Exit events dispatched so far, across every `run` call.
    pub exits: u64,
    /// Engine tick when the run ended.
    pub final_tick: Tick,
    /// Why the run ended.
    pub end: RunEnd,
    /// Most recent exit event, if any was dispatched.
    pub last_event: Option<ExitEvent>,
}

/// Drives a simulation engine and routes its pauses to handlers.
pub struct ExitEventDispatcher<E> {
    engine: E,
    handlers: BTreeMap<ExitCategory, Vec<Box<dyn HandlerTask>>>,
    fallback: Option<Box<dyn HandlerTask>>,
    unhandled: UnhandledExit,
    last_event: Option<ExitEvent>,
    exits: u64,
    fault: Option<SimError>,
}

impl<E: SimulationEngine> ExitEventDispatcher<E> {
    /// Takes exclusive ownership of `engine`.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            handlers: BTreeMap::new(),
            fallback: None,
            unhandled: UnhandledExit::Fail,
            last_event: None,
            exits: 0,
            fault: None,
        }
    }

    /// Appends `handler` to the ordered list for `category`.
    pub fn register<H: HandlerTask + 'static>(&mut self, category: ExitCategory, handler: H) -> &mut Self {
        self.register_boxed(category, Box::new(handler))
    }

    /// Like [`register`](Self::register), for an already boxed handler.
    pub fn register_boxed(&mut self, category: ExitCategory, handler: Box<dyn HandlerTask>) -> &mut Self {
        debug!(%category, handler = handler.name(), "registering exit handler");
        self.handlers.entry(category).or_default().push(handler);
        self
    }

    /// Handler resumed for categories with no registered handler.
    pub fn set_fallback<H: HandlerTask + 'static>(&mut self, handler: H) -> &mut Self {
        self.fallback = Some(Box::new(handler));
        self
    }

    /// Policy for unhandled categories when no fallback is set.
    pub fn on_unhandled(&mut self, policy: UnhandledExit) -> &mut Self {
        self.unhandled = policy;
        self
    }

    /// Names of the handlers registered for `category`, in resumption order.
    pub fn handler_names(&self, category: ExitCategory) -> Vec<&str> {
        self.handlers
            .get(&category)
            .map(|hs| hs.iter().map(|h| h.name()).collect())
            .unwrap_or_default()
    }

    /// The engine being driven.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable engine access between runs.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Gives the engine back, dropping every handler.
    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Statistics access outside a run, e.g. after completion.
    pub fn stats(&mut self) -> StatsSampler<'_> {
        StatsSampler::new(&mut self.engine)
    }

    /// Runs the simulation until a handler stops it or the engine completes.
    ///
    /// # Errors
    ///
    /// * `EngineFault` if the engine faults or reports pauses out of tick
    ///   order. No handler runs for the faulting pause and later calls fail
    ///   with the same fault.
    /// * Whatever a handler returns, which aborts the run.
    /// * `NotFound` for an unhandled category under [`UnhandledExit::Fail`].
    pub fn run(&mut self) -> SimResult<RunSummary> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }
        loop {
            let outcome = match self.engine.run_until_pause() {
                Ok(outcome) => outcome,
                Err(err) => return Err(self.record_fault(err)),
            };
            let event = match outcome {
                RunOutcome::Completed => {
                    info!(tick = self.engine.current_tick(), "simulation completed");
                    return Ok(self.summary(RunEnd::Completed));
                }
                RunOutcome::Paused(event) => event,
            };
            if let Some(prev) = &self.last_event {
                if event.tick < prev.tick {
                    let err = SimError::EngineFault(format!(
                        "pause at tick {} precedes previous pause at tick {}",
                        event.tick, prev.tick
                    ));
                    return Err(self.record_fault(err));
                }
            }
            self.exits += 1;
            debug!(%event, "simulation paused");

            let decision = self.dispatch(&event)?;
            self.last_event = Some(event);
            if decision.is_stop() {
                info!(tick = self.engine.current_tick(), "run stopped by handler");
                return Ok(self.summary(RunEnd::Stopped));
            }
        }
    }

    fn dispatch(&mut self, event: &ExitEvent) -> SimResult<Decision> {
        let Self {
            engine,
            handlers,
            fallback,
            unhandled,
            ..
        } = self;
        let mut sim = SimContext::new(engine);

        if let Some(list) = handlers.get_mut(&event.category).filter(|l| !l.is_empty()) {
            let mut decision = Decision::Continue;
            for handler in list.iter_mut() {
                debug!(handler = handler.name(), category = %event.category, "resuming handler");
                if handler.resume(event, &mut sim)?.is_stop() {
                    decision = Decision::Stop;
                }
            }
            return Ok(decision);
        }

        match (fallback, *unhandled) {
            (Some(handler), _) => {
                debug!(handler = handler.name(), category = %event.category, "resuming fallback handler");
                handler.resume(event, &mut sim)
            }
            (None, UnhandledExit::Continue) => {
                warn!(%event, "no handler registered, continuing");
                Ok(Decision::Continue)
            }
            (None, UnhandledExit::Fail) => Err(SimError::NotFound(format!(
                "no handler registered for exit category '{}'",
                event.category
            ))),
        }
    }

    fn record_fault(&mut self, err: SimError) -> SimError {
        let fault = match err {
            SimError::EngineFault(_) => err,
            other => SimError::EngineFault(other.to_string()),
        };
        error!(%fault, "engine fault, run aborted");
        self.fault = Some(fault.clone());
        fault
    }

    fn summary(&self, end: RunEnd) -> RunSummary {
        RunSummary {
            exits: self.exits,
            final_tick: self.engine.current_tick(),
            end,
            last_event: self.last_event.clone(),
        }
    }
}
