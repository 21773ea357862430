//! Phase Controller.
//!
//! Encodes the standard measurement sequence (fast-forward, switch, measure,
//! stop) as a handful of handlers installed on a dispatcher. There is no
//! phase field anywhere: the phase a run is in follows from which handler
//! last fired and which core variants are active.
//!
//! * On the region-of-interest begin category the controller captures the
//!   statistics accumulated so far, switches the processor to its
//!   measurement variants (first occurrence only), bounds the remaining
//!   simulated time and resets statistics so the next capture covers only
//!   the region of interest.
//! * On `WorkRegionEnd` it captures the region's statistics and stops once
//!   the expected number of regions has been measured.
//! * On `Terminal`, and for any category nobody anticipated, it logs the
//!   cause and stops.

use super::dispatcher::{Decision, ExitEventDispatcher, HandlerTask, SimContext};
use super::engine::SimulationEngine;
use super::event::{ExitCategory, ExitEvent};
use crate::common::{SimError, SimResult, Tick};
use crate::stats::StatsSnapshot;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{info, warn};

/// Which processing elements change variant when the region of interest begins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SwitchPlan {
    /// Keep the current variants.
    None,
    /// Advance every element to its next variant.
    AllElements,
    /// Advance only the listed elements.
    Elements(Vec<usize>),
    /// Move every element to the variant with this name.
    ToVariant(String),
}

/// Parameters of the phase sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhasePlan {
    /// Category that marks the start of the region of interest.
    pub roi_begin: ExitCategory,
    /// Elements switched at the first region of interest.
    pub switch: SwitchPlan,
    /// Simulated ticks allowed after the switch.
    pub max_ticks: Option<Tick>,
    /// Counters captured at each boundary; empty means every counter.
    pub counters: Vec<String>,
    /// Regions of interest expected before stopping.
    pub regions: usize,
    /// Categories that are logged and otherwise ignored.
    pub pass_through: Vec<ExitCategory>,
}

impl Default for PhasePlan {
    fn default() -> Self {
        Self {
            roi_begin: ExitCategory::WorkRegionBegin,
            switch: SwitchPlan::AllElements,
            max_ticks: None,
            counters: Vec::new(),
            regions: 1,
            pass_through: Vec::new(),
        }
    }
}

impl PhasePlan {
    /// Sets the category that opens the region of interest.
    pub fn roi_begin(mut self, category: ExitCategory) -> Self {
        self.roi_begin = category;
        self
    }

    /// Sets which elements switch.
    pub fn switch(mut self, plan: SwitchPlan) -> Self {
        self.switch = plan;
        self
    }

    /// Bounds simulated time after the switch.
    pub fn max_ticks(mut self, ticks: Tick) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    /// Restricts captures to the named counters.
    pub fn counters<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.counters = names.into_iter().map(Into::into).collect();
        self
    }

    /// Sets how many regions to measure before stopping.
    pub fn regions(mut self, regions: usize) -> Self {
        self.regions = regions;
        self
    }

    /// Logs `category` and keeps running.
    pub fn pass_through(mut self, category: ExitCategory) -> Self {
        self.pass_through.push(category);
        self
    }

    fn validate(&self) -> SimResult<()> {
        if !matches!(self.roi_begin, ExitCategory::Boot | ExitCategory::WorkRegionBegin) {
            return Err(SimError::Configuration(format!(
                "region of interest cannot begin on '{}'",
                self.roi_begin
            )));
        }
        if self.regions == 0 {
            return Err(SimError::Configuration(
                "at least one region of interest is required".to_string(),
            ));
        }
        let reserved = [self.roi_begin, ExitCategory::WorkRegionEnd, ExitCategory::Terminal];
        if let Some(c) = self.pass_through.iter().find(|c| reserved.contains(c)) {
            return Err(SimError::Configuration(format!(
                "category '{}' is already handled by the phase sequence",
                c
            )));
        }
        Ok(())
    }
}

/// What the phase handlers observed during a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PhaseLog {
    /// Statistics captured at each region-of-interest begin, before the reset.
    pub before_roi: Vec<StatsSnapshot>,
    /// Statistics captured at each region-of-interest end.
    pub regions: Vec<StatsSnapshot>,
    /// Tick of the core switch, if one happened.
    pub switched_at: Option<Tick>,
    /// Absolute tick bound installed after the switch.
    pub tick_bound: Option<Tick>,
    /// The exit that ended the run, if it was a terminal or unanticipated one.
    pub terminal: Option<ExitEvent>,
}

/// Shared handle to the [`PhaseLog`] written by the installed handlers.
#[derive(Clone, Debug, Default)]
pub struct PhaseRecord {
    inner: Rc<RefCell<PhaseLog>>,
}

impl PhaseRecord {
    /// A copy of everything recorded so far.
    pub fn log(&self) -> PhaseLog {
        self.inner.borrow().clone()
    }

    /// The statistics of the last measured region.
    pub fn last_region(&self) -> Option<StatsSnapshot> {
        self.inner.borrow().regions.last().cloned()
    }

    fn update(&self, f: impl FnOnce(&mut PhaseLog)) {
        f(&mut self.inner.borrow_mut());
    }
}

fn capture(sim: &mut SimContext<'_>, counters: &[String]) -> SimResult<StatsSnapshot> {
    if counters.is_empty() {
        sim.stats().snapshot_all()
    } else {
        let names: Vec<&str> = counters.iter().map(String::as_str).collect();
        sim.stats().snapshot(&names)
    }
}

struct RoiBeginHandler {
    switch: SwitchPlan,
    max_ticks: Option<Tick>,
    counters: Vec<String>,
    record: PhaseRecord,
    switched: bool,
}

impl HandlerTask for RoiBeginHandler {
    fn name(&self) -> &str {
        "roi-begin"
    }

    fn resume(&mut self, event: &ExitEvent, sim: &mut SimContext<'_>) -> SimResult<Decision> {
        info!(%event, "region of interest begins");
        let snapshot = capture(sim, &self.counters)?;
        self.record.update(|log| log.before_roi.push(snapshot));

        if !self.switched {
            match &self.switch {
                SwitchPlan::None => {}
                SwitchPlan::AllElements => sim.switch_all_cores()?,
                SwitchPlan::Elements(ids) => {
                    // Reject the whole plan before any element changes variant.
                    let processor = sim.processor()?;
                    for &id in ids {
                        processor.element(id)?;
                    }
                    for &id in ids {
                        sim.switch_core(id)?;
                    }
                }
                SwitchPlan::ToVariant(name) => {
                    let count = sim.processor()?.elements().len();
                    for id in 0..count {
                        sim.switch_core_to(id, name)?;
                    }
                }
            }
            self.switched = true;
            let tick = sim.tick();
            let bound = self.max_ticks.map(|t| sim.set_max_ticks(t));
            self.record.update(|log| {
                if self.switch != SwitchPlan::None {
                    log.switched_at = Some(tick);
                }
                log.tick_bound = bound;
            });
        }

        sim.stats().reset();
        Ok(Decision::Continue)
    }
}

struct RegionEndHandler {
    expected: usize,
    seen: usize,
    counters: Vec<String>,
    record: PhaseRecord,
}

impl HandlerTask for RegionEndHandler {
    fn name(&self) -> &str {
        "roi-end"
    }

    fn resume(&mut self, event: &ExitEvent, sim: &mut SimContext<'_>) -> SimResult<Decision> {
        self.seen += 1;
        info!(%event, region = self.seen, of = self.expected, "region of interest ends");
        let snapshot = capture(sim, &self.counters)?;
        self.record.update(|log| log.regions.push(snapshot));
        Ok(Decision::stop_if(self.seen >= self.expected))
    }
}

/// Logs the cause of an exit and stops the run.
pub struct TerminalHandler {
    record: Option<PhaseRecord>,
}

impl TerminalHandler {
    /// A terminal handler that only logs.
    pub fn new() -> Self {
        Self { record: None }
    }

    fn recording(record: PhaseRecord) -> Self {
        Self {
            record: Some(record),
        }
    }
}

impl Default for TerminalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerTask for TerminalHandler {
    fn name(&self) -> &str {
        "terminal"
    }

    fn resume(&mut self, event: &ExitEvent, _sim: &mut SimContext<'_>) -> SimResult<Decision> {
        if event.category == ExitCategory::Terminal {
            info!("exiting @ tick {} because {}", event.tick, event.cause);
        } else {
            warn!("unanticipated exit '{}' @ tick {}: {}", event.category, event.tick, event.cause);
        }
        if let Some(record) = &self.record {
            record.update(|log| log.terminal = Some(event.clone()));
        }
        Ok(Decision::Stop)
    }
}

struct PassThroughHandler;

impl HandlerTask for PassThroughHandler {
    fn name(&self) -> &str {
        "pass-through"
    }

    fn resume(&mut self, event: &ExitEvent, _sim: &mut SimContext<'_>) -> SimResult<Decision> {
        info!(%event, "ignoring exit");
        Ok(Decision::Continue)
    }
}

/// Installs the phase sequence on a dispatcher and exposes what it recorded.
pub struct PhaseController {
    plan: PhasePlan,
    record: PhaseRecord,
}

impl PhaseController {
    /// # Errors
    ///
    /// `Configuration` if the plan begins the region of interest on a category
    /// other than `Boot`/`WorkRegionBegin`, expects no regions, or passes
    /// through a category the sequence itself handles.
    pub fn new(plan: PhasePlan) -> SimResult<Self> {
        plan.validate()?;
        Ok(Self {
            plan,
            record: PhaseRecord::default(),
        })
    }

    /// The plan this controller was built from.
    pub fn plan(&self) -> &PhasePlan {
        &self.plan
    }

    /// Handle to the log the installed handlers write.
    pub fn record(&self) -> PhaseRecord {
        self.record.clone()
    }

    /// Registers the phase handlers and the terminal fallback on `dispatcher`.
    pub fn install<E: SimulationEngine>(&self, dispatcher: &mut ExitEventDispatcher<E>) {
        let plan = &self.plan;
        dispatcher
            .register(
                plan.roi_begin,
                RoiBeginHandler {
                    switch: plan.switch.clone(),
                    max_ticks: plan.max_ticks,
                    counters: plan.counters.clone(),
                    record: self.record.clone(),
                    switched: false,
                },
            )
            .register(
                ExitCategory::WorkRegionEnd,
                RegionEndHandler {
                    expected: plan.regions,
                    seen: 0,
                    counters: plan.counters.clone(),
                    record: self.record.clone(),
                },
            )
            .register(
                ExitCategory::Terminal,
                TerminalHandler::recording(self.record.clone()),
            )
            .set_fallback(TerminalHandler::recording(self.record.clone()));
        for &category in &plan.pass_through {
            dispatcher.register(category, PassThroughHandler);
        }
    }
}
