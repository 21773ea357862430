//! Switchable Processor.
//!
//! The `CoreSwitchController` owns every processing element of a board and
//! the ordered list of variants configured for each. Exactly one variant per
//! element is active at any paused instant. Switching is a data operation:
//! the active index moves, the old variant's pipeline state is dropped, and
//! the element's architectural state carries over unchanged.

use super::arch::ArchState;
use super::variant::CoreVariant;
use crate::common::{SimError, SimResult};
use tracing::{debug, info};

/// Execution state of the processor as seen by the orchestration layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecState {
    /// Simulation has not started yet.
    Idle,
    /// The engine is advancing simulated time.
    Running,
    /// The engine has handed control back at a pause boundary.
    Paused,
    /// The engine reported natural completion.
    Halted,
}

/// Microarchitectural state private to the active variant.
///
/// Discarded, not migrated, when the element switches variants.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineState {
    /// Instructions currently occupying the reorder buffer.
    pub rob_occupancy: usize,
    /// Cycles this variant has been active since it was switched in.
    pub active_cycles: u64,
    /// Instructions retired by this variant since it was switched in.
    pub retired: u64,
}

/// One simulated processing element and its interchangeable variants.
#[derive(Clone, Debug)]
pub struct ProcessingElement {
    id: usize,
    variants: Vec<CoreVariant>,
    active: usize,
    arch: ArchState,
    pipeline: PipelineState,
}

impl ProcessingElement {
    /// Creates an element whose first variant is active.
    ///
    /// # Errors
    ///
    /// `Configuration` if `variants` is empty or any variant is malformed.
    pub fn new(id: usize, variants: Vec<CoreVariant>, start_pc: u64) -> SimResult<Self> {
        if variants.is_empty() {
            return Err(SimError::Configuration(format!(
                "element {} has no core variants",
                id
            )));
        }
        for v in &variants {
            v.validate()?;
        }
        Ok(Self {
            id,
            variants,
            active: 0,
            arch: ArchState::new(start_pc),
            pipeline: PipelineState::default(),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn variants(&self) -> &[CoreVariant] {
        &self.variants
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    /// The variant currently executing.
    pub fn active_variant(&self) -> &CoreVariant {
        &self.variants[self.active]
    }

    /// Architectural state, preserved across switches.
    pub fn arch(&self) -> &ArchState {
        &self.arch
    }

    pub fn arch_mut(&mut self) -> &mut ArchState {
        &mut self.arch
    }

    /// Microarchitectural state of the active variant.
    pub fn pipeline(&self) -> &PipelineState {
        &self.pipeline
    }

    pub fn pipeline_mut(&mut self) -> &mut PipelineState {
        &mut self.pipeline
    }

    fn activate(&mut self, idx: usize) {
        if idx == self.active {
            return;
        }
        debug!(
            element = self.id,
            from = %self.variants[self.active].name,
            to = %self.variants[idx].name,
            pc = format_args!("{:#x}", self.arch.pc),
            "activating core variant"
        );
        self.active = idx;
        self.pipeline = PipelineState::default();
    }

    fn next_index(&self) -> usize {
        (self.active + 1) % self.variants.len()
    }
}

/// Holds every processing element and performs pause-gated variant switches.
#[derive(Clone, Debug)]
pub struct CoreSwitchController {
    elements: Vec<ProcessingElement>,
    state: ExecState,
    switches: u64,
}

impl CoreSwitchController {
    /// Wraps an explicit list of elements.
    pub fn new(elements: Vec<ProcessingElement>) -> Self {
        Self {
            elements,
            state: ExecState::Idle,
            switches: 0,
        }
    }

    /// Builds `num_elements` elements sharing the same ordered variant list.
    pub fn uniform(num_elements: usize, variants: &[CoreVariant], start_pc: u64) -> SimResult<Self> {
        if num_elements == 0 {
            return Err(SimError::Configuration(
                "processor needs at least one element".to_string(),
            ));
        }
        let elements = (0..num_elements)
            .map(|id| ProcessingElement::new(id, variants.to_vec(), start_pc))
            .collect::<SimResult<Vec<_>>>()?;
        Ok(Self::new(elements))
    }

    /// Every processing element, by id.
    pub fn elements(&self) -> &[ProcessingElement] {
        &self.elements
    }

    pub fn elements_mut(&mut self) -> &mut [ProcessingElement] {
        &mut self.elements
    }

    /// Looks up an element by id.
    pub fn element(&self, element_id: usize) -> SimResult<&ProcessingElement> {
        self.elements
            .get(element_id)
            .ok_or_else(|| SimError::NotFound(format!("processing element {}", element_id)))
    }

    /// Current execution state.
    pub fn state(&self) -> ExecState {
        self.state
    }

    /// Returns `true` when a switch is currently allowed.
    pub fn is_paused(&self) -> bool {
        self.state == ExecState::Paused
    }

    /// Number of variant changes performed so far.
    pub fn switch_count(&self) -> u64 {
        self.switches
    }

    /// Marks the processor as executing. Called by the engine when it resumes.
    pub fn begin_run(&mut self) {
        self.state = ExecState::Running;
    }

    /// Marks a pause boundary. Called by the engine before handing back an exit event.
    pub fn pause(&mut self) {
        self.state = ExecState::Paused;
    }

    /// Marks natural completion.
    pub fn halt(&mut self) {
        self.state = ExecState::Halted;
    }

    fn require_paused(&self, op: &str) -> SimResult<()> {
        if self.is_paused() {
            Ok(())
        } else {
            Err(SimError::PreconditionViolation(format!(
                "{} requires a paused simulation (state: {:?})",
                op, self.state
            )))
        }
    }

    /// Activates the next variant in the element's configured order.
    ///
    /// An element with a single variant is left as is and the call succeeds.
    ///
    /// # Errors
    ///
    /// * `PreconditionViolation` if the simulation is not paused.
    /// * `NotFound` if `element_id` does not name an element.
    pub fn switch(&mut self, element_id: usize) -> SimResult<&CoreVariant> {
        self.require_paused("switch")?;
        let element = self
            .elements
            .get_mut(element_id)
            .ok_or_else(|| SimError::NotFound(format!("processing element {}", element_id)))?;
        let next = element.next_index();
        if next != element.active {
            element.activate(next);
            self.switches += 1;
        }
        Ok(element.active_variant())
    }

    /// Activates the variant called `variant` on one element.
    ///
    /// # Errors
    ///
    /// * `PreconditionViolation` if the simulation is not paused.
    /// * `NotFound` if the element or the variant does not exist.
    pub fn switch_to(&mut self, element_id: usize, variant: &str) -> SimResult<&CoreVariant> {
        self.require_paused("switch")?;
        let element = self
            .elements
            .get_mut(element_id)
            .ok_or_else(|| SimError::NotFound(format!("processing element {}", element_id)))?;
        let idx = element
            .variants
            .iter()
            .position(|v| v.name == variant)
            .ok_or_else(|| {
                SimError::NotFound(format!(
                    "core variant '{}' on element {}",
                    variant, element_id
                ))
            })?;
        if idx != element.active {
            element.activate(idx);
            self.switches += 1;
        }
        Ok(element.active_variant())
    }

    /// Advances every element to its next variant.
    ///
    /// # Errors
    ///
    /// `PreconditionViolation` if the simulation is not paused; no element changes.
    pub fn switch_all(&mut self) -> SimResult<()> {
        self.require_paused("switch")?;
        for element in &mut self.elements {
            let next = element.next_index();
            if next != element.active {
                element.activate(next);
                self.switches += 1;
            }
        }
        info!(
            elements = self.elements.len(),
            switches = self.switches,
            "switched all processing elements"
        );
        Ok(())
    }
}
