//! Cycle-stepped replay of a trace through the timing model.

use crate::encoding::{FunctionalUnit, IssueClass};
use crate::trace::TraceRecord;
use crate::SimError;

use super::busy_board::{claims_of, BusyBoard, Claims};
use super::config::TimingConfig;
use super::queue::IssueQueue;
use super::unit::{ScalarUnit, VectorComputeUnit, VectorDataUnit};

/// Decode-to-retire window of one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct IssueWindow {
    /// Index of the record in the replayed trace.
    pub record: usize,
    /// Cycle in which decode placed the instruction in its queue.
    pub issued: u64,
    /// Cycle in which the instruction released its resources.
    pub retired: u64,
}

impl IssueWindow {
    /// Whether two windows share at least one cycle.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.issued < other.retired && other.issued < self.retired
    }
}

/// Outcome of a completed timing run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TimingReport {
    /// Cycles until the pipeline drained after `HALT`.
    pub cycles: u64,
    /// Instructions issued, `HALT` excluded.
    pub instructions: usize,
    /// Decode cycles lost to a busy register, mask or length register.
    pub data_hazard_stalls: u64,
    /// Decode cycles lost to a full issue queue.
    pub queue_full_stalls: u64,
    /// Lane-cycles the vector memory unit lost to busy banks.
    pub bank_conflict_stalls: u64,
    /// Per-instruction windows in issue order.
    pub timeline: Vec<IssueWindow>,
}

/// Fetched record waiting in the decode stage.
#[derive(Debug, Clone, Copy)]
struct DecodeSlot {
    record: usize,
    reserved: bool,
}

/// Timing engine over one trace and one configuration. Every run owns its
/// own board, queues, and units.
#[derive(Debug, Clone)]
pub struct TimingSim {
    records: Vec<TraceRecord>,
    claims: Vec<Claims>,
    cycle_limit: u64,
    cycle: u64,

    next_fetch: usize,
    decode_slot: Option<DecodeSlot>,
    halt_fetched: bool,
    halt_decoded: bool,

    busy_board: BusyBoard,
    compute_queue: IssueQueue<usize>,
    data_queue: IssueQueue<usize>,
    scalar_queue: IssueQueue<usize>,
    compute_units: Vec<VectorComputeUnit>,
    data_unit: VectorDataUnit,
    scalar_unit: ScalarUnit,

    issued: Vec<Option<u64>>,
    retired: Vec<Option<u64>>,
    issue_order: Vec<usize>,
    data_hazard_stalls: u64,
    queue_full_stalls: u64,
}

impl TimingSim {
    /// Builds an idle machine positioned before the first record.
    #[must_use]
    pub fn new(records: Vec<TraceRecord>, config: &TimingConfig) -> Self {
        let claims = records
            .iter()
            .map(|record| claims_of(record.instruction()))
            .collect();
        let compute_units = FunctionalUnit::ALL
            .iter()
            .map(|kind| {
                let depth = match kind {
                    FunctionalUnit::Add => config.pipeline_depth_add,
                    FunctionalUnit::Mul => config.pipeline_depth_mul,
                    FunctionalUnit::Div => config.pipeline_depth_div,
                    FunctionalUnit::Shuffle => config.pipeline_depth_shuffle,
                };
                VectorComputeUnit::new(*kind, config.num_lanes, depth)
            })
            .collect();
        let len = records.len();
        Self {
            records,
            claims,
            cycle_limit: config.cycle_limit,
            cycle: 0,
            next_fetch: 0,
            decode_slot: None,
            halt_fetched: false,
            halt_decoded: false,
            busy_board: BusyBoard::new(),
            compute_queue: IssueQueue::new(config.compute_queue_depth),
            data_queue: IssueQueue::new(config.data_queue_depth),
            scalar_queue: IssueQueue::new(1),
            compute_units,
            data_unit: VectorDataUnit::new(
                config.num_lanes,
                config.vls_pipeline_depth,
                config.vdm_num_banks,
                config.vdm_bank_busy_time,
            ),
            scalar_unit: ScalarUnit::default(),
            issued: vec![None; len],
            retired: vec![None; len],
            issue_order: Vec::new(),
            data_hazard_stalls: 0,
            queue_full_stalls: 0,
        }
    }

    /// Steps cycles until `HALT` has been decoded and every queue and unit is
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::TraceExhausted`] when the trace ends without a
    /// `HALT` record and [`SimError::CycleLimitExceeded`] when the run does
    /// not drain within the configured limit.
    pub fn run(mut self) -> Result<TimingReport, SimError> {
        while !self.is_drained() {
            if self.cycle >= self.cycle_limit {
                return Err(SimError::CycleLimitExceeded {
                    limit: self.cycle_limit,
                });
            }
            self.step()?;
        }
        let report = self.report();
        log::info!(
            "timing run drained after {} cycles ({} instructions, {} hazard / {} queue / {} bank stalls)",
            report.cycles,
            report.instructions,
            report.data_hazard_stalls,
            report.queue_full_stalls,
            report.bank_conflict_stalls
        );
        Ok(report)
    }

    /// Simulates one cycle: dispatch, advance and retire, decode, fetch.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::TraceExhausted`] when fetch runs off the trace.
    pub fn step(&mut self) -> Result<(), SimError> {
        self.cycle += 1;
        self.dispatch();
        self.advance_and_retire();
        self.decode();
        self.fetch()?;
        log::trace!(
            "cycle {}: queues compute {} data {} scalar {}",
            self.cycle,
            self.compute_queue.len(),
            self.data_queue.len(),
            self.scalar_queue.len()
        );
        Ok(())
    }

    /// Cycles simulated so far.
    #[must_use]
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Whether the stop condition holds.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.halt_decoded
            && self.compute_queue.is_empty()
            && self.data_queue.is_empty()
            && self.scalar_queue.is_empty()
            && self.scalar_unit.is_idle()
            && self.data_unit.is_idle()
            && self.compute_units.iter().all(VectorComputeUnit::is_idle)
    }

    fn unit_for(&self, record: usize) -> Option<FunctionalUnit> {
        match self.records[record].instruction().opcode().issue_class() {
            IssueClass::VectorCompute(unit) => Some(unit),
            IssueClass::Scalar | IssueClass::VectorMemory => None,
        }
    }

    fn dispatch(&mut self) {
        if self.data_unit.is_idle() {
            if let Some(record) = self.data_queue.pop() {
                let addresses = self.records[record].addresses().to_vec();
                self.data_unit.accept(record, addresses);
            }
        }

        if let Some(&record) = self.compute_queue.front() {
            if let Some(kind) = self.unit_for(record) {
                let unit = &mut self.compute_units[kind.index()];
                if unit.is_idle() {
                    let vector_length = self.records[record].vector_length().unwrap_or(0);
                    unit.accept(record, vector_length);
                    self.compute_queue.pop();
                }
            }
        }

        if self.scalar_unit.is_idle() {
            if let Some(record) = self.scalar_queue.pop() {
                self.scalar_unit.accept(record);
            }
        }
    }

    fn advance_and_retire(&mut self) {
        let mut finished = Vec::new();

        self.scalar_unit.advance();
        finished.extend(self.scalar_unit.take_retired());

        self.data_unit.advance();
        finished.extend(self.data_unit.take_retired());

        for unit in &mut self.compute_units {
            unit.advance();
            finished.extend(unit.take_retired());
        }

        for record in finished {
            self.busy_board.release(&self.claims[record]);
            self.retired[record] = Some(self.cycle);
        }
    }

    fn decode(&mut self) {
        let Some(mut slot) = self.decode_slot.take() else {
            return;
        };
        let record = &self.records[slot.record];
        if record.is_halt() {
            self.halt_decoded = true;
            return;
        }

        if !slot.reserved {
            if self.busy_board.blocks(&self.claims[slot.record]) {
                self.data_hazard_stalls += 1;
                self.decode_slot = Some(slot);
                return;
            }
            self.busy_board.reserve(&self.claims[slot.record]);
            slot.reserved = true;
        }

        let queue = match record.instruction().opcode().issue_class() {
            IssueClass::Scalar => &mut self.scalar_queue,
            IssueClass::VectorCompute(_) => &mut self.compute_queue,
            IssueClass::VectorMemory => &mut self.data_queue,
        };
        if queue.push(slot.record).is_err() {
            self.queue_full_stalls += 1;
            self.decode_slot = Some(slot);
            return;
        }
        self.issued[slot.record] = Some(self.cycle);
        self.issue_order.push(slot.record);
    }

    fn fetch(&mut self) -> Result<(), SimError> {
        if self.decode_slot.is_some() || self.halt_fetched {
            return Ok(());
        }
        let record = self.records.get(self.next_fetch).ok_or(SimError::TraceExhausted {
            cycle: self.cycle,
        })?;
        self.halt_fetched = record.is_halt();
        self.decode_slot = Some(DecodeSlot {
            record: self.next_fetch,
            reserved: false,
        });
        self.next_fetch += 1;
        Ok(())
    }

    fn report(&self) -> TimingReport {
        let timeline = self
            .issue_order
            .iter()
            .filter_map(|&record| {
                Some(IssueWindow {
                    record,
                    issued: self.issued[record]?,
                    retired: self.retired[record]?,
                })
            })
            .collect();
        TimingReport {
            cycles: self.cycle,
            instructions: self.issue_order.len(),
            data_hazard_stalls: self.data_hazard_stalls,
            queue_full_stalls: self.queue_full_stalls,
            bank_conflict_stalls: self.data_unit.conflict_stalls(),
            timeline,
        }
    }
}
