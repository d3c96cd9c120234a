//! Lane-pipelined back-end units.
//!
//! A unit is `lanes × depth` stage slots. Each active cycle every lane shifts
//! one stage toward its tail and takes the next unissued element at its head,
//! all lanes in lockstep. An instruction retires once its last element has
//! left the tail.

use crate::encoding::FunctionalUnit;

/// Shifts a lane one stage toward the tail, returning what left it.
fn shift(lane: &mut [Option<usize>]) -> Option<usize> {
    let out = lane.last_mut().and_then(Option::take);
    lane.rotate_right(1);
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LaneArray {
    lanes: Vec<Vec<Option<usize>>>,
}

impl LaneArray {
    fn new(lanes: usize, depth: usize) -> Self {
        Self {
            lanes: vec![vec![None; depth.max(1)]; lanes.max(1)],
        }
    }

    fn is_empty(&self) -> bool {
        self.lanes.iter().flatten().all(Option::is_none)
    }
}

/// One vector functional unit. Holds at most one instruction at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorComputeUnit {
    kind: FunctionalUnit,
    stages: LaneArray,
    elements: usize,
    next: usize,
    occupant: Option<usize>,
}

impl VectorComputeUnit {
    /// Idle unit of `lanes` lanes, `depth` stages each.
    #[must_use]
    pub fn new(kind: FunctionalUnit, lanes: usize, depth: usize) -> Self {
        Self {
            kind,
            stages: LaneArray::new(lanes, depth),
            elements: 0,
            next: 0,
            occupant: None,
        }
    }

    /// Operation class this unit executes.
    #[must_use]
    pub const fn kind(&self) -> FunctionalUnit {
        self.kind
    }

    /// Whether a new instruction may be accepted.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.occupant.is_none()
    }

    fn in_flight(&self) -> bool {
        self.next < self.elements || !self.stages.is_empty()
    }

    /// Starts instruction `record` over `vector_length` elements.
    pub fn accept(&mut self, record: usize, vector_length: usize) {
        self.occupant = Some(record);
        self.elements = vector_length;
        self.next = 0;
    }

    /// Advances every lane by one cycle.
    pub fn advance(&mut self) {
        if !self.in_flight() {
            return;
        }
        for lane in &mut self.stages.lanes {
            shift(lane);
            if self.next < self.elements {
                lane[0] = Some(self.next);
                self.next += 1;
            }
        }
    }

    /// Hands back the finished instruction, if its last element has drained.
    pub fn take_retired(&mut self) -> Option<usize> {
        if self.in_flight() {
            return None;
        }
        self.occupant.take()
    }
}

/// Per-bank occupancy countdowns for vector memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankState {
    countdowns: Vec<usize>,
    busy_time: usize,
}

impl BankState {
    /// `banks` free banks, each held `busy_time` cycles per access.
    #[must_use]
    pub fn new(banks: usize, busy_time: usize) -> Self {
        Self {
            countdowns: vec![0; banks.max(1)],
            busy_time,
        }
    }

    /// Bank serving `address`.
    #[must_use]
    pub fn bank_of(&self, address: usize) -> usize {
        address % self.countdowns.len()
    }

    /// Whether a bank is occupied.
    #[must_use]
    pub fn is_busy(&self, bank: usize) -> bool {
        self.countdowns.get(bank).is_some_and(|left| *left > 0)
    }

    /// Occupies the bank serving `address` if it is free.
    pub fn try_claim(&mut self, address: usize) -> bool {
        let bank = self.bank_of(address);
        if self.is_busy(bank) {
            return false;
        }
        self.countdowns[bank] = self.busy_time;
        true
    }

    /// One cycle elapses for every bank.
    pub fn tick(&mut self) {
        for left in &mut self.countdowns {
            *left = left.saturating_sub(1);
        }
    }
}

/// Vector load/store unit whose lane tails are gated by bank availability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorDataUnit {
    stages: LaneArray,
    addresses: Vec<usize>,
    next: usize,
    occupant: Option<usize>,
    banks: BankState,
    conflict_stalls: u64,
}

impl VectorDataUnit {
    /// Idle unit with all banks free.
    #[must_use]
    pub fn new(lanes: usize, depth: usize, banks: usize, bank_busy_time: usize) -> Self {
        Self {
            stages: LaneArray::new(lanes, depth),
            addresses: Vec::new(),
            next: 0,
            occupant: None,
            banks: BankState::new(banks, bank_busy_time),
            conflict_stalls: 0,
        }
    }

    /// Whether a new instruction may be accepted.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.occupant.is_none()
    }

    fn in_flight(&self) -> bool {
        self.next < self.addresses.len() || !self.stages.is_empty()
    }

    /// Starts instruction `record` over its resolved addresses.
    pub fn accept(&mut self, record: usize, addresses: Vec<usize>) {
        self.occupant = Some(record);
        self.addresses = addresses;
        self.next = 0;
    }

    /// Advances every lane whose tail can claim its bank; a lane that cannot
    /// holds in place and takes no new element. Banks count down every cycle.
    pub fn advance(&mut self) {
        if self.in_flight() {
            for lane in &mut self.stages.lanes {
                if let Some(address) = lane.last().copied().flatten() {
                    if !self.banks.try_claim(address) {
                        self.conflict_stalls += 1;
                        continue;
                    }
                }
                shift(lane);
                if let Some(address) = self.addresses.get(self.next) {
                    lane[0] = Some(*address);
                    self.next += 1;
                }
            }
        }
        self.banks.tick();
    }

    /// Hands back the finished instruction, if its last access has drained.
    pub fn take_retired(&mut self) -> Option<usize> {
        if self.in_flight() {
            return None;
        }
        self.occupant.take()
    }

    /// Lane-cycles lost to busy banks so far.
    #[must_use]
    pub const fn conflict_stalls(&self) -> u64 {
        self.conflict_stalls
    }
}

/// Single-slot scalar unit with a fixed one-cycle latency.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScalarUnit {
    remaining: usize,
    occupant: Option<usize>,
}

impl ScalarUnit {
    /// Whether a new instruction may be accepted.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.occupant.is_none()
    }

    /// Starts instruction `record`.
    pub fn accept(&mut self, record: usize) {
        self.occupant = Some(record);
        self.remaining = 1;
    }

    /// One cycle elapses.
    pub fn advance(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    /// Hands back the finished instruction once its latency has elapsed.
    pub fn take_retired(&mut self) -> Option<usize> {
        if self.remaining > 0 {
            return None;
        }
        self.occupant.take()
    }
}
