//! End-to-end behavior of the functional engine: programs are decoded from
//! text, run against seeded state, and checked against the final registers,
//! memories and trace.

use log as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

use proptest::prelude::*;
use vmips_core::{
    AddressSpace, CoreConfig, CoreState, FunctionalEngine, LanePatch, Program, RegisterFile,
    RegisterIndex, Resolution, SimError, VectorMask,
};

fn small_config() -> CoreConfig {
    CoreConfig {
        max_vector_length: 8,
        scalar_address_bits: 8,
        vector_address_bits: 8,
        ..CoreConfig::default()
    }
}

fn engine(source: &str, vector_words: &[i32]) -> FunctionalEngine {
    let config = small_config();
    let program = Program::parse(source).unwrap();
    let state = CoreState::with_memories(&config, &[], vector_words).unwrap();
    FunctionalEngine::new(program, state, &config)
}

fn reg(index: usize) -> RegisterIndex {
    RegisterIndex::from_index(index).unwrap()
}

#[test]
fn scalar_add_retires_and_traces_halt() {
    let mut engine = engine("ADD SR1 SR2 SR3\nHALT\n", &[]);
    engine.state_mut().arch.srf.write_scalar(reg(2), 4);
    engine.state_mut().arch.srf.write_scalar(reg(3), 5);

    let summary = engine.run().unwrap();
    assert_eq!(summary.retired, 1);
    assert_eq!(summary.trace_len, 2);
    assert_eq!(engine.state().arch.srf.read_scalar(reg(1)), 9);
    assert!(engine.is_halted());

    let text = engine.trace().to_text();
    assert_eq!(text, "ADD SR1 SR2 SR3\nHALT\n");
}

#[test]
fn unit_stride_load_honors_vector_length() {
    let memory = [10, 20, 30, 40, 50, 60, 70, 80];
    let mut engine = engine("MTCL SR2\nLV VR1 SR1\nHALT\n", &memory);
    engine.state_mut().arch.srf.write_scalar(reg(2), 4);

    engine.run().unwrap();
    let state = engine.state();
    assert_eq!(state.arch.vector_length(), 4);
    assert_eq!(state.arch.vrf.read(reg(1)), &[10, 20, 30, 40, 0, 0, 0, 0]);

    let load = &engine.trace().records()[1];
    assert_eq!(load.vector_length(), Some(4));
    assert_eq!(load.addresses(), &[0, 1, 2, 3]);
}

#[test]
fn masked_load_leaves_disabled_lanes() {
    let memory = [10, 20, 30, 40];
    let mut engine = engine("MTCL SR2\nLV VR1 SR1\nHALT\n", &memory);
    engine.state_mut().arch.srf.write_scalar(reg(2), 4);
    engine
        .state_mut()
        .arch
        .mask
        .overwrite(&[true, false, true, false]);

    engine.run().unwrap();
    assert_eq!(
        &engine.state().arch.vrf.read(reg(1))[..4],
        &[10, 0, 30, 0]
    );
}

#[test]
fn compare_pop_and_clear_drive_the_mask() {
    let source = "\
LV VR1 SR0
SGTVS VR1 SR1      # lanes above 2
POP SR2
CVM
POP SR3
HALT
";
    let memory = [1, 2, 3, 4, 5, 6, 7, 8];
    let mut engine = engine(source, &memory);
    engine.state_mut().arch.srf.write_scalar(reg(1), 2);

    engine.run().unwrap();
    let srf = &engine.state().arch.srf;
    assert_eq!(srf.read_scalar(reg(2)), 6);
    assert_eq!(srf.read_scalar(reg(3)), 8);
    assert_eq!(engine.state().arch.mask.count_ones(), 8);
}

#[test]
fn countdown_loop_traces_every_branch() {
    let source = "\
LS SR1 SR0 0
LS SR2 SR0 1
ADD SR3 SR3 SR1
SUB SR1 SR1 SR2
BGT SR1 SR0 -2
SS SR3 SR0 2
HALT
";
    let config = small_config();
    let program = Program::parse(source).unwrap();
    let state = CoreState::with_memories(&config, &[4, 1], &[]).unwrap();
    let mut engine = FunctionalEngine::new(program, state, &config);

    let summary = engine.run().unwrap();
    assert_eq!(engine.state().scalar_memory.read(2), 4 + 3 + 2 + 1);
    assert_eq!(summary.retired, 2 + 4 * 3 + 1);

    let targets: Vec<i64> = engine
        .trace()
        .records()
        .iter()
        .filter_map(|record| match record.resolution() {
            Resolution::Target(target) => Some(*target),
            _ => None,
        })
        .collect();
    assert_eq!(targets, vec![2, 2, 2, 5]);
}

#[test]
fn strided_store_and_indexed_gather_agree() {
    let source = "\
LV VR1 SR0
SVWS VR1 SR1 SR2
LVI VR2 SR1 VR3
HALT
";
    let memory = [5, 6, 7, 8, 9, 10, 11, 12];
    let mut engine = engine(source, &memory);
    engine.state_mut().arch.srf.write_scalar(reg(1), 100);
    engine.state_mut().arch.srf.write_scalar(reg(2), 3);
    let offsets: Vec<Option<i32>> = (0..8).map(|lane| Some(lane * 3)).collect();
    engine
        .state_mut()
        .arch
        .vrf
        .write(reg(3), &LanePatch::from_lanes(offsets));

    engine.run().unwrap();
    let state = engine.state();
    assert_eq!(state.vector_memory.read(100), 5);
    assert_eq!(state.vector_memory.read(103), 6);
    assert_eq!(state.vector_memory.read(121), 12);
    assert_eq!(state.arch.vrf.read(reg(2)), &memory);
}

#[test]
fn faults_stop_the_run_with_state_intact() {
    let mut engine = engine("ADD SR1 SR2 SR2\nDIV SR3 SR1 SR0\nHALT\n", &[]);
    engine.state_mut().arch.srf.write_scalar(reg(2), 6);

    assert_eq!(engine.run(), Err(SimError::DivisionByZero { pc: 1 }));
    assert_eq!(engine.state().arch.srf.read_scalar(reg(1)), 12);
    assert_eq!(engine.trace().len(), 2);
    assert!(!engine.is_halted());
}

#[test]
fn vector_access_past_memory_is_reported() {
    let mut engine = engine("LV VR1 SR1\nHALT\n", &[]);
    engine.state_mut().arch.srf.write_scalar(reg(1), 250);

    assert_eq!(
        engine.run(),
        Err(SimError::MemoryOutOfBounds {
            space: AddressSpace::Vector,
            address: 256,
            size: 256,
            pc: 0,
        })
    );
}

#[test]
fn instruction_limit_stops_an_endless_loop() {
    let config = CoreConfig {
        instruction_limit: 50,
        ..small_config()
    };
    let program = Program::parse("BEQ SR0 SR0 0\nHALT\n").unwrap();
    let mut engine = FunctionalEngine::new(program, CoreState::new(&config).unwrap(), &config);
    assert_eq!(
        engine.run(),
        Err(SimError::InstructionLimitExceeded { limit: 50 })
    );
}

/// Reference semantics for the scalar ALU, written against 64-bit integers.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
fn reference(op: usize, lhs: i32, rhs: i32) -> Option<i32> {
    let (a, b) = (i64::from(lhs), i64::from(rhs));
    let value = match op {
        0 => (a + b) as i32,
        1 => (a - b) as i32,
        2 => (a * b) as i32,
        3 => {
            if b == 0 {
                return None;
            }
            let quotient = a / b;
            let rounds_down = a % b != 0 && (a < 0) != (b < 0);
            (quotient - i64::from(rounds_down)) as i32
        }
        4 => lhs & rhs,
        5 => lhs | rhs,
        6 => lhs ^ rhs,
        7 if (0..32).contains(&rhs) => lhs << rhs,
        8 if (0..32).contains(&rhs) => ((lhs as u32) >> rhs) as i32,
        7 | 8 => 0,
        _ => lhs >> rhs.clamp(0, 31),
    };
    Some(value)
}

const MNEMONICS: [&str; 10] = [
    "ADD", "SUB", "MUL", "DIV", "AND", "OR", "XOR", "SLL", "SRL", "SRA",
];

fn scalar_step() -> impl Strategy<Value = (usize, usize, usize, usize)> {
    (0..MNEMONICS.len(), 0..8usize, 0..8usize, 0..8usize)
}

proptest! {
    #[test]
    fn scalar_programs_match_reference(
        seed in prop::array::uniform8(-40i32..40),
        steps in prop::collection::vec(scalar_step(), 1..24),
    ) {
        let mut source = String::new();
        for (op, dst, lhs, rhs) in &steps {
            source.push_str(&format!("{} SR{dst} SR{lhs} SR{rhs}\n", MNEMONICS[*op]));
        }
        source.push_str("HALT\n");

        let config = small_config();
        let program = Program::parse(&source).unwrap();
        let mut engine = FunctionalEngine::new(program, CoreState::new(&config).unwrap(), &config);
        let mut model = [0i32; 8];
        for idx in 1..8 {
            engine.state_mut().arch.srf.write_scalar(reg(idx), seed[idx]);
            model[idx] = seed[idx];
        }

        let mut expected_fault = None;
        for (pc, (op, dst, lhs, rhs)) in steps.iter().enumerate() {
            match reference(*op, model[*lhs], model[*rhs]) {
                Some(value) => {
                    if *dst != 0 {
                        model[*dst] = value;
                    }
                }
                None => {
                    expected_fault = Some(SimError::DivisionByZero { pc });
                    break;
                }
            }
        }

        match expected_fault {
            Some(fault) => prop_assert_eq!(engine.run(), Err(fault)),
            None => {
                prop_assert!(engine.run().is_ok());
            }
        }
        for (idx, value) in model.iter().enumerate() {
            prop_assert_eq!(engine.state().arch.srf.read_scalar(reg(idx)), *value);
        }
    }

    #[test]
    fn vector_alu_touches_only_active_lanes(
        vl in 1usize..=8,
        lhs in prop::collection::vec(-1000i32..1000, 8),
        rhs in prop::collection::vec(-1000i32..1000, 8),
        bits in prop::collection::vec(any::<bool>(), 8),
    ) {
        let mut engine = engine("MTCL SR1\nADDVV VR3 VR1 VR2\nHALT\n", &[]);
        let state = engine.state_mut();
        state.arch.srf.write_scalar(reg(1), i32::try_from(vl).unwrap());
        let full = |values: &[i32]| LanePatch::full(values);
        state.arch.vrf.write(reg(1), &full(&lhs));
        state.arch.vrf.write(reg(2), &full(&rhs));
        state.arch.vrf.write(reg(3), &full(&[77; 8]));
        state.arch.mask.overwrite(&bits);

        engine.run().unwrap();
        let out = engine.state().arch.vrf.read(reg(3));
        for lane in 0..8 {
            let expected = if lane < vl && bits[lane] { lhs[lane] + rhs[lane] } else { 77 };
            prop_assert_eq!(out[lane], expected);
        }
    }

    #[test]
    fn mask_application_is_idempotent(
        values in prop::collection::vec(any::<i32>(), 8),
        bits in prop::collection::vec(any::<bool>(), 8),
    ) {
        let mut mask = VectorMask::new(8);
        mask.overwrite(&bits);
        let patch = mask.apply(&values);
        prop_assert_eq!(patch.writes().count(), mask.count_ones());

        let mut file = RegisterFile::vector(8);
        file.write(reg(1), &patch);
        let once = file.read(reg(1)).to_vec();
        file.write(reg(1), &patch);
        prop_assert_eq!(file.read(reg(1)), once.as_slice());
        for lane in 0..8 {
            let expected = if bits[lane] { values[lane] } else { 0 };
            prop_assert_eq!(once[lane], expected);
        }
    }

    #[test]
    fn cleared_mask_enables_every_lane(bits in prop::collection::vec(any::<bool>(), 8)) {
        let mut mask = VectorMask::new(8);
        mask.overwrite(&bits);
        prop_assert_eq!(mask.count_ones(), bits.iter().filter(|bit| **bit).count());
        mask.clear();
        prop_assert_eq!(mask.count_ones(), 8);
        prop_assert!(mask.apply(&[1; 8]).lanes().iter().all(Option::is_some));
    }
}

#[test]
fn all_zero_mask_writes_nothing() {
    let mut mask = VectorMask::new(8);
    mask.overwrite(&[false; 8]);
    assert!(mask.apply(&[3; 8]).lanes().iter().all(Option::is_none));
    assert_eq!(mask.count_ones(), 0);
}
