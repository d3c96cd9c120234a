//! Deterministic run fingerprint used for cross-host comparison.
//!
//! Runs a fixed dot-product program through the functional engine, replays
//! its trace through the timing engine, and prints one hash over the final
//! registers, both memories, the trace text, and the timing report.

use log as _;
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

use vmips_core::{
    AddressSpace, CoreConfig, CoreState, FunctionalEngine, Program, RegisterIndex, TimingConfig,
    TimingSim,
};

const DOT_PRODUCT: &str = "\
# VR4 lane i accumulates a[j] * b[j] for j = i mod 4, 16 elements 4 at a time
LS SR1 SR0 0        # element count
LS SR2 SR0 1        # strip width
LS SR6 SR0 2        # base of b
MTCL SR2
LV VR1 SR3
LVWS VR2 SR6 SR7
MULVV VR3 VR1 VR2
ADDVV VR4 VR4 VR3
ADD SR3 SR3 SR2
ADD SR6 SR6 SR2
SUB SR1 SR1 SR2
BGT SR1 SR0 -7
UNPACKLO VR5 VR4 VR0
SV VR4 SR6
HALT
";

fn hash_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        *hash ^= u64::from(*byte);
        *hash = hash.wrapping_mul(0x1000_0000_01B3);
    }
}

fn hash_words(hash: &mut u64, words: &[i32]) {
    for word in words {
        hash_bytes(hash, &word.to_le_bytes());
    }
}

fn fingerprint() -> String {
    let config = CoreConfig {
        max_vector_length: 8,
        scalar_address_bits: 8,
        vector_address_bits: 10,
        ..CoreConfig::default()
    };
    let vector: Vec<i32> = (1..=32).collect();
    let state = CoreState::with_memories(&config, &[16, 4, 16], &vector)
        .expect("snapshot fits the address spaces");
    let program = Program::parse(DOT_PRODUCT).expect("program verifies");

    let mut engine = FunctionalEngine::new(program, state, &config);
    engine
        .state_mut()
        .arch
        .srf
        .write_scalar(RegisterIndex::R7, 1);
    engine.run().expect("program halts");
    let (state, trace) = engine.into_parts();

    let timing = TimingConfig {
        num_lanes: 2,
        pipeline_depth_mul: 4,
        vdm_num_banks: 4,
        ..TimingConfig::default()
    };
    let report = TimingSim::new(trace.records().to_vec(), &timing)
        .run()
        .expect("trace drains");

    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    for row in state.arch.srf.rows().chain(state.arch.vrf.rows()) {
        hash_words(&mut hash, row);
    }
    for space in AddressSpace::ALL {
        hash_words(&mut hash, state.memory(space).words());
    }
    hash_bytes(&mut hash, trace.to_text().as_bytes());
    hash_bytes(&mut hash, &report.cycles.to_le_bytes());
    hash_bytes(&mut hash, &report.data_hazard_stalls.to_le_bytes());
    hash_bytes(&mut hash, &report.queue_full_stalls.to_le_bytes());
    hash_bytes(&mut hash, &report.bank_conflict_stalls.to_le_bytes());

    format!("{hash:016x} cycles={}", report.cycles)
}

fn main() {
    println!("{}", fingerprint());
}
