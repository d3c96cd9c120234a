#![no_main]

use libfuzzer_sys::fuzz_target;
use vmips_core::{CoreConfig, CoreState, FunctionalEngine, Program, TimingConfig, TimingSim, TraceLog};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let _ = TraceLog::parse(text).map(|trace| {
        let config = TimingConfig {
            cycle_limit: 100_000,
            ..TimingConfig::default()
        };
        TimingSim::new(trace.into_records(), &config).run()
    });
    let _ = TimingConfig::parse(text);

    let Ok(program) = Program::parse(text) else {
        return;
    };
    let config = CoreConfig {
        max_vector_length: 8,
        scalar_address_bits: 6,
        vector_address_bits: 8,
        instruction_limit: 10_000,
        ..CoreConfig::default()
    };
    let Ok(state) = CoreState::new(&config) else {
        return;
    };
    let mut engine = FunctionalEngine::new(program, state, &config);
    if engine.run().is_ok() {
        let (_, trace) = engine.into_parts();
        let _ = TimingSim::new(trace.into_records(), &TimingConfig::default()).run();
    }
});
