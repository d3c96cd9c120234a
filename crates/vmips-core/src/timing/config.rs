//! Micro-architecture parameters for the timing engine and their
//! `key = value` text form.

use std::str::FromStr;

use thiserror::Error;

/// Default ceiling on simulated cycles.
pub const DEFAULT_CYCLE_LIMIT: u64 = 100_000_000;

/// Timing-model parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TimingConfig {
    /// Stages per lane of the add/subtract/compare unit.
    pub pipeline_depth_add: usize,
    /// Stages per lane of the multiply unit.
    pub pipeline_depth_mul: usize,
    /// Stages per lane of the divide unit.
    pub pipeline_depth_div: usize,
    /// Stages per lane of the shuffle unit.
    pub pipeline_depth_shuffle: usize,
    /// Parallel lanes in every vector unit.
    pub num_lanes: usize,
    /// Capacity of the vector-compute issue queue.
    pub compute_queue_depth: usize,
    /// Capacity of the vector-memory issue queue.
    pub data_queue_depth: usize,
    /// Stages per lane of the vector load/store unit.
    pub vls_pipeline_depth: usize,
    /// Number of vector memory banks.
    pub vdm_num_banks: usize,
    /// Cycles a bank stays occupied after an access.
    pub vdm_bank_busy_time: usize,
    /// Simulated cycles before the run is abandoned.
    pub cycle_limit: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            pipeline_depth_add: 1,
            pipeline_depth_mul: 1,
            pipeline_depth_div: 1,
            pipeline_depth_shuffle: 1,
            num_lanes: 1,
            compute_queue_depth: 4,
            data_queue_depth: 4,
            vls_pipeline_depth: 1,
            vdm_num_banks: 16,
            vdm_bank_busy_time: 1,
            cycle_limit: DEFAULT_CYCLE_LIMIT,
        }
    }
}

/// Configuration text that could not be accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Line without a `key = value` pair.
    #[error("line {line}: expected `key = value`, found `{text}`")]
    MalformedLine {
        /// 1-based line number.
        line: usize,
        /// Offending text, comment removed.
        text: String,
    },
    /// Key not understood by the timing model.
    #[error("line {line}: unknown parameter `{key}`")]
    UnknownKey {
        /// 1-based line number.
        line: usize,
        /// Offending key.
        key: String,
    },
    /// Value is not a positive integer.
    #[error("line {line}: parameter `{key}` must be a positive integer, found `{value}`")]
    InvalidValue {
        /// 1-based line number.
        line: usize,
        /// Parameter name.
        key: String,
        /// Offending value.
        value: String,
    },
}

/// Recognized parameter keys, in file order.
const KEYS: [&str; 10] = [
    "pipelineDepthAdd",
    "pipelineDepthMul",
    "pipelineDepthDiv",
    "pipelineDepthShuffle",
    "numLanes",
    "computeQueueDepth",
    "dataQueueDepth",
    "vlsPipelineDepth",
    "vdmNumBanks",
    "vdmBankBusyTime",
];

/// Optional key that raises or lowers the cycle ceiling.
const CYCLE_LIMIT_KEY: &str = "cycleLimit";

impl TimingConfig {
    fn field_mut(&mut self, key: &str) -> Option<&mut usize> {
        Some(match key {
            "pipelineDepthAdd" => &mut self.pipeline_depth_add,
            "pipelineDepthMul" => &mut self.pipeline_depth_mul,
            "pipelineDepthDiv" => &mut self.pipeline_depth_div,
            "pipelineDepthShuffle" => &mut self.pipeline_depth_shuffle,
            "numLanes" => &mut self.num_lanes,
            "computeQueueDepth" => &mut self.compute_queue_depth,
            "dataQueueDepth" => &mut self.data_queue_depth,
            "vlsPipelineDepth" => &mut self.vls_pipeline_depth,
            "vdmNumBanks" => &mut self.vdm_num_banks,
            "vdmBankBusyTime" => &mut self.vdm_bank_busy_time,
            _ => return None,
        })
    }

    /// Parses `key = value` text. `#` starts a comment; blank lines are
    /// ignored. Keys left out keep their default and are logged at warn
    /// level.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for malformed lines, unknown keys, and
    /// values that are not positive integers.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let mut seen = [false; KEYS.len()];

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let content = raw.split_once('#').map_or(raw, |(code, _)| code).trim();
            if content.is_empty() {
                continue;
            }
            let Some((key, value)) = content.split_once('=') else {
                return Err(ConfigError::MalformedLine {
                    line,
                    text: content.to_owned(),
                });
            };
            let (key, value) = (key.trim(), value.trim());
            let invalid = || ConfigError::InvalidValue {
                line,
                key: key.to_owned(),
                value: value.to_owned(),
            };

            if key == CYCLE_LIMIT_KEY {
                config.cycle_limit = value
                    .parse::<u64>()
                    .ok()
                    .filter(|limit| *limit > 0)
                    .ok_or_else(invalid)?;
                continue;
            }

            let parsed = value
                .parse::<usize>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or_else(invalid)?;
            let field = config.field_mut(key).ok_or_else(|| ConfigError::UnknownKey {
                line,
                key: key.to_owned(),
            })?;
            *field = parsed;
            if let Some(slot) = KEYS.iter().position(|known| *known == key) {
                seen[slot] = true;
            }
        }

        for (key, present) in KEYS.iter().zip(seen) {
            if !present {
                log::warn!("timing parameter `{key}` not set, using default");
            }
        }
        Ok(config)
    }

    /// Text form accepted by [`Self::parse`].
    #[must_use]
    pub fn to_text(&self) -> String {
        let values = [
            self.pipeline_depth_add,
            self.pipeline_depth_mul,
            self.pipeline_depth_div,
            self.pipeline_depth_shuffle,
            self.num_lanes,
            self.compute_queue_depth,
            self.data_queue_depth,
            self.vls_pipeline_depth,
            self.vdm_num_banks,
            self.vdm_bank_busy_time,
        ];
        let mut text: String = KEYS
            .iter()
            .zip(values)
            .map(|(key, value)| format!("{key} = {value}\n"))
            .collect();
        if self.cycle_limit != DEFAULT_CYCLE_LIMIT {
            text.push_str(&format!("{CYCLE_LIMIT_KEY} = {}\n", self.cycle_limit));
        }
        text
    }
}

impl FromStr for TimingConfig {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Self::parse(text)
    }
}
