use std::fs;
use std::path::Path;

use fiber_core::{ErrorInfo, FiberError};
use serde::{Deserialize, Serialize};

/// Parameters governing a single chain, readable from YAML or JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Number of states recorded in the output chain.
    pub iter: usize,
    /// Raw steps taken per recorded state.
    #[serde(default = "default_thin")]
    pub thin: usize,
    /// Stationary distribution targeted by the acceptance step.
    #[serde(default)]
    pub target: Target,
    /// Proposal strategy used for every raw step.
    #[serde(default)]
    pub strategy: Strategy,
    /// Sequential importance sampling restarts.
    #[serde(default)]
    pub sis: SisConfig,
    /// Master seed and substream used by [`crate::run_seeded`].
    #[serde(default)]
    pub seed_policy: SeedPolicy,
}

fn default_thin() -> usize {
    1
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            iter: 1000,
            thin: default_thin(),
            target: Target::default(),
            strategy: Strategy::default(),
            sis: SisConfig::default(),
            seed_policy: SeedPolicy::default(),
        }
    }
}

/// Stationary law of the chain on the fiber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    /// Conditional multinomial law, weights proportional to `1 / prod(x_k!)`.
    #[default]
    Hypergeometric,
    /// Uniform law over the fiber.
    Uniform,
}

impl Target {
    /// Stable label used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Hypergeometric => "hypergeometric",
            Target::Uniform => "uniform",
        }
    }
}

/// Proposal strategy; exactly one is active per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Add a uniformly selected move.
    #[default]
    Direct,
    /// Add a uniformly drawn feasible multiple of a uniformly selected move.
    HitAndRun,
    /// Walk the feasible line of the selected move with a short inner chain.
    Adaptive,
    /// Add a move selected proportionally to its acceptance history.
    WeightedSelection,
}

impl Strategy {
    /// Stable label used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Direct => "direct",
            Strategy::HitAndRun => "hit-and-run",
            Strategy::Adaptive => "adaptive",
            Strategy::WeightedSelection => "weighted-selection",
        }
    }
}

/// Restart policy substituting fresh fiber points for proposals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SisConfig {
    /// Whether restarts are drawn at all.
    #[serde(default)]
    pub enabled: bool,
    /// Per-step restart probability. Defaults depend on the target.
    #[serde(default)]
    pub probability: Option<f64>,
    /// Node budget of the fiber point search.
    #[serde(default = "default_max_search_nodes")]
    pub max_search_nodes: usize,
}

fn default_max_search_nodes() -> usize {
    1_000_000
}

impl Default for SisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            probability: None,
            max_search_nodes: default_max_search_nodes(),
        }
    }
}

impl SisConfig {
    /// Restart probability in effect for `target`.
    pub fn probability_for(&self, target: Target) -> f64 {
        self.probability.unwrap_or(match target {
            Target::Hypergeometric => 0.01,
            Target::Uniform => 0.05,
        })
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed used for the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Substream of the master seed; distinct values give independent chains.
    #[serde(default)]
    pub stream: u64,
    /// Optional label describing the run.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x05EE_D5EE_DD15_5EED_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            stream: 0,
            label: None,
        }
    }
}

impl ChainConfig {
    /// Total number of raw steps, `iter * thin`.
    pub fn total_steps(&self) -> usize {
        self.iter.saturating_mul(self.thin)
    }

    /// Checks the settings for internal consistency.
    pub fn validate(&self) -> Result<(), FiberError> {
        if self.iter == 0 {
            return Err(FiberError::config("zero-iter", "iter must be positive"));
        }
        if self.thin == 0 {
            return Err(FiberError::config("zero-thin", "thin must be positive"));
        }
        if self.target == Target::Uniform && self.strategy == Strategy::Adaptive {
            return Err(FiberError::Config(
                ErrorInfo::new(
                    "strategy-target-mismatch",
                    "adaptive line search targets the hypergeometric law",
                )
                .with_context("target", self.target.as_str())
                .with_context("strategy", self.strategy.as_str())
                .with_hint("use direct, hit-and-run or weighted-selection"),
            ));
        }
        if self.sis.enabled {
            let probability = self.sis.probability_for(self.target);
            if !(0.0..=1.0).contains(&probability) {
                return Err(FiberError::Config(
                    ErrorInfo::new("sis-probability", "restart probability must lie in [0, 1]")
                        .with_context("probability", probability),
                ));
            }
            if self.sis.max_search_nodes == 0 {
                return Err(FiberError::config(
                    "sis-search-budget",
                    "max_search_nodes must be positive",
                ));
            }
        }
        Ok(())
    }

    /// Parses a YAML document.
    pub fn from_yaml_str(contents: &str) -> Result<Self, FiberError> {
        serde_yaml::from_str(contents)
            .map_err(|err| FiberError::Serde(ErrorInfo::new("config-yaml-parse", err.to_string())))
    }

    /// Parses a JSON document.
    pub fn from_json_str(contents: &str) -> Result<Self, FiberError> {
        serde_json::from_str(contents)
            .map_err(|err| FiberError::Serde(ErrorInfo::new("config-json-parse", err.to_string())))
    }

    /// Loads and validates a configuration file; `.json` files are read as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self, FiberError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            FiberError::Serde(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display()),
            )
        })?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json_str(&contents)
        } else {
            Self::from_yaml_str(&contents)
        }
        .map_err(|err| match err {
            FiberError::Serde(info) => {
                FiberError::Serde(info.with_context("path", path.display()))
            }
            other => other,
        })?;
        config.validate()?;
        Ok(config)
    }
}
