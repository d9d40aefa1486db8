// Data-driven game configuration.
//
// All tunable simulation parameters live here in `GameConfig`, loaded from
// JSON at startup. The sim never uses magic numbers for timing, physics, or
// the economy — it reads from the config. Both players in a match must run
// identical configs or their mirrored boards diverge.
//
// Parameters are grouped into nested sub-structs: `FallParams` (falling-group
// descent), `GravityParams` (free-fall of loose blocks), `TimingParams`
// (state-timer durations and the start countdown), and `EconomyParams` (the
// score-to-ice margin table and debt cap).

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Parameter groups
// ---------------------------------------------------------------------------

/// Descent of the player-controlled falling group.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FallParams {
    /// Constant downward velocity of the falling group, in cells/second.
    pub base_velocity: f32,
    /// Velocity multiplier while the player holds fast-fall.
    pub fast_multiplier: f32,
    /// Column the axis block spawns in.
    pub spawn_column: i32,
}

/// Free-fall physics of loose (`DownMoving`) blocks after a clear.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GravityParams {
    /// Downward acceleration in cells/second^2, scaled by how deep the block
    /// started: `acceleration * (1 + depth_factor * start_row)`.
    pub acceleration: f32,
    /// Per-row scaling applied to `acceleration` (see above).
    pub depth_factor: f32,
    /// Velocity cap in cells/second.
    pub max_velocity: f32,
}

/// State-timer durations and match-start countdown.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimingParams {
    /// Seconds a `Destroying` block takes to shatter.
    pub shatter_duration: f32,
    /// Seconds a melting (`Effecting`) ice block waits before it starts
    /// shattering like a normal clear.
    pub melt_duration: f32,
    /// Seconds between ice rows dropping during the ice-blocking phase.
    pub ice_row_interval: f32,
    /// Match-start countdown, in scheduler ticks.
    pub countdown_ticks: u32,
}

/// Score-to-ice conversion and attack bookkeeping.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EconomyParams {
    /// Per-block base score, multiplied by the bonus sum on every clear.
    pub base_score: u32,
    /// Highest combo depth that still earns a combo bonus.
    pub max_combo: u32,
    /// Margin divisor table: `(elapsed_seconds, divisor)` breakpoints in
    /// ascending order. The divisor in force is the one for the last
    /// breakpoint at or below the current match clock, so early clears
    /// convert score into ice at a lower divisor (more ice per point).
    pub margin_table: Vec<(u32, u32)>,
    /// Upper bound on pending ice debt. Incoming attacks beyond the cap are
    /// dropped.
    pub max_pending_ice: u32,
}

impl EconomyParams {
    /// The margin divisor in force at `elapsed` seconds into the match.
    pub fn margin_at(&self, elapsed: u32) -> u32 {
        let mut margin = 1;
        for &(threshold, divisor) in &self.margin_table {
            if elapsed >= threshold {
                margin = divisor;
            } else {
                break;
            }
        }
        margin.max(1)
    }
}

// ---------------------------------------------------------------------------
// Top-level game config
// ---------------------------------------------------------------------------

/// Top-level game configuration. Loaded from JSON, never mutated at runtime.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameConfig {
    pub fall: FallParams,
    pub gravity: GravityParams,
    pub timing: TimingParams,
    pub economy: EconomyParams,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            fall: FallParams {
                base_velocity: 1.2,
                fast_multiplier: 12.0,
                spawn_column: 2,
            },
            gravity: GravityParams {
                acceleration: 30.0,
                depth_factor: 0.08,
                max_velocity: 40.0,
            },
            timing: TimingParams {
                shatter_duration: 0.45,
                melt_duration: 0.3,
                ice_row_interval: 0.25,
                countdown_ticks: 90,
            },
            economy: EconomyParams {
                base_score: 10,
                max_combo: 14,
                margin_table: vec![
                    (0, 8),
                    (60, 12),
                    (120, 16),
                    (180, 25),
                    (240, 34),
                    (300, 52),
                    (360, 70),
                ],
                max_pending_ice: 60,
            },
        }
    }
}

impl GameConfig {
    /// Load a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
