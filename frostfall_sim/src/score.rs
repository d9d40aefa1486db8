// Score and garbage economy.
//
// Every time a board clears, the wave is scored as
// `cleared_blocks * base_score * (combo_bonus + link_bonus + kind_bonus + 1)`
// and the score converts into outgoing ice through a time-keyed margin
// divisor, carrying the division remainder to the next wave.
//
// Attack offsetting: freshly produced ice first pays down the producer's own
// pending debt (defense); only the surplus travels to the opponent. The split
// always conserves: `defended + forwarded == produced`.
//
// All tables here are fixed. Tunable economy values (base score, combo cap,
// margin breakpoints, debt cap) come from `EconomyParams`.

use serde::{Deserialize, Serialize};

use crate::config::EconomyParams;
use crate::match_engine::MatchGroup;

/// Per-player score and garbage bookkeeping.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ScoreState {
    /// Lifetime score.
    pub score: u32,
    /// Division remainder carried between margin conversions.
    remainder: u32,
    /// Depth of the current chain: 1 for the first wave after a placement.
    pub combo_depth: u32,
    /// Ice owed to this board, waiting for the next ice-blocking phase.
    pub pending_ice: u32,
    /// Lifetime ice sent to the opponent.
    pub total_sent: u32,
    /// Lifetime ice received from the opponent.
    pub total_received: u32,
}

/// What one cleared wave earned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClearReport {
    pub score_gained: u32,
    /// Ice produced by this wave, before attack offsetting.
    pub garbage: u32,
    pub combo_depth: u32,
}

/// How one batch of produced ice split between defense and attack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttackSplit {
    pub defended: u32,
    pub forwarded: u32,
}

impl ScoreState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh chain. Called when a new falling group spawns.
    pub fn reset_combo(&mut self) {
        self.combo_depth = 0;
    }

    /// Score one wave of simultaneously cleared groups. `elapsed` is the
    /// match clock in whole seconds, used to pick the margin divisor.
    pub fn resolve_clear(
        &mut self,
        groups: &[MatchGroup],
        elapsed: u32,
        economy: &EconomyParams,
    ) -> ClearReport {
        self.combo_depth += 1;
        let cleared: u32 = groups.iter().map(|g| g.members.len() as u32).sum();
        let largest = groups.iter().map(|g| g.members.len()).max().unwrap_or(0);

        let bonus = combo_bonus(self.combo_depth, economy.max_combo)
            + link_bonus(largest)
            + kind_bonus(groups.len());
        let score_gained = cleared * economy.base_score * (bonus + 1);
        self.score += score_gained;

        let margin = economy.margin_at(elapsed);
        let pool = score_gained + self.remainder;
        let garbage = pool / margin;
        self.remainder = pool % margin;

        ClearReport {
            score_gained,
            garbage,
            combo_depth: self.combo_depth,
        }
    }

    /// Split freshly produced ice between paying down our own pending debt
    /// and attacking the opponent.
    pub fn offset_attack(&mut self, produced: u32) -> AttackSplit {
        let defended = produced.min(self.pending_ice);
        self.pending_ice -= defended;
        let forwarded = produced - defended;
        self.total_sent += forwarded;
        AttackSplit { defended, forwarded }
    }

    /// Book an incoming attack as pending debt, dropping anything over the
    /// debt cap.
    pub fn receive_attack(&mut self, amount: u32, economy: &EconomyParams) {
        self.total_received += amount;
        self.pending_ice = (self.pending_ice + amount).min(economy.max_pending_ice);
    }

    /// Drain the pending debt for the ice-blocking phase.
    pub fn take_pending(&mut self) -> u32 {
        std::mem::take(&mut self.pending_ice)
    }
}

/// Chain-depth bonus: nothing for the first wave, a doubling run for depths
/// 2 through 4, then a linear climb until the combo cap. Depths past the cap
/// earn nothing.
pub fn combo_bonus(depth: u32, max_combo: u32) -> u32 {
    if depth > max_combo {
        return 0;
    }
    match depth {
        0 | 1 => 0,
        2 => 4,
        3 => 8,
        4 => 16,
        _ => 32 * (depth - 4),
    }
}

/// Group-size bonus, keyed by the largest cleared group.
pub fn link_bonus(largest: usize) -> u32 {
    match largest {
        0..=4 => 0,
        5 => 2,
        6 => 3,
        7 => 4,
        8 => 5,
        9 => 6,
        10 => 7,
        _ => 10,
    }
}

/// Simultaneity bonus, keyed by how many distinct groups cleared at once.
pub fn kind_bonus(group_count: usize) -> u32 {
    match group_count {
        0 | 1 => 0,
        2 => 3,
        3 => 6,
        4 => 12,
        _ => 24,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::types::{BlockId, BlockKind};
    use smallvec::SmallVec;

    fn group(kind: BlockKind, size: usize) -> MatchGroup {
        let members: SmallVec<[BlockId; 8]> = (0..size as u32).map(BlockId).collect();
        MatchGroup { kind, members }
    }

    #[test]
    fn combo_table_endpoints() {
        let max = 14;
        assert_eq!(combo_bonus(1, max), 0);
        assert_eq!(combo_bonus(2, max), 4);
        assert_eq!(combo_bonus(3, max), 8);
        assert_eq!(combo_bonus(4, max), 16);
        assert_eq!(combo_bonus(5, max), 32);
        assert_eq!(combo_bonus(6, max), 64);
        // Past the cap the bonus drops to nothing.
        assert_eq!(combo_bonus(max + 1, max), 0);
    }

    #[test]
    fn link_bonus_floor_and_cap() {
        assert_eq!(link_bonus(4), 0);
        assert_eq!(link_bonus(5), 2);
        assert_eq!(link_bonus(10), 7);
        assert_eq!(link_bonus(11), 10);
        assert_eq!(link_bonus(50), 10);
    }

    #[test]
    fn kind_bonus_caps() {
        assert_eq!(kind_bonus(1), 0);
        assert_eq!(kind_bonus(2), 3);
        assert_eq!(kind_bonus(5), 24);
        assert_eq!(kind_bonus(9), 24);
    }

    #[test]
    fn first_wave_scores_base_only() {
        let economy = GameConfig::default().economy;
        let mut state = ScoreState::new();
        state.reset_combo();
        let report = state.resolve_clear(&[group(BlockKind::Ruby, 4)], 0, &economy);
        // depth 1, smallest group, single group: every bonus is zero.
        assert_eq!(report.combo_depth, 1);
        assert_eq!(report.score_gained, 4 * economy.base_score);
    }

    #[test]
    fn chain_depth_multiplies_later_waves() {
        let economy = GameConfig::default().economy;
        let mut state = ScoreState::new();
        state.reset_combo();
        let first = state.resolve_clear(&[group(BlockKind::Ruby, 4)], 0, &economy);
        let second = state.resolve_clear(&[group(BlockKind::Topaz, 4)], 0, &economy);
        assert_eq!(second.combo_depth, 2);
        // Same cleared count, but the depth-2 bonus kicks in: (4 + 1) vs 1.
        assert_eq!(second.score_gained, first.score_gained * 5);
    }

    #[test]
    fn remainder_carries_between_waves() {
        let economy = EconomyParams {
            base_score: 1,
            max_combo: 14,
            margin_table: vec![(0, 7)],
            max_pending_ice: 60,
        };
        let mut state = ScoreState::new();
        // 4 points against margin 7: no garbage, remainder 4.
        let first = state.resolve_clear(&[group(BlockKind::Ruby, 4)], 0, &economy);
        assert_eq!(first.garbage, 0);
        state.reset_combo();
        // Another 4 points: pool 8, garbage 1, remainder 1.
        let second = state.resolve_clear(&[group(BlockKind::Ruby, 4)], 0, &economy);
        assert_eq!(second.garbage, 1);
        state.reset_combo();
        // Another 4: pool 5, still short of the divisor.
        let third = state.resolve_clear(&[group(BlockKind::Ruby, 4)], 0, &economy);
        assert_eq!(third.garbage, 0);
    }

    #[test]
    fn later_clears_convert_less_efficiently() {
        let economy = GameConfig::default().economy;
        let groups = [group(BlockKind::Ruby, 8), group(BlockKind::Topaz, 8)];

        let mut early = ScoreState::new();
        let early_report = early.resolve_clear(&groups, 0, &economy);

        let mut late = ScoreState::new();
        let late_report = late.resolve_clear(&groups, 400, &economy);

        assert_eq!(early_report.score_gained, late_report.score_gained);
        assert!(early_report.garbage > late_report.garbage);
    }

    #[test]
    fn attack_split_conserves() {
        let economy = GameConfig::default().economy;
        for debt in [0u32, 1, 3, 7, 20] {
            for produced in [0u32, 1, 5, 12, 40] {
                let mut state = ScoreState::new();
                state.receive_attack(debt, &economy);
                let split = state.offset_attack(produced);
                assert_eq!(split.defended + split.forwarded, produced);
                assert_eq!(split.defended, debt.min(produced));
                assert_eq!(state.pending_ice, debt.saturating_sub(produced));
            }
        }
    }

    #[test]
    fn pending_debt_is_capped() {
        let economy = GameConfig::default().economy;
        let mut state = ScoreState::new();
        state.receive_attack(economy.max_pending_ice + 25, &economy);
        assert_eq!(state.pending_ice, economy.max_pending_ice);
        // The lifetime counter still records the full amount.
        assert_eq!(state.total_received, economy.max_pending_ice + 25);
    }

    #[test]
    fn take_pending_drains_debt() {
        let economy = GameConfig::default().economy;
        let mut state = ScoreState::new();
        state.receive_attack(9, &economy);
        assert_eq!(state.take_pending(), 9);
        assert_eq!(state.pending_ice, 0);
        assert_eq!(state.take_pending(), 0);
    }
}
