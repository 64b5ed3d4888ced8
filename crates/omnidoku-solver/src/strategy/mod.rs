//! The strategy library.
//!
//! Every strategy is a pure pattern detector over a [`CandidateState`]: it
//! either places digits, eliminates candidates, or reports no progress. A
//! strategy that detects a contradictory grid returns a [`SolverError`].
//! Ranks run from 1 (singles) to 8 (pattern overlay, forcing chains); the
//! terminal rank-9 backtracking fallback lives outside this module.
//!
//! "Conservative" strategies only fire when they can prove at least one
//! elimination, using singles-propagation probes
//! ([`crate::has_logical_support_with_assignments`]) where the classical
//! pattern alone would over-eliminate.

use std::fmt::Debug;

use omnidoku_core::CellSet;

pub use self::{
    als::{AlsChain, AlsXyWing, AlsXz, DeathBlossom, SueDeCoq},
    chains::{Aic, ContinuousNiceLoop, ForcingChains, GroupedAic, GroupedXCycle, XChain, XyChain},
    coloring::{Medusa3D, RemotePairs, SimpleColoring},
    exotic::{Exocet, Msls, PatternOverlayMethod, SeniorExocet, SkLoop},
    fish::{BasicFish, FinnedFish, FrankenFish, KrakenFish, MutantFish},
    intersections::{BoxLineReduction, PointingPairs},
    single_digit::{EmptyRectangle, Skyscraper, TwoStringKite},
    singles::{HiddenSingle, NakedSingle},
    subsets::{HiddenSubset, NakedSubset},
    uniqueness::{
        AvoidableRectangle, BivalueOddagon, BugPlusOne, UniqueLoop, UniqueRectangle,
    },
    wings::{WWing, WxyzWing, XyzWing, YWing},
};
use crate::{CandidateState, SolverError, StrategyKind};

mod als;
mod chains;
mod coloring;
mod exotic;
mod fish;
mod intersections;
mod single_digit;
mod singles;
mod subsets;
mod uniqueness;
mod wings;

/// A Sudoku solving strategy.
pub trait Strategy: Debug + Send + Sync {
    /// The kind identifying this strategy (name, rank).
    fn kind(&self) -> StrategyKind;

    /// Applies the strategy to the state.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - progress was made (placements or eliminations)
    /// * `Ok(false)` - the pattern did not apply
    ///
    /// # Errors
    ///
    /// Returns [`SolverError`] if the strategy detects a contradictory grid.
    fn apply(&self, state: &mut CandidateState) -> Result<bool, SolverError>;
}

/// A boxed strategy.
pub type BoxedStrategy = Box<dyn Strategy>;

/// Returns the full strategy library in rank order.
#[must_use]
pub fn all_strategies() -> Vec<BoxedStrategy> {
    vec![
        // Rank 1
        Box::new(NakedSingle::new()),
        Box::new(HiddenSingle::new()),
        // Rank 2
        Box::new(PointingPairs::new()),
        Box::new(BoxLineReduction::new()),
        // Rank 3
        Box::new(NakedSubset::pair()),
        Box::new(HiddenSubset::pair()),
        Box::new(NakedSubset::triple()),
        Box::new(HiddenSubset::triple()),
        // Rank 4
        Box::new(NakedSubset::quad()),
        Box::new(HiddenSubset::quad()),
        Box::new(BasicFish::x_wing()),
        Box::new(YWing::new()),
        Box::new(Skyscraper::new()),
        Box::new(TwoStringKite::new()),
        Box::new(EmptyRectangle::new()),
        Box::new(RemotePairs::new()),
        // Rank 5
        Box::new(BasicFish::swordfish()),
        Box::new(XyzWing::new()),
        Box::new(FinnedFish::x_wing()),
        Box::new(UniqueRectangle::new()),
        Box::new(BugPlusOne::new()),
        Box::new(WWing::new()),
        Box::new(SimpleColoring::new()),
        // Rank 6
        Box::new(BasicFish::jellyfish()),
        Box::new(WxyzWing::new()),
        Box::new(FinnedFish::swordfish()),
        Box::new(FinnedFish::jellyfish()),
        Box::new(XChain::new()),
        Box::new(XyChain::new()),
        Box::new(AlsXz::new()),
        Box::new(UniqueLoop::new()),
        Box::new(AvoidableRectangle::new()),
        Box::new(BivalueOddagon::new()),
        // Rank 7
        Box::new(Medusa3D::new()),
        Box::new(Aic::new()),
        Box::new(GroupedAic::new()),
        Box::new(GroupedXCycle::new()),
        Box::new(ContinuousNiceLoop::new()),
        Box::new(AlsXyWing::new()),
        Box::new(AlsChain::new()),
        Box::new(SueDeCoq::new()),
        Box::new(DeathBlossom::new()),
        Box::new(FrankenFish::new()),
        Box::new(MutantFish::new()),
        Box::new(KrakenFish::new()),
        // Rank 8
        Box::new(Msls::new()),
        Box::new(Exocet::new()),
        Box::new(SeniorExocet::new()),
        Box::new(SkLoop::new()),
        Box::new(PatternOverlayMethod::new()),
        Box::new(ForcingChains::new()),
    ]
}

/// Removes `digit` as a candidate from every cell of `cells`.
///
/// Returns `true` if anything was removed.
pub(crate) fn eliminate_from_cells(
    state: &mut CandidateState,
    cells: &CellSet,
    digit: u8,
) -> bool {
    let mut changed = false;
    for idx in cells.iter().collect::<Vec<_>>() {
        changed |= state.eliminate(idx, digit);
    }
    changed
}

/// Visits every `k`-combination of `0..len` in lexicographic order.
///
/// Stops and returns `true` as soon as `visit` does.
pub(crate) fn combinations(len: usize, k: usize, visit: &mut dyn FnMut(&[usize]) -> bool) -> bool {
    if k > len {
        return false;
    }
    let mut indices: Vec<usize> = (0..k).collect();
    loop {
        if visit(&indices) {
            return true;
        }
        // Advance to the next combination.
        let mut pos = k;
        loop {
            if pos == 0 {
                return false;
            }
            pos -= 1;
            if indices[pos] != pos + len - k {
                break;
            }
        }
        indices[pos] += 1;
        for next in pos + 1..k {
            indices[next] = indices[next - 1] + 1;
        }
    }
}
