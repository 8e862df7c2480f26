//! View models for rendering analysis output.
//!
//! These types are DTOs (Data Transfer Objects) that prepare analysis state
//! for display. They live in the UI layer, not the domain layer.

use crate::domain::Score;

/// Display data for one principal variation
#[derive(Clone, Debug, PartialEq)]
pub struct LineDisplay {
    pub line_id: u32,
    pub depth: Option<u32>,
    /// e.g. "+0.35", "M3", "-M2"
    pub score: String,
    /// Move-numbered principal variation, e.g. "12... Nf6 13. Bg5"
    pub moves: String,
    /// Score and moves in one line
    pub text: String,
}

/// Display data for the evaluation bar
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvalBarDisplay {
    /// Share of the bar owned by White, in `[0, 1]`
    pub balance: f32,
    /// Score of the best line from White's point of view
    pub score: Score,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnalysisDisplay {
    pub lines: Vec<LineDisplay>,
    /// Hidden while analysis is off, before the first line arrives, and once
    /// the side to move is mated
    pub eval_bar: Option<EvalBarDisplay>,
}
