//! Display generation for analysis lines, the move list, the evaluation bar
//! and the board.
//!
//! This module transforms model state into display-ready text. Nothing here
//! mutates state.

use crate::domain::score::eval_bar_visible;
use crate::domain::{PieceColor, Score, Square};
use crate::models::analysis::LineAggregator;
use crate::models::game::GameModel;
use crate::ui::view_models::{AnalysisDisplay, EvalBarDisplay, LineDisplay};

/// Render every received line, best first.
///
/// Engine scores are relative to the side to move; they are shown from
/// White's point of view.
pub fn render_analysis(
    lines: &LineAggregator,
    start_half_move: u32,
    side_to_move: PieceColor,
    enabled: bool,
) -> AnalysisDisplay {
    let mut display = AnalysisDisplay::default();
    if !enabled {
        return display;
    }

    for info in lines.lines() {
        let white_score = match side_to_move {
            PieceColor::White => info.score,
            PieceColor::Black => info.score.negated(),
        };
        let score = format_score(white_score);
        let moves = numbered_moves(start_half_move, &info.pv);

        if display.lines.is_empty()
            && eval_bar_visible(white_score.value(), white_score.is_mate())
        {
            display.eval_bar = Some(EvalBarDisplay {
                balance: white_score.balance(),
                score: white_score,
            });
        }

        display.lines.push(LineDisplay {
            line_id: info.line_id,
            depth: info.depth,
            text: format!("[{}] {}", score, moves),
            score,
            moves,
        });
    }

    display
}

/// Format a score for display, e.g. "+0.35", "-1.25", "M3" or "-M2"
pub fn format_score(score: Score) -> String {
    match score {
        Score::Centipawns(cp) => {
            let pawns = cp as f64 / 100.0;
            if cp >= 0 {
                format!("+{:.2}", pawns)
            } else {
                format!("{:.2}", pawns)
            }
        }
        Score::Mate(moves) => {
            if moves >= 0 {
                format!("M{}", moves)
            } else {
                format!("-M{}", moves.unsigned_abs())
            }
        }
    }
}

/// Number a move sequence starting at `start_half_move`.
///
/// White moves carry "N."; a sequence starting with Black's move opens with
/// "N..."; later Black moves are bare.
pub fn numbered_moves(start_half_move: u32, moves: &[String]) -> String {
    let mut parts = Vec::with_capacity(moves.len());
    for (i, mv) in moves.iter().enumerate() {
        let half_move = u64::from(start_half_move) + i as u64;
        let number = 1 + half_move / 2;
        if half_move % 2 == 0 {
            parts.push(format!("{}. {}", number, mv));
        } else if i == 0 {
            parts.push(format!("{}... {}", number, mv));
        } else {
            parts.push(mv.clone());
        }
    }
    parts.join(" ")
}

/// The game's moves, numbered from its base position.
pub fn move_list(game: &GameModel) -> String {
    numbered_moves(game.start_half_moves(), game.moves())
}

/// Horizontal evaluation bar: White's share on the left.
pub fn render_eval_bar(bar: &EvalBarDisplay, width: usize) -> String {
    let white = ((bar.balance * width as f32).round() as usize).min(width);
    format!(
        "{}{} {}",
        "#".repeat(white),
        ".".repeat(width - white),
        format_score(bar.score)
    )
}

/// Text board seen from the game's orientation. Legal targets of a selected
/// piece are marked with `*`, the selected piece is bracketed.
pub fn render_board(game: &GameModel) -> String {
    let interaction = game.interaction();
    let (ranks, files): (Vec<u8>, Vec<u8>) = match game.orientation() {
        PieceColor::White => ((0..8).rev().collect(), (0..8).collect()),
        PieceColor::Black => ((0..8).collect(), (0..8).rev().collect()),
    };

    let mut out = String::new();
    for &rank in &ranks {
        out.push_str(&format!("{} ", rank + 1));
        for &file in &files {
            let Some(square) = Square::new(file, rank) else {
                continue;
            };
            let glyph = match game.piece_at(square) {
                Some(piece) => piece.code(),
                None if interaction.highlighted().contains(&square) => '*',
                None => '.',
            };
            if interaction.selected() == Some(square) {
                out.push('[');
                out.push(glyph);
                out.push(']');
            } else {
                out.push(' ');
                out.push(glyph);
                out.push(' ');
            }
        }
        out.push('\n');
    }
    out.push_str("  ");
    for &file in &files {
        out.push(' ');
        out.push((b'a' + file) as char);
        out.push(' ');
    }
    out
}
