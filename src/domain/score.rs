//! Maps an engine score onto the `[0, 1]` balance shown by the evaluation bar.

/// Upper bound of the balance for centipawn scores; the lower bound is `1 - MAX_BALANCE`.
pub const MAX_BALANCE: f32 = 0.95;

/// Logistic steepness, in pawns.
const STEEPNESS: f32 = 2.0;

/// Balance for a score given from White's point of view.
///
/// Mate scores pin the bar to either end. Centipawn scores go through a
/// logistic curve and are kept away from the ends so a winning position
/// still reads differently from a forced mate.
pub fn balance(score: i32, is_mate: bool) -> f32 {
    if is_mate {
        return if score > 0 { 1.0 } else { 0.0 };
    }

    let pawns = score as f32 / 100.0;
    let value = 1.0 / (1.0 + (-pawns / STEEPNESS).exp());
    value.clamp(1.0 - MAX_BALANCE, MAX_BALANCE)
}

/// The bar is hidden once the side to move is already mated.
pub fn eval_bar_visible(score: i32, is_mate: bool) -> bool {
    !(is_mate && score == 0)
}
