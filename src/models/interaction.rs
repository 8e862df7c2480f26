//! Board click handling as an explicit two-state machine.

use crate::domain::Square;

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    PieceSelected {
        from: Square,
        /// Legal destinations, highlighted while the piece is selected.
        targets: Vec<Square>,
    },
}

/// What a click asks the game to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Nothing to do beyond redrawing the highlights.
    Updated,
    /// The user completed a move.
    Move { from: Square, to: Square },
}

#[derive(Clone, Debug, Default)]
pub struct BoardInteraction {
    state: InteractionState,
}

impl BoardInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn selected(&self) -> Option<Square> {
        match &self.state {
            InteractionState::PieceSelected { from, .. } => Some(*from),
            InteractionState::Idle => None,
        }
    }

    pub fn highlighted(&self) -> &[Square] {
        match &self.state {
            InteractionState::PieceSelected { targets, .. } => targets,
            InteractionState::Idle => &[],
        }
    }

    pub fn reset(&mut self) {
        self.state = InteractionState::Idle;
    }

    /// Advance on a click at `square`.
    ///
    /// `targets_from` returns the legal destinations of a piece of the side to
    /// move standing on the given square, or `None` if there is no such piece.
    pub fn click<F>(&mut self, square: Square, targets_from: F) -> ClickOutcome
    where
        F: Fn(Square) -> Option<Vec<Square>>,
    {
        let state = std::mem::take(&mut self.state);
        match state {
            InteractionState::PieceSelected { from, targets } if targets.contains(&square) => {
                ClickOutcome::Move { from, to: square }
            }
            InteractionState::PieceSelected { from, .. } if from == square => ClickOutcome::Updated,
            _ => {
                if let Some(targets) = targets_from(square) {
                    self.state = InteractionState::PieceSelected {
                        from: square,
                        targets,
                    };
                }
                ClickOutcome::Updated
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    /// White pawn on e2 with two pushes, white knight on g1.
    fn targets(square: Square) -> Option<Vec<Square>> {
        match square.to_string().as_str() {
            "e2" => Some(vec![sq("e3"), sq("e4")]),
            "g1" => Some(vec![sq("f3"), sq("h3")]),
            _ => None,
        }
    }

    #[test]
    fn test_select_then_move() {
        let mut ui = BoardInteraction::new();
        assert_eq!(ui.click(sq("e2"), targets), ClickOutcome::Updated);
        assert_eq!(ui.selected(), Some(sq("e2")));
        assert_eq!(ui.highlighted(), &[sq("e3"), sq("e4")]);

        assert_eq!(
            ui.click(sq("e4"), targets),
            ClickOutcome::Move { from: sq("e2"), to: sq("e4") }
        );
        assert_eq!(ui.state(), &InteractionState::Idle);
    }

    #[test]
    fn test_click_empty_square_while_idle() {
        let mut ui = BoardInteraction::new();
        ui.click(sq("e5"), targets);
        assert_eq!(ui.state(), &InteractionState::Idle);
    }

    #[test]
    fn test_reselect_other_piece() {
        let mut ui = BoardInteraction::new();
        ui.click(sq("e2"), targets);
        ui.click(sq("g1"), targets);
        assert_eq!(ui.selected(), Some(sq("g1")));
        assert_eq!(ui.highlighted(), &[sq("f3"), sq("h3")]);
    }

    #[test]
    fn test_deselect() {
        let mut ui = BoardInteraction::new();
        ui.click(sq("e2"), targets);
        ui.click(sq("e2"), targets);
        assert_eq!(ui.selected(), None);

        ui.click(sq("e2"), targets);
        ui.click(sq("a6"), targets);
        assert_eq!(ui.selected(), None);
        assert!(ui.highlighted().is_empty());
    }

    #[test]
    fn test_reset() {
        let mut ui = BoardInteraction::new();
        ui.click(sq("g1"), targets);
        ui.reset();
        assert_eq!(ui.state(), &InteractionState::Idle);
    }
}
