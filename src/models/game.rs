//! Game state model - the application layer for chess game state.
//!
//! Keeps the position the user set (as text, for the engine), the moves
//! played since, and a shakmaty position for legality checks.

use shakmaty::fen::{Fen, ParseFenError};
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, File, Move, Position as _, Role};
use tracing::{debug, info, warn};

use crate::domain::chess::{from_square, shakmaty_to_color, to_square};
use crate::domain::{MoveError, Piece, PieceColor, Position, PositionError, STARTPOS_FEN, Square};
use crate::models::interaction::{BoardInteraction, ClickOutcome};

/// The main game model containing all chess game state
pub struct GameModel {
    /// Position text as last set, sent to the engine as the base position
    base_fen: String,
    /// Board cells and move numbering of the current position
    position: Position,
    /// Half-move index of the base position
    start_half_moves: u32,
    /// Moves played since the base position, UCI notation
    moves: Vec<String>,
    /// Legal-move view of the current position
    chess: Chess,
    interaction: BoardInteraction,
    /// Side shown at the bottom of the board
    orientation: PieceColor,
}

impl GameModel {
    pub fn new() -> Self {
        Self {
            base_fen: STARTPOS_FEN.to_string(),
            position: Position::default(),
            start_half_moves: 0,
            moves: Vec::new(),
            chess: Chess::default(),
            interaction: BoardInteraction::new(),
            orientation: PieceColor::White,
        }
    }

    pub fn new_game(&mut self) {
        let orientation = self.orientation;
        *self = Self::new();
        self.orientation = orientation;
        info!("new game");
    }

    /// Replace the game with the given position string.
    ///
    /// Nothing changes if the string is rejected.
    pub fn set_position(&mut self, text: &str) -> Result<(), PositionError> {
        let text = text.trim();
        let mut position = Position::parse(text, self.position.side_to_move())?;

        // Build from our own parse so a fallback side to move is honoured.
        let fen: Fen = position
            .to_fen()
            .parse()
            .map_err(|e: ParseFenError| PositionError::Unplayable(e.to_string()))?;
        let chess: Chess = match fen.into_position(CastlingMode::Standard) {
            Ok(chess) => chess,
            Err(e) => {
                let chess = e
                    .ignore_invalid_castling_rights()
                    .map_err(|e| PositionError::Unplayable(e.to_string()))?;
                let castling = castling_field(&chess);
                warn!(%castling, "dropped castling rights without a matching king and rook");
                position.set_castling(castling);
                chess
            }
        };

        self.base_fen = position.to_fen();
        self.start_half_moves = position.start_half_move();
        self.position = position;
        self.chess = chess;
        self.moves.clear();
        self.interaction.reset();
        info!(fen = %self.base_fen, "position set");
        Ok(())
    }

    pub fn base_fen(&self) -> &str {
        &self.base_fen
    }

    pub fn moves(&self) -> &[String] {
        &self.moves
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn start_half_moves(&self) -> u32 {
        self.start_half_moves
    }

    /// Half-move index of the current position.
    pub fn current_half_move(&self) -> u32 {
        self.start_half_moves + self.moves.len() as u32
    }

    pub fn current_move_number(&self) -> u32 {
        1 + self.current_half_move() / 2
    }

    /// Get the turn for the current position
    pub fn current_turn(&self) -> PieceColor {
        shakmaty_to_color(self.chess.turn())
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.position.piece_at(square)
    }

    pub fn interaction(&self) -> &BoardInteraction {
        &self.interaction
    }

    pub fn orientation(&self) -> PieceColor {
        self.orientation
    }

    pub fn rotate(&mut self) {
        self.orientation = self.orientation.opposite();
    }

    /// Play a move given in UCI notation.
    pub fn play_uci(&mut self, text: &str) -> Result<(), MoveError> {
        let uci: UciMove = text
            .parse()
            .map_err(|_| MoveError::Unparseable(text.to_string()))?;
        let m = uci
            .to_move(&self.chess)
            .map_err(|_| MoveError::Illegal(text.to_string()))?;
        self.apply(m)
    }

    /// Try to make a move from one square to another.
    pub fn play_squares(&mut self, from: Square, to: Square) -> Result<(), MoveError> {
        let m = self
            .find_move(from, to)
            .ok_or_else(|| MoveError::Illegal(format!("{}{}", from, to)))?;
        self.apply(m)
    }

    /// Feed a board click to the interaction state. Returns the UCI move
    /// played, if the click completed one.
    pub fn click(&mut self, square: Square) -> Result<Option<String>, MoveError> {
        let chess = &self.chess;
        let outcome = self
            .interaction
            .click(square, |from| legal_targets(chess, from));
        match outcome {
            ClickOutcome::Updated => Ok(None),
            ClickOutcome::Move { from, to } => {
                self.play_squares(from, to)?;
                Ok(self.moves.last().cloned())
            }
        }
    }

    /// Legal move matching a from/to pair, with castling given by the king's
    /// destination and promotions defaulting to a queen.
    fn find_move(&self, from: Square, to: Square) -> Option<Move> {
        let from_sq = to_square(from);
        let to_sq = to_square(to);

        for m in &self.chess.legal_moves() {
            let Some((move_from, move_to)) = king_destination_squares(m) else {
                continue;
            };
            if move_from == from_sq && move_to == to_sq {
                let promotion = m.promotion();
                if promotion.is_some() && promotion != Some(Role::Queen) {
                    continue;
                }
                return Some(m.clone());
            }
        }
        None
    }

    fn apply(&mut self, m: Move) -> Result<(), MoveError> {
        let uci = m.to_uci(CastlingMode::Standard).to_string();
        self.chess = self
            .chess
            .clone()
            .play(m)
            .map_err(|_| MoveError::Illegal(uci.clone()))?;
        self.moves.push(uci.clone());

        self.position = Position::from_board(
            self.chess.board(),
            self.current_turn(),
            self.current_half_move(),
        );
        self.interaction.reset();
        debug!(mv = %uci, half_move = self.current_half_move(), "move played");
        Ok(())
    }
}

impl Default for GameModel {
    fn default() -> Self {
        Self::new()
    }
}

/// From/to squares the user would pick for a move.
fn king_destination_squares(m: &Move) -> Option<(shakmaty::Square, shakmaty::Square)> {
    match m {
        Move::Normal { from, to, .. } => Some((*from, *to)),
        Move::EnPassant { from, to, .. } => Some((*from, *to)),
        Move::Castle { king, rook, .. } => {
            // for castling, user picks the king's destination (g1/g8 or c1/c8)
            let king_dest = if rook.file() == File::H {
                shakmaty::Square::from_coords(File::G, rook.rank())
            } else {
                shakmaty::Square::from_coords(File::C, rook.rank())
            };
            Some((*king, king_dest))
        }
        Move::Put { .. } => None,
    }
}

/// Castling field for the rights shakmaty kept, e.g. "Kq" or "-".
fn castling_field(chess: &Chess) -> String {
    let rights = chess.castles().castling_rights();
    let field: String = [
        (shakmaty::Square::H1, 'K'),
        (shakmaty::Square::A1, 'Q'),
        (shakmaty::Square::H8, 'k'),
        (shakmaty::Square::A8, 'q'),
    ]
    .into_iter()
    .filter(|(rook, _)| rights.contains(*rook))
    .map(|(_, code)| code)
    .collect();
    if field.is_empty() {
        "-".to_string()
    } else {
        field
    }
}

/// Destinations of the piece on `from`, if it belongs to the side to move.
fn legal_targets(chess: &Chess, from: Square) -> Option<Vec<Square>> {
    let piece = chess.board().piece_at(to_square(from))?;
    if piece.color != chess.turn() {
        return None;
    }
    let from_sq = to_square(from);
    let mut targets: Vec<Square> = Vec::new();
    for (f, t) in chess.legal_moves().iter().filter_map(king_destination_squares) {
        let t = from_square(t);
        // promotions list the same destination once per piece
        if f == from_sq && !targets.contains(&t) {
            targets.push(t);
        }
    }
    Some(targets)
}
