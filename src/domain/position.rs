//! Position model: board layout, side to move and move numbering parsed from
//! a six-field FEN-style string.

use std::str::FromStr;

use tracing::warn;

use crate::domain::chess::{Piece, PieceColor, Square, from_square, shakmaty_to_piece};
use crate::domain::error::{MalformedPosition, PositionError};

pub const STARTPOS_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

const FIELD_COUNT: usize = 6;

/// Largest accepted full-move number. Leaves room for the half-move index
/// of the position plus any number of moves played after it.
pub const MAX_MOVE_NUMBER: u32 = u32::MAX / 4;

/// Zero-based half-move index of a position.
///
/// White's first move is half-move 0, Black's reply is half-move 1.
pub fn derive_start_half_move(move_number: u32, side: PieceColor) -> Result<u32, PositionError> {
    if move_number == 0 || move_number > MAX_MOVE_NUMBER {
        return Err(PositionError::InvalidMoveNumber);
    }
    let black = u32::from(side == PieceColor::Black);
    (move_number - 1)
        .checked_mul(2)
        .and_then(|half| half.checked_add(black))
        .ok_or(PositionError::InvalidMoveNumber)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    /// Indexed `[rank][file]`, rank 0 = rank 1.
    cells: [[Option<Piece>; 8]; 8],
    side_to_move: PieceColor,
    move_number: u32,
    start_half_move: u32,
    castling: String,
    en_passant: String,
    halfmove_clock: String,
}

impl Position {
    /// Parse a position string.
    ///
    /// An unrecognised side-to-move letter keeps `previous_side`.
    pub fn parse(text: &str, previous_side: PieceColor) -> Result<Self, PositionError> {
        let fields: Vec<&str> = text.split_whitespace().collect();
        if fields.len() != FIELD_COUNT {
            return Err(MalformedPosition::FieldCount(fields.len()).into());
        }

        let cells = parse_placement(fields[0])?;

        let side_to_move = match fields[1] {
            "w" => PieceColor::White,
            "b" => PieceColor::Black,
            other => {
                warn!(side = other, "unrecognised side to move, keeping previous");
                previous_side
            }
        };

        let move_number: u32 = fields[5]
            .parse()
            .map_err(|_| MalformedPosition::MoveNumber(fields[5].to_string()))?;
        let start_half_move = derive_start_half_move(move_number, side_to_move)?;

        Ok(Self {
            cells,
            side_to_move,
            move_number,
            start_half_move,
            castling: fields[2].to_string(),
            en_passant: fields[3].to_string(),
            halfmove_clock: fields[4].to_string(),
        })
    }

    /// Build a position from a board produced by the legal move generator,
    /// `half_move` plies into the game.
    pub fn from_board(board: &shakmaty::Board, side_to_move: PieceColor, half_move: u32) -> Self {
        let mut cells = [[None; 8]; 8];
        for sq in shakmaty::Square::ALL {
            if let Some(piece) = board.piece_at(sq) {
                let ours = from_square(sq);
                cells[ours.rank() as usize][ours.file() as usize] = Some(shakmaty_to_piece(piece));
            }
        }
        Self {
            cells,
            side_to_move,
            move_number: 1 + half_move / 2,
            start_half_move: half_move,
            castling: "-".to_string(),
            en_passant: "-".to_string(),
            halfmove_clock: "0".to_string(),
        }
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.cells[square.rank() as usize][square.file() as usize]
    }

    pub fn side_to_move(&self) -> PieceColor {
        self.side_to_move
    }

    pub fn move_number(&self) -> u32 {
        self.move_number
    }

    pub fn start_half_move(&self) -> u32 {
        self.start_half_move
    }

    /// Replace the castling field, e.g. with the rights that survived
    /// validation.
    pub fn set_castling(&mut self, castling: String) {
        self.castling = castling;
    }

    /// Board layout field, rank 8 first.
    pub fn placement(&self) -> String {
        let mut out = String::with_capacity(64);
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                match self.cells[rank][file] {
                    Some(piece) => {
                        if empty > 0 {
                            out.push(char::from(b'0' + empty));
                            empty = 0;
                        }
                        out.push(piece.code());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                out.push(char::from(b'0' + empty));
            }
            if rank > 0 {
                out.push('/');
            }
        }
        out
    }

    /// All six fields, with the unused ones passed through verbatim.
    pub fn to_fen(&self) -> String {
        let side = match self.side_to_move {
            PieceColor::White => "w",
            PieceColor::Black => "b",
        };
        format!(
            "{} {} {} {} {} {}",
            self.placement(),
            side,
            self.castling,
            self.en_passant,
            self.halfmove_clock,
            self.move_number
        )
    }
}

impl Default for Position {
    fn default() -> Self {
        Self {
            castling: "KQkq".to_string(),
            ..Self::from_board(&shakmaty::Board::default(), PieceColor::White, 0)
        }
    }
}

impl FromStr for Position {
    type Err = PositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::parse(s, PieceColor::White)
    }
}

fn parse_placement(layout: &str) -> Result<[[Option<Piece>; 8]; 8], MalformedPosition> {
    let ranks: Vec<&str> = layout.split('/').collect();
    if ranks.len() != 8 {
        return Err(MalformedPosition::RankCount(ranks.len()));
    }

    let mut cells = [[None; 8]; 8];
    for (row, description) in ranks.iter().enumerate() {
        let rank = 7 - row;
        let mut file = 0usize;
        for ch in description.chars() {
            if let Some(skip) = ch.to_digit(10) {
                if skip == 0 {
                    return Err(MalformedPosition::RankWidth { rank: rank as u8 + 1 });
                }
                file += skip as usize;
            } else {
                let piece = Piece::try_from(ch)?;
                if file >= 8 {
                    return Err(MalformedPosition::RankWidth { rank: rank as u8 + 1 });
                }
                cells[rank][file] = Some(piece);
                file += 1;
            }
            if file > 8 {
                return Err(MalformedPosition::RankWidth { rank: rank as u8 + 1 });
            }
        }
        if file != 8 {
            return Err(MalformedPosition::RankWidth { rank: rank as u8 + 1 });
        }
    }
    Ok(cells)
}
