//! Domain layer: chess types, position parsing, UCI text protocol and score
//! normalisation. Nothing here touches processes or the terminal.

pub mod chess;
pub mod error;
pub mod position;
pub mod score;
pub mod uci;

pub use chess::{Piece, PieceColor, PieceKind, Square};
pub use error::{LineError, MalformedPosition, MoveError, PositionError};
pub use position::{MAX_MOVE_NUMBER, Position, STARTPOS_FEN, derive_start_half_move};
pub use uci::{DepthInfo, Score, SearchId, UciCommand, UciInfo, UciOutputKind};
