#[macro_use]
extern crate serde_derive;

use std::error::Error;
use std::fmt;
use std::str::FromStr;

/// A board coordinate. Files run a-h (0-7), ranks 1-8 (0-7), so `Square
/// { file: 4, rank: 1 }` is e2.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Square {
    pub file: u8,
    pub rank: u8,
}

impl Square {
    pub fn new(file: u8, rank: u8) -> Square {
        Square {
            file: file,
            rank: rank,
        }
    }

    pub fn in_bounds(&self) -> bool {
        self.file < 8 && self.rank < 8
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.file) as char, self.rank + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseSquareError;

impl fmt::Display for ParseSquareError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "not a board square")
    }
}

impl Error for ParseSquareError {}

impl FromStr for Square {
    type Err = ParseSquareError;

    fn from_str(s: &str) -> Result<Square, ParseSquareError> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(ParseSquareError);
        }
        let file = bytes[0].wrapping_sub(b'a');
        let rank = bytes[1].wrapping_sub(b'1');
        if file < 8 && rank < 8 {
            Ok(Square::new(file, rank))
        } else {
            Err(ParseSquareError)
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceColour {
    White,
    Black,
}

impl PieceColour {
    pub fn opposite(&self) -> PieceColour {
        match *self {
            PieceColour::White => PieceColour::Black,
            PieceColour::Black => PieceColour::White,
        }
    }

    /// The rank a pawn of this colour promotes on.
    pub fn last_rank(&self) -> u8 {
        match *self {
            PieceColour::White => 7,
            PieceColour::Black => 0,
        }
    }
}

impl fmt::Display for PieceColour {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PieceColour::White => write!(f, "White"),
            PieceColour::Black => write!(f, "Black"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub kind: PieceKind,
    pub colour: PieceColour,
}

/// The four kinds a pawn may promote to. Keeping this separate from
/// `PieceKind` means an out-of-range promotion choice cannot be built at
/// all.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Promotion {
    Queen,
    Rook,
    Bishop,
    Knight,
}

impl Promotion {
    pub const CHOICES: [Promotion; 4] = [
        Promotion::Queen,
        Promotion::Rook,
        Promotion::Bishop,
        Promotion::Knight,
    ];

    pub fn kind(&self) -> PieceKind {
        match *self {
            Promotion::Queen => PieceKind::Queen,
            Promotion::Rook => PieceKind::Rook,
            Promotion::Bishop => PieceKind::Bishop,
            Promotion::Knight => PieceKind::Knight,
        }
    }

    pub fn letter(&self) -> char {
        match *self {
            Promotion::Queen => 'Q',
            Promotion::Rook => 'R',
            Promotion::Bishop => 'B',
            Promotion::Knight => 'N',
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Promotion>,
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        match self.promotion {
            Some(promotion) => write!(f, "={}", promotion.letter()),
            None => Ok(()),
        }
    }
}

/// Why a submitted move was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllegalMove {
    OutOfBounds,
    NoPiece,
    WrongTurn,
    NotAllowed,
    IntoCheck,
    NeedsPromotion,
}

impl fmt::Display for IllegalMove {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            IllegalMove::OutOfBounds => write!(f, "coordinates are off the board"),
            IllegalMove::NoPiece => write!(f, "no piece on the origin square"),
            IllegalMove::WrongTurn => write!(f, "it is not that player's turn"),
            IllegalMove::NotAllowed => write!(f, "the piece cannot move like that"),
            IllegalMove::IntoCheck => write!(f, "the king would be left in check"),
            IllegalMove::NeedsPromotion => write!(f, "the move requires a promotion choice"),
        }
    }
}

impl Error for IllegalMove {}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WinReason {
    Checkmate,
    TimeForfeit,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawReason {
    Stalemate,
    InsufficientMaterial,
    SeventyFiveMoves,
    FivefoldRepetition,
    Unspecified,
}

impl fmt::Display for DrawReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DrawReason::Stalemate => write!(f, "Stalemate!"),
            DrawReason::InsufficientMaterial => write!(f, "Draw by insufficient material!"),
            DrawReason::SeventyFiveMoves => write!(f, "Draw by 75-move rule!"),
            DrawReason::FivefoldRepetition => write!(f, "Draw by fivefold repetition!"),
            DrawReason::Unspecified => write!(f, "Draw!"),
        }
    }
}

/// Outcome of a session. Starts `InProgress` and moves exactly once to one
/// of the terminal variants.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    InProgress,
    Decisive {
        winner: PieceColour,
        reason: WinReason,
    },
    Drawn(DrawReason),
}

impl GameResult {
    pub fn in_progress(&self) -> bool {
        match *self {
            GameResult::InProgress => true,
            _ => false,
        }
    }
}

/// The rules engine capability the session depends on. The session never
/// works out chess legality itself; it asks an implementation of this trait
/// and trusts the answers.
///
/// A position value is immutable once built: `apply` hands back a successor
/// with the side to move flipped, or an `IllegalMove` explaining the
/// refusal, leaving the receiver untouched either way.
pub trait Rules: Sized {
    /// The standard starting arrangement, White to move.
    fn start() -> Self;

    fn side_to_move(&self) -> PieceColour;

    fn piece_at(&self, square: Square) -> Option<Piece>;

    /// Every legal move whose origin is `from`. Empty unless `from` holds a
    /// piece of the side to move. Pawn moves onto the last rank appear once
    /// per promotion choice.
    fn legal_moves_from(&self, from: Square) -> Vec<Move>;

    fn apply(&self, mv: Move) -> Result<Self, IllegalMove>;

    fn is_checkmate(&self) -> bool;

    fn is_stalemate(&self) -> bool;

    fn is_insufficient_material(&self) -> bool;

    /// 150 half-moves without a pawn move or capture (the 75-move rule).
    fn is_move_count_draw(&self) -> bool;

    /// The current position has occurred at least `n` times.
    fn is_nfold_repetition(&self, n: u32) -> bool;

    /// Any terminal condition at all, including any the engine recognises
    /// beyond the named predicates.
    fn is_game_over(&self) -> bool;
}
