extern crate common;
extern crate itertools;

#[macro_use]
extern crate log;

use common::{IllegalMove, Move, Piece, PieceColour, PieceKind, Promotion, Rules, Square};

use itertools::Itertools;

/// Mailbox board, indexed `[rank][file]` with rank 0 = White's home rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Board([[Option<Piece>; 8]; 8]);

impl Board {
    fn at(&self, square: Square) -> Option<Piece> {
        self.0[square.rank as usize][square.file as usize]
    }

    fn set(&mut self, square: Square, piece: Option<Piece>) {
        self.0[square.rank as usize][square.file as usize] = piece;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Castling {
    white_kingside: bool,
    white_queenside: bool,
    black_kingside: bool,
    black_queenside: bool,
}

impl Castling {
    /// Rights as the board itself supports them: granted only where the
    /// king and rook are still on their home squares.
    fn derive(board: &Board) -> Castling {
        let on = |file, rank, kind, colour| {
            board.at(Square::new(file, rank))
                == Some(Piece {
                    kind: kind,
                    colour: colour,
                })
        };
        let white_king = on(4, 0, PieceKind::King, PieceColour::White);
        let black_king = on(4, 7, PieceKind::King, PieceColour::Black);
        Castling {
            white_kingside: white_king && on(7, 0, PieceKind::Rook, PieceColour::White),
            white_queenside: white_king && on(0, 0, PieceKind::Rook, PieceColour::White),
            black_kingside: black_king && on(7, 7, PieceKind::Rook, PieceColour::Black),
            black_queenside: black_king && on(0, 7, PieceKind::Rook, PieceColour::Black),
        }
    }

    fn allows(&self, colour: PieceColour, kingside: bool) -> bool {
        match (colour, kingside) {
            (PieceColour::White, true) => self.white_kingside,
            (PieceColour::White, false) => self.white_queenside,
            (PieceColour::Black, true) => self.black_kingside,
            (PieceColour::Black, false) => self.black_queenside,
        }
    }

    /// A move touching a king or rook home square kills the right for good,
    /// whether the piece moved away or was captured there.
    fn revoke(&mut self, square: Square) {
        match (square.file, square.rank) {
            (4, 0) => {
                self.white_kingside = false;
                self.white_queenside = false;
            }
            (0, 0) => self.white_queenside = false,
            (7, 0) => self.white_kingside = false,
            (4, 7) => {
                self.black_kingside = false;
                self.black_queenside = false;
            }
            (0, 7) => self.black_queenside = false,
            (7, 7) => self.black_kingside = false,
            _ => (),
        }
    }
}

/// Everything that must match for two positions to count as a repetition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Key {
    board: Board,
    turn: PieceColour,
    castling: Castling,
    en_passant: Option<Square>,
}

const BACK_RANK: [PieceKind; 8] = [
    PieceKind::Rook,
    PieceKind::Knight,
    PieceKind::Bishop,
    PieceKind::Queen,
    PieceKind::King,
    PieceKind::Bishop,
    PieceKind::Knight,
    PieceKind::Rook,
];

fn forward(colour: PieceColour) -> i8 {
    match colour {
        PieceColour::White => 1,
        PieceColour::Black => -1,
    }
}

/// True if any piece sits strictly between `start` and `stop` along a
/// rank, file or diagonal.
fn piece_between(board: &Board, start: Square, stop: Square) -> bool {
    let step_file = (stop.file as i8 - start.file as i8).signum();
    let step_rank = (stop.rank as i8 - start.rank as i8).signum();
    let mut file = start.file as i8 + step_file;
    let mut rank = start.rank as i8 + step_rank;
    while (file, rank) != (stop.file as i8, stop.rank as i8) {
        if board.at(Square::new(file as u8, rank as u8)).is_some() {
            return true;
        }
        file += step_file;
        rank += step_rank;
    }
    false
}

/// True if the piece on `from` attacks `target`. Capture patterns only, so
/// pawn pushes and castling do not count.
fn attacks(board: &Board, from: Square, target: Square) -> bool {
    let piece = match board.at(from) {
        Some(piece) => piece,
        None => return false,
    };
    let df = target.file as i8 - from.file as i8;
    let dr = target.rank as i8 - from.rank as i8;
    if df == 0 && dr == 0 {
        return false;
    }
    match piece.kind {
        PieceKind::King => df.abs() <= 1 && dr.abs() <= 1,
        PieceKind::Knight => {
            (df.abs() == 2 && dr.abs() == 1) || (df.abs() == 1 && dr.abs() == 2)
        }
        PieceKind::Queen => {
            (df == 0 || dr == 0 || df.abs() == dr.abs()) && !piece_between(board, from, target)
        }
        PieceKind::Rook => (df == 0 || dr == 0) && !piece_between(board, from, target),
        PieceKind::Bishop => df.abs() == dr.abs() && !piece_between(board, from, target),
        PieceKind::Pawn => df.abs() == 1 && dr == forward(piece.colour),
    }
}

fn square_attacked(board: &Board, target: Square, by: PieceColour) -> bool {
    (0..8).cartesian_product(0..8).any(|(file, rank)| {
        let from = Square::new(file, rank);
        match board.at(from) {
            Some(piece) => piece.colour == by && attacks(board, from, target),
            None => false,
        }
    })
}

fn king_square(board: &Board, colour: PieceColour) -> Option<Square> {
    (0..8)
        .cartesian_product(0..8)
        .map(|(file, rank)| Square::new(file, rank))
        .find(|&square| {
            board.at(square)
                == Some(Piece {
                    kind: PieceKind::King,
                    colour: colour,
                })
        })
}

/// Candidate validation for a single from/to pair: movement pattern,
/// blocking, capture direction, castling and en passant. Whether the
/// mover's king ends up attacked is checked separately.
fn move_allowed(game: &Game, from: Square, to: Square) -> bool {
    let board = &game.board;
    let piece = match board.at(from) {
        Some(piece) => piece,
        None => return false,
    };
    if piece.colour != game.turn {
        return false;
    }
    if from == to {
        return false;
    }
    if let Some(occupant) = board.at(to) {
        if occupant.colour == piece.colour {
            debug!("cannot capture own piece on {}", to);
            return false;
        }
    }

    let df = to.file as i8 - from.file as i8;
    let dr = to.rank as i8 - from.rank as i8;

    match piece.kind {
        PieceKind::King => {
            if df.abs() <= 1 && dr.abs() <= 1 {
                true
            } else if dr == 0 && df.abs() == 2 {
                castle_allowed(game, from, to)
            } else {
                debug!("king cannot reach {} from {}", to, from);
                false
            }
        }
        PieceKind::Queen => {
            if df == 0 || dr == 0 || df.abs() == dr.abs() {
                !piece_between(board, from, to)
            } else {
                debug!("queen must move along a rank, file or diagonal");
                false
            }
        }
        PieceKind::Rook => {
            if df == 0 || dr == 0 {
                !piece_between(board, from, to)
            } else {
                debug!("rook must move along a rank or file");
                false
            }
        }
        PieceKind::Bishop => {
            if df.abs() == dr.abs() {
                !piece_between(board, from, to)
            } else {
                debug!("bishop must move along a diagonal");
                false
            }
        }
        // knights jump, so no blocking to worry about
        PieceKind::Knight => (df.abs() == 2 && dr.abs() == 1) || (df.abs() == 1 && dr.abs() == 2),
        PieceKind::Pawn => pawn_allowed(game, piece.colour, from, to),
    }
}

fn pawn_allowed(game: &Game, colour: PieceColour, from: Square, to: Square) -> bool {
    let board = &game.board;
    let df = to.file as i8 - from.file as i8;
    let dr = to.rank as i8 - from.rank as i8;
    let start_rank = match colour {
        PieceColour::White => 1,
        PieceColour::Black => 6,
    };

    if df == 0 {
        if board.at(to).is_some() {
            debug!("pawn push onto an occupied square");
            return false;
        }
        if dr == forward(colour) {
            return true;
        }
        if dr == 2 * forward(colour) && from.rank == start_rank {
            return !piece_between(board, from, to);
        }
        debug!("pawns cannot move like that");
        false
    } else if df.abs() == 1 && dr == forward(colour) {
        // own-piece captures were already ruled out above
        if board.at(to).is_some() || game.en_passant == Some(to) {
            true
        } else {
            debug!("pawn may only step diagonally to capture");
            false
        }
    } else {
        debug!("pawns cannot move like that");
        false
    }
}

fn castle_allowed(game: &Game, from: Square, to: Square) -> bool {
    let colour = game.turn;
    let home = match colour {
        PieceColour::White => 0,
        PieceColour::Black => 7,
    };
    if from != Square::new(4, home) || to.rank != home {
        return false;
    }
    let (kingside, rook_file) = match to.file {
        6 => (true, 7),
        2 => (false, 0),
        _ => return false,
    };
    if !game.castling.allows(colour, kingside) {
        debug!("{} may no longer castle on that side", colour);
        return false;
    }
    let rook_home = Square::new(rook_file, home);
    if game.board.at(rook_home)
        != Some(Piece {
            kind: PieceKind::Rook,
            colour: colour,
        }) {
        return false;
    }
    if piece_between(&game.board, from, rook_home) {
        debug!("castling path is blocked");
        return false;
    }
    // the king may not castle out of, through, or into check
    let step = if kingside { 1 } else { -1 };
    for offset in 0..3i8 {
        let crossed = Square::new((from.file as i8 + step * offset) as u8, home);
        if square_attacked(&game.board, crossed, colour.opposite()) {
            debug!("castling through an attacked square");
            return false;
        }
    }
    true
}

/// A chess position plus the bookkeeping the draw rules need. This is the
/// authoritative game state: `apply` builds a successor and never mutates
/// the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    board: Board,
    turn: PieceColour,
    castling: Castling,
    en_passant: Option<Square>,
    halfmove_clock: u32,
    seen: Vec<Key>,
}

impl Game {
    pub fn new() -> Game {
        let mut board = Board([[None; 8]; 8]);
        for file in 0..8 {
            let kind = BACK_RANK[file as usize];
            board.set(
                Square::new(file, 0),
                Some(Piece {
                    kind: kind,
                    colour: PieceColour::White,
                }),
            );
            board.set(
                Square::new(file, 1),
                Some(Piece {
                    kind: PieceKind::Pawn,
                    colour: PieceColour::White,
                }),
            );
            board.set(
                Square::new(file, 6),
                Some(Piece {
                    kind: PieceKind::Pawn,
                    colour: PieceColour::Black,
                }),
            );
            board.set(
                Square::new(file, 7),
                Some(Piece {
                    kind: kind,
                    colour: PieceColour::Black,
                }),
            );
        }
        Game::from_parts(board, PieceColour::White)
    }

    /// An arbitrary arrangement, mainly for setting up positions in tests
    /// and scenarios. Castling rights are granted only where the king and
    /// rook still stand on their home squares.
    pub fn with_pieces(pieces: &[(Square, Piece)], turn: PieceColour) -> Game {
        let mut board = Board([[None; 8]; 8]);
        for &(square, piece) in pieces {
            board.set(square, Some(piece));
        }
        Game::from_parts(board, turn)
    }

    fn from_parts(board: Board, turn: PieceColour) -> Game {
        let castling = Castling::derive(&board);
        let mut game = Game {
            board: board,
            turn: turn,
            castling: castling,
            en_passant: None,
            halfmove_clock: 0,
            seen: Vec::new(),
        };
        let key = game.key();
        game.seen.push(key);
        game
    }

    fn key(&self) -> Key {
        Key {
            board: self.board,
            turn: self.turn,
            castling: self.castling,
            en_passant: self.en_passant,
        }
    }

    fn in_check(&self, colour: PieceColour) -> bool {
        match king_square(&self.board, colour) {
            Some(king) => square_attacked(&self.board, king, colour.opposite()),
            None => false,
        }
    }

    /// Build the successor position. The move must already have passed
    /// `move_allowed`.
    fn execute(&self, mv: Move) -> Game {
        let mut next = self.clone();
        let piece = next.board.at(mv.from).expect("no piece on the origin square");
        let en_passant_capture = piece.kind == PieceKind::Pawn && self.en_passant == Some(mv.to);
        let capture = next.board.at(mv.to).is_some() || en_passant_capture;

        if en_passant_capture {
            // the captured pawn sits beside the destination, not on it
            next.board.set(Square::new(mv.to.file, mv.from.rank), None);
        }
        if piece.kind == PieceKind::King && (mv.to.file as i8 - mv.from.file as i8).abs() == 2 {
            // castling carries the rook over the king
            let (rook_from, rook_to) = if mv.to.file == 6 {
                (Square::new(7, mv.from.rank), Square::new(5, mv.from.rank))
            } else {
                (Square::new(0, mv.from.rank), Square::new(3, mv.from.rank))
            };
            let rook = next.board.at(rook_from);
            next.board.set(rook_from, None);
            next.board.set(rook_to, rook);
        }

        next.board.set(mv.from, None);
        let placed = match mv.promotion {
            Some(promotion) => Piece {
                kind: promotion.kind(),
                colour: piece.colour,
            },
            None => piece,
        };
        next.board.set(mv.to, Some(placed));

        next.castling.revoke(mv.from);
        next.castling.revoke(mv.to);
        next.en_passant = if piece.kind == PieceKind::Pawn
            && (mv.to.rank as i8 - mv.from.rank as i8).abs() == 2
        {
            Some(Square::new(mv.from.file, (mv.from.rank + mv.to.rank) / 2))
        } else {
            None
        };

        if piece.kind == PieceKind::Pawn || capture {
            // irreversible: no earlier position can ever recur
            next.halfmove_clock = 0;
            next.seen.clear();
        } else {
            next.halfmove_clock += 1;
        }

        next.turn = self.turn.opposite();
        let key = next.key();
        next.seen.push(key);
        next
    }

    fn candidate_legal(&self, from: Square, to: Square) -> bool {
        if !move_allowed(self, from, to) {
            return false;
        }
        // the promotion kind never affects whether the mover's king is safe
        let probe = Move {
            from: from,
            to: to,
            promotion: None,
        };
        !self.execute(probe).in_check(self.turn)
    }

    fn has_any_legal_move(&self) -> bool {
        (0..8)
            .cartesian_product(0..8)
            .cartesian_product((0..8).cartesian_product(0..8))
            .any(|((from_file, from_rank), (to_file, to_rank))| {
                self.candidate_legal(
                    Square::new(from_file, from_rank),
                    Square::new(to_file, to_rank),
                )
            })
    }

    fn validate(&self, mv: Move) -> Result<Game, IllegalMove> {
        if !mv.from.in_bounds() || !mv.to.in_bounds() {
            return Err(IllegalMove::OutOfBounds);
        }
        let piece = match self.board.at(mv.from) {
            Some(piece) => piece,
            None => return Err(IllegalMove::NoPiece),
        };
        if piece.colour != self.turn {
            return Err(IllegalMove::WrongTurn);
        }
        let promoting = piece.kind == PieceKind::Pawn && mv.to.rank == self.turn.last_rank();
        if promoting && mv.promotion.is_none() {
            return Err(IllegalMove::NeedsPromotion);
        }
        if !promoting && mv.promotion.is_some() {
            return Err(IllegalMove::NotAllowed);
        }
        if !move_allowed(self, mv.from, mv.to) {
            return Err(IllegalMove::NotAllowed);
        }
        let next = self.execute(mv);
        if next.in_check(self.turn) {
            return Err(IllegalMove::IntoCheck);
        }
        Ok(next)
    }
}

impl Rules for Game {
    fn start() -> Game {
        Game::new()
    }

    fn side_to_move(&self) -> PieceColour {
        self.turn
    }

    fn piece_at(&self, square: Square) -> Option<Piece> {
        if square.in_bounds() {
            self.board.at(square)
        } else {
            None
        }
    }

    fn legal_moves_from(&self, from: Square) -> Vec<Move> {
        if !from.in_bounds() {
            return Vec::new();
        }
        let piece = match self.board.at(from) {
            Some(piece) if piece.colour == self.turn => piece,
            _ => return Vec::new(),
        };
        let mut moves = Vec::new();
        for (file, rank) in (0..8).cartesian_product(0..8) {
            let to = Square::new(file, rank);
            if !self.candidate_legal(from, to) {
                continue;
            }
            if piece.kind == PieceKind::Pawn && to.rank == self.turn.last_rank() {
                for &promotion in Promotion::CHOICES.iter() {
                    moves.push(Move {
                        from: from,
                        to: to,
                        promotion: Some(promotion),
                    });
                }
            } else {
                moves.push(Move {
                    from: from,
                    to: to,
                    promotion: None,
                });
            }
        }
        moves
    }

    fn apply(&self, mv: Move) -> Result<Game, IllegalMove> {
        match self.validate(mv) {
            Ok(next) => {
                info!("{} plays {}", self.turn, mv);
                Ok(next)
            }
            Err(reason) => {
                info!("move {} rejected: {}", mv, reason);
                Err(reason)
            }
        }
    }

    fn is_checkmate(&self) -> bool {
        self.in_check(self.turn) && !self.has_any_legal_move()
    }

    fn is_stalemate(&self) -> bool {
        !self.in_check(self.turn) && !self.has_any_legal_move()
    }

    fn is_insufficient_material(&self) -> bool {
        let mut knights = 0;
        let mut bishops = Vec::new();
        for (file, rank) in (0..8).cartesian_product(0..8) {
            let square = Square::new(file, rank);
            match self.board.at(square) {
                None => (),
                Some(Piece {
                    kind: PieceKind::King,
                    ..
                }) => (),
                Some(Piece {
                    kind: PieceKind::Knight,
                    ..
                }) => knights += 1,
                Some(Piece {
                    kind: PieceKind::Bishop,
                    ..
                }) => bishops.push(square),
                // a pawn, rook or queen is always enough to mate with
                Some(_) => return false,
            }
        }
        match (knights, bishops.len()) {
            (0, 0) | (1, 0) | (0, 1) => true,
            (0, 2) => {
                let shade = |square: &Square| (square.file + square.rank) % 2;
                shade(&bishops[0]) == shade(&bishops[1])
            }
            _ => false,
        }
    }

    fn is_move_count_draw(&self) -> bool {
        self.halfmove_clock >= 150
    }

    fn is_nfold_repetition(&self, n: u32) -> bool {
        let key = self.key();
        self.seen.iter().filter(|&&seen| seen == key).count() >= n as usize
    }

    fn is_game_over(&self) -> bool {
        self.is_checkmate()
            || self.is_stalemate()
            || self.is_insufficient_material()
            || self.is_move_count_draw()
            || self.is_nfold_repetition(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(name: &str) -> Square {
        name.parse().unwrap()
    }

    fn pawn(colour: PieceColour) -> Piece {
        Piece {
            kind: PieceKind::Pawn,
            colour: colour,
        }
    }

    #[test]
    fn blocked_rays_are_detected() {
        let game = Game::new();
        assert!(piece_between(&game.board, sq("a1"), sq("a3")));
        assert!(!piece_between(&game.board, sq("a2"), sq("a5")));
        assert!(piece_between(&game.board, sq("c1"), sq("f4")));
    }

    #[test]
    fn pawns_attack_diagonally_only() {
        let game = Game::with_pieces(&[(sq("e4"), pawn(PieceColour::White))], PieceColour::White);
        assert!(attacks(&game.board, sq("e4"), sq("d5")));
        assert!(attacks(&game.board, sq("e4"), sq("f5")));
        assert!(!attacks(&game.board, sq("e4"), sq("e5")));
        assert!(!attacks(&game.board, sq("e4"), sq("d3")));
    }

    #[test]
    fn sliding_attacks_stop_at_blockers() {
        let game = Game::new();
        // the a1 rook sees a2 but nothing past it
        assert!(attacks(&game.board, sq("a1"), sq("a2")));
        assert!(!attacks(&game.board, sq("a1"), sq("a5")));
    }

    #[test]
    fn castling_rights_follow_home_squares() {
        let game = Game::new();
        assert!(game.castling.allows(PieceColour::White, true));
        assert!(game.castling.allows(PieceColour::Black, false));

        let bare = Game::with_pieces(
            &[
                (
                    sq("e1"),
                    Piece {
                        kind: PieceKind::King,
                        colour: PieceColour::White,
                    },
                ),
                (
                    sq("e8"),
                    Piece {
                        kind: PieceKind::King,
                        colour: PieceColour::Black,
                    },
                ),
            ],
            PieceColour::White,
        );
        assert!(!bare.castling.allows(PieceColour::White, true));
        assert!(!bare.castling.allows(PieceColour::Black, false));
    }
}
