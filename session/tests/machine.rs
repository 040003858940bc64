extern crate common;
extern crate session;

use std::time::{Duration, Instant};

use common::PieceColour::{Black, White};
use common::{
    DrawReason, GameResult, IllegalMove, Move, Piece, PieceColour, PieceKind, Promotion, Rules,
    Square, WinReason,
};
use session::{Config, Event, Session};

/// A scripted stand-in for the rules engine: fixed pieces, a fixed legal
/// move list, and a canned successor handed back by any accepted move.
/// Lets the controller's transitions be tested without any chess.
#[derive(Debug, Clone)]
struct Script {
    turn: PieceColour,
    pieces: Vec<(Square, Piece)>,
    moves: Vec<Move>,
    reject_all: bool,
    checkmate: bool,
    stalemate: bool,
    game_over: bool,
    next: Option<Box<Script>>,
}

impl Script {
    fn blank(turn: PieceColour) -> Script {
        Script {
            turn: turn,
            pieces: Vec::new(),
            moves: Vec::new(),
            reject_all: false,
            checkmate: false,
            stalemate: false,
            game_over: false,
            next: None,
        }
    }
}

impl Rules for Script {
    fn start() -> Script {
        Script::blank(White)
    }

    fn side_to_move(&self) -> PieceColour {
        self.turn
    }

    fn piece_at(&self, square: Square) -> Option<Piece> {
        self.pieces
            .iter()
            .find(|&&(at, _)| at == square)
            .map(|&(_, piece)| piece)
    }

    fn legal_moves_from(&self, from: Square) -> Vec<Move> {
        match self.piece_at(from) {
            Some(piece) if piece.colour == self.turn => {
                self.moves.iter().filter(|mv| mv.from == from).cloned().collect()
            }
            _ => Vec::new(),
        }
    }

    fn apply(&self, mv: Move) -> Result<Script, IllegalMove> {
        if !self.reject_all && self.moves.contains(&mv) {
            Ok(match self.next {
                Some(ref next) => (**next).clone(),
                None => Script::blank(self.turn.opposite()),
            })
        } else {
            Err(IllegalMove::NotAllowed)
        }
    }

    fn is_checkmate(&self) -> bool {
        self.checkmate
    }

    fn is_stalemate(&self) -> bool {
        self.stalemate
    }

    fn is_insufficient_material(&self) -> bool {
        false
    }

    fn is_move_count_draw(&self) -> bool {
        false
    }

    fn is_nfold_repetition(&self, _n: u32) -> bool {
        false
    }

    fn is_game_over(&self) -> bool {
        self.checkmate || self.stalemate || self.game_over
    }
}

fn sq(name: &str) -> Square {
    name.parse().unwrap()
}

fn mv(from: &str, to: &str) -> Move {
    Move {
        from: sq(from),
        to: sq(to),
        promotion: None,
    }
}

fn piece(kind: PieceKind, colour: PieceColour) -> Piece {
    Piece {
        kind: kind,
        colour: colour,
    }
}

fn no_timer() -> Config {
    Config {
        use_timer: false,
        timer_seconds: None,
    }
}

fn timed(seconds: u32) -> Config {
    Config {
        use_timer: true,
        timer_seconds: Some(seconds),
    }
}

/// White pawn on e2 with two quiet moves, black pawn on d7.
fn pawn_script() -> Script {
    let mut script = Script::blank(White);
    script.pieces.push((sq("e2"), piece(PieceKind::Pawn, White)));
    script.pieces.push((sq("d7"), piece(PieceKind::Pawn, Black)));
    script.moves.push(mv("e2", "e3"));
    script.moves.push(mv("e2", "e4"));
    script
}

/// White pawn on e7 about to promote on e8.
fn promo_script() -> Script {
    let mut script = Script::blank(White);
    script.pieces.push((sq("e7"), piece(PieceKind::Pawn, White)));
    for &choice in Promotion::CHOICES.iter() {
        script.moves.push(Move {
            from: sq("e7"),
            to: sq("e8"),
            promotion: Some(choice),
        });
    }
    let mut after = Script::blank(Black);
    after.pieces.push((sq("e8"), piece(PieceKind::Rook, White)));
    script.next = Some(Box::new(after));
    script
}

fn click(session: &mut Session<Script>, name: &str, now: Instant) {
    session.submit(Event::Click(sq(name)));
    session.tick(now);
}

#[test]
fn clicking_an_empty_square_does_nothing() {
    let now = Instant::now();
    let mut session = Session::with_position(pawn_script(), &no_timer(), now);
    click(&mut session, "a5", now);
    let snapshot = session.snapshot();
    assert_eq!(None, snapshot.selected);
    assert!(snapshot.destinations.is_empty());
    assert!(snapshot.result.in_progress());
}

#[test]
fn clicking_an_opponent_piece_does_nothing() {
    let now = Instant::now();
    let mut session = Session::with_position(pawn_script(), &no_timer(), now);
    click(&mut session, "d7", now);
    assert_eq!(None, session.snapshot().selected);
}

#[test]
fn selecting_a_piece_shows_its_destinations() {
    let now = Instant::now();
    let mut session = Session::with_position(pawn_script(), &no_timer(), now);
    click(&mut session, "e2", now);
    let snapshot = session.snapshot();
    assert_eq!(Some(sq("e2")), snapshot.selected);
    assert!(snapshot.destinations.contains(&sq("e3")));
    assert!(snapshot.destinations.contains(&sq("e4")));
}

#[test]
fn clicking_the_selection_again_deselects() {
    let now = Instant::now();
    let mut session = Session::with_position(pawn_script(), &no_timer(), now);
    click(&mut session, "e2", now);
    click(&mut session, "e2", now);
    let snapshot = session.snapshot();
    assert_eq!(None, snapshot.selected);
    // nothing was applied: the pawn is where it started
    assert_eq!(
        Some(piece(PieceKind::Pawn, White)),
        snapshot.position.piece_at(sq("e2"))
    );
}

#[test]
fn clicking_another_own_piece_reselects() {
    let now = Instant::now();
    let mut script = pawn_script();
    script.pieces.push((sq("g1"), piece(PieceKind::Knight, White)));
    script.moves.push(mv("g1", "f3"));
    let mut session = Session::with_position(script, &no_timer(), now);
    click(&mut session, "e2", now);
    click(&mut session, "g1", now);
    let snapshot = session.snapshot();
    assert_eq!(Some(sq("g1")), snapshot.selected);
    assert_eq!(vec![sq("f3")], snapshot.destinations);
}

#[test]
fn clicking_a_dead_square_clears_the_selection() {
    let now = Instant::now();
    let mut session = Session::with_position(pawn_script(), &no_timer(), now);
    click(&mut session, "e2", now);
    click(&mut session, "a5", now);
    assert_eq!(None, session.snapshot().selected);
    assert_eq!(
        Some(piece(PieceKind::Pawn, White)),
        session.position().piece_at(sq("e2"))
    );
}

#[test]
fn a_click_on_a_destination_plays_the_move() {
    let now = Instant::now();
    let mut session = Session::with_position(pawn_script(), &no_timer(), now);
    click(&mut session, "e2", now);
    click(&mut session, "e4", now);
    let snapshot = session.snapshot();
    assert_eq!(None, snapshot.selected);
    // the scripted successor is empty, proving the move went through
    assert_eq!(None, snapshot.position.piece_at(sq("e2")));
    assert_eq!(Black, snapshot.position.side_to_move());
}

#[test]
fn a_refused_move_is_discarded_silently() {
    let now = Instant::now();
    let mut script = pawn_script();
    script.reject_all = true;
    let mut session = Session::with_position(script, &no_timer(), now);
    click(&mut session, "e2", now);
    click(&mut session, "e4", now);
    let snapshot = session.snapshot();
    assert_eq!(None, snapshot.selected);
    assert!(snapshot.result.in_progress());
    assert_eq!(
        Some(piece(PieceKind::Pawn, White)),
        snapshot.position.piece_at(sq("e2"))
    );
}

#[test]
fn promotion_waits_for_a_choice() {
    let now = Instant::now();
    let mut session = Session::with_position(promo_script(), &no_timer(), now);
    click(&mut session, "e7", now);
    click(&mut session, "e8", now);

    let snapshot = session.snapshot();
    let request = snapshot.promotion.expect("promotion should be pending");
    assert_eq!(sq("e7"), request.from);
    assert_eq!(sq("e8"), request.to);
    assert_eq!(White, request.colour);
    // the pawn has not moved yet
    assert_eq!(
        Some(piece(PieceKind::Pawn, White)),
        snapshot.position.piece_at(sq("e7"))
    );

    // gameplay clicks are shut out until the choice lands
    click(&mut session, "e7", now);
    assert!(session.snapshot().promotion.is_some());
    assert_eq!(None, session.snapshot().selected);

    session.submit(Event::Promote(Promotion::Rook));
    session.tick(now);
    let snapshot = session.snapshot();
    assert_eq!(None, snapshot.promotion);
    assert_eq!(
        Some(piece(PieceKind::Rook, White)),
        snapshot.position.piece_at(sq("e8"))
    );
    assert_eq!(Black, snapshot.position.side_to_move());
}

#[test]
fn a_stray_promotion_choice_is_ignored() {
    let now = Instant::now();
    let mut session = Session::with_position(pawn_script(), &no_timer(), now);
    session.submit(Event::Promote(Promotion::Queen));
    session.tick(now);
    let snapshot = session.snapshot();
    assert!(snapshot.result.in_progress());
    assert_eq!(
        Some(piece(PieceKind::Pawn, White)),
        snapshot.position.piece_at(sq("e2"))
    );
}

#[test]
fn only_the_side_to_move_is_charged() {
    let start = Instant::now();
    let mut session = Session::with_position(pawn_script(), &timed(10), start);
    session.tick(start + Duration::from_secs(3));
    assert_eq!(
        Some((Duration::from_secs(7), Duration::from_secs(10))),
        session.snapshot().clocks
    );
    session.tick(start + Duration::from_secs(5));
    assert_eq!(
        Some((Duration::from_secs(5), Duration::from_secs(10))),
        session.snapshot().clocks
    );
}

#[test]
fn running_dry_forfeits_the_game() {
    let start = Instant::now();
    let mut session = Session::with_position(pawn_script(), &timed(1), start);
    session.tick(start + Duration::from_millis(1500));
    assert_eq!(
        GameResult::Decisive {
            winner: Black,
            reason: WinReason::TimeForfeit,
        },
        session.result()
    );
    // both clocks freeze once the game is over
    session.tick(start + Duration::from_secs(60));
    assert_eq!(
        Some((Duration::from_secs(0), Duration::from_secs(1))),
        session.snapshot().clocks
    );
}

#[test]
fn the_timer_defaults_to_five_minutes() {
    let now = Instant::now();
    let config = Config {
        use_timer: true,
        timer_seconds: None,
    };
    let session = Session::with_position(pawn_script(), &config, now);
    assert_eq!(
        Some((Duration::from_secs(300), Duration::from_secs(300))),
        session.snapshot().clocks
    );
}

#[test]
fn no_timer_means_no_clocks() {
    let now = Instant::now();
    let session = Session::with_position(pawn_script(), &no_timer(), now);
    assert_eq!(None, session.snapshot().clocks);
}

#[test]
fn the_clock_pauses_while_a_promotion_is_pending() {
    let start = Instant::now();
    let mut session = Session::with_position(promo_script(), &timed(10), start);

    click(&mut session, "e7", start + Duration::from_secs(1));
    click(&mut session, "e8", start + Duration::from_secs(2));
    assert!(session.snapshot().promotion.is_some());
    assert_eq!(
        Some((Duration::from_secs(8), Duration::from_secs(10))),
        session.snapshot().clocks
    );

    // half a minute of dithering over the choice costs nothing
    session.tick(start + Duration::from_secs(32));
    assert!(session.result().in_progress());
    assert_eq!(
        Some((Duration::from_secs(8), Duration::from_secs(10))),
        session.snapshot().clocks
    );

    session.submit(Event::Promote(Promotion::Queen));
    session.tick(start + Duration::from_secs(33));
    assert_eq!(
        Some((Duration::from_secs(8), Duration::from_secs(10))),
        session.snapshot().clocks
    );

    // afterwards the opponent is on the clock again
    session.tick(start + Duration::from_secs(34));
    assert_eq!(
        Some((Duration::from_secs(8), Duration::from_secs(9))),
        session.snapshot().clocks
    );
}

#[test]
fn checkmate_is_reported_for_the_mover() {
    let now = Instant::now();
    let mut script = pawn_script();
    let mut after = Script::blank(Black);
    after.checkmate = true;
    script.next = Some(Box::new(after));
    let mut session = Session::with_position(script, &no_timer(), now);
    click(&mut session, "e2", now);
    click(&mut session, "e4", now);
    assert_eq!(
        GameResult::Decisive {
            winner: White,
            reason: WinReason::Checkmate,
        },
        session.result()
    );
}

#[test]
fn checkmate_outranks_other_terminal_conditions() {
    let now = Instant::now();
    let mut script = pawn_script();
    let mut after = Script::blank(Black);
    after.checkmate = true;
    after.stalemate = true;
    script.next = Some(Box::new(after));
    let mut session = Session::with_position(script, &no_timer(), now);
    click(&mut session, "e2", now);
    click(&mut session, "e4", now);
    assert_eq!(
        GameResult::Decisive {
            winner: White,
            reason: WinReason::Checkmate,
        },
        session.result()
    );
}

#[test]
fn stalemate_draws_the_game() {
    let now = Instant::now();
    let mut script = pawn_script();
    let mut after = Script::blank(Black);
    after.stalemate = true;
    script.next = Some(Box::new(after));
    let mut session = Session::with_position(script, &no_timer(), now);
    click(&mut session, "e2", now);
    click(&mut session, "e4", now);
    assert_eq!(GameResult::Drawn(DrawReason::Stalemate), session.result());
}

#[test]
fn an_unrecognised_ending_falls_back_to_a_plain_draw() {
    let now = Instant::now();
    let mut script = pawn_script();
    let mut after = Script::blank(Black);
    after.game_over = true;
    script.next = Some(Box::new(after));
    let mut session = Session::with_position(script, &no_timer(), now);
    click(&mut session, "e2", now);
    click(&mut session, "e4", now);
    assert_eq!(GameResult::Drawn(DrawReason::Unspecified), session.result());
}

#[test]
fn the_result_is_written_exactly_once() {
    let start = Instant::now();
    let mut session = Session::with_position(pawn_script(), &timed(1), start);
    session.tick(start + Duration::from_secs(2));
    let verdict = session.result();
    assert!(!verdict.in_progress());

    // no amount of further input or time shifts a terminal result
    click(&mut session, "e2", start + Duration::from_secs(90));
    click(&mut session, "e4", start + Duration::from_secs(91));
    session.tick(start + Duration::from_secs(600));
    assert_eq!(verdict, session.result());
    assert_eq!(
        Some(piece(PieceKind::Pawn, White)),
        session.position().piece_at(sq("e2"))
    );
    assert_eq!(None, session.snapshot().selected);
}

#[test]
fn an_already_finished_position_is_noticed_on_the_first_tick() {
    let now = Instant::now();
    let mut script = Script::blank(White);
    script.checkmate = true;
    let mut session = Session::with_position(script, &no_timer(), now);
    assert!(session.result().in_progress());
    session.tick(now);
    assert_eq!(
        GameResult::Decisive {
            winner: Black,
            reason: WinReason::Checkmate,
        },
        session.result()
    );
}

#[test]
fn quit_trumps_everything_queued_with_it() {
    let now = Instant::now();
    let mut session = Session::with_position(pawn_script(), &no_timer(), now);
    session.submit(Event::Click(sq("e2")));
    session.submit(Event::Quit);
    session.tick(now);
    assert!(session.quit_requested());
    assert!(session.finished());
    // the click queued ahead of the quit was never processed
    assert_eq!(None, session.snapshot().selected);
    assert_eq!(
        Some(piece(PieceKind::Pawn, White)),
        session.position().piece_at(sq("e2"))
    );
}
