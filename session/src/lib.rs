extern crate common;

#[macro_use]
extern crate log;

#[macro_use]
extern crate serde_derive;

use std::collections::VecDeque;
use std::mem;
use std::time::{Duration, Instant};

use common::{DrawReason, GameResult, Move, PieceColour, Promotion, Rules, Square, WinReason};

/// Session bootstrap settings, consumed once at construction.
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub use_timer: bool,
    pub timer_seconds: Option<u32>,
}

const DEFAULT_TIMER_SECONDS: u32 = 300;

/// What the current click gesture has established so far.
///
/// `Selected` only ever holds a square that carried a piece of the side to
/// move, with at least one legal move, at the moment it was clicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Empty,
    Selected { from: Square, moves: Vec<Move> },
}

/// A pawn move waiting on a piece-kind choice. While one of these is
/// pending, ordinary clicks are ignored; only a `Promote` event resolves
/// it. There is no cancel path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromotionRequest {
    pub from: Square,
    pub to: Square,
    pub colour: PieceColour,
}

#[derive(Debug)]
struct Clock {
    white: Duration,
    black: Duration,
    last_tick: Instant,
}

/// Input as the display surface reports it. Translating pixels or key
/// codes into these is the surface's job, not the session's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Click(Square),
    Promote(Promotion),
    Quit,
}

/// Read-only view of the session for rendering.
pub struct Snapshot<'a, R: 'a> {
    pub position: &'a R,
    pub selected: Option<Square>,
    pub destinations: Vec<Square>,
    pub clocks: Option<(Duration, Duration)>,
    pub promotion: Option<PromotionRequest>,
    pub result: GameResult,
}

/// The session controller. Owns the position handle, the selection state
/// machine, the promotion sub-flow, the clocks and the result, and is the
/// only thing that ever writes to any of them.
///
/// Events are queued by `submit` and drained by `tick`, so everything
/// happens on the caller's cadence and nothing here blocks.
pub struct Session<R> {
    position: R,
    selection: Selection,
    promotion: Option<PromotionRequest>,
    clock: Option<Clock>,
    result: GameResult,
    quit: bool,
    pending: VecDeque<Event>,
}

impl<R: Rules> Session<R> {
    pub fn new(config: &Config, now: Instant) -> Session<R> {
        Session::with_position(R::start(), config, now)
    }

    /// A session over an arbitrary starting position.
    pub fn with_position(position: R, config: &Config, now: Instant) -> Session<R> {
        let clock = if config.use_timer {
            let seconds = config.timer_seconds.unwrap_or(DEFAULT_TIMER_SECONDS);
            let budget = Duration::from_secs(seconds as u64);
            Some(Clock {
                white: budget,
                black: budget,
                last_tick: now,
            })
        } else {
            None
        };
        Session {
            position: position,
            selection: Selection::Empty,
            promotion: None,
            clock: clock,
            result: GameResult::InProgress,
            quit: false,
            pending: VecDeque::new(),
        }
    }

    pub fn submit(&mut self, event: Event) {
        self.pending.push_back(event);
    }

    /// One cooperative tick: quit check first, then the clock, then the
    /// queued input. Gameplay handlers are each guarded, so a terminal
    /// result shuts everything but quit out.
    pub fn tick(&mut self, now: Instant) {
        if self.quit {
            return;
        }
        if self.pending.iter().any(|event| *event == Event::Quit) {
            self.pending.clear();
            self.quit = true;
            return;
        }
        self.advance_clock(now);
        while let Some(event) = self.pending.pop_front() {
            match event {
                Event::Click(square) => self.handle_click(square),
                Event::Promote(choice) => self.handle_promotion(choice),
                Event::Quit => {
                    self.pending.clear();
                    self.quit = true;
                    return;
                }
            }
        }
        // end-of-tick sweep, so an ending is noticed even on a tick that
        // applied no move
        self.detect_termination();
    }

    pub fn snapshot(&self) -> Snapshot<R> {
        let (selected, destinations) = match self.selection {
            Selection::Empty => (None, Vec::new()),
            Selection::Selected { from, ref moves } => {
                let mut destinations = Vec::new();
                for mv in moves {
                    if !destinations.contains(&mv.to) {
                        destinations.push(mv.to);
                    }
                }
                (Some(from), destinations)
            }
        };
        Snapshot {
            position: &self.position,
            selected: selected,
            destinations: destinations,
            clocks: self.clock.as_ref().map(|clock| (clock.white, clock.black)),
            promotion: self.promotion,
            result: self.result,
        }
    }

    pub fn result(&self) -> GameResult {
        self.result
    }

    pub fn position(&self) -> &R {
        &self.position
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    pub fn finished(&self) -> bool {
        self.quit || !self.result.in_progress()
    }

    /// Charge elapsed wall time to the side to move, and end the game the
    /// moment a budget runs dry. While a promotion choice is pending the
    /// clocks are paused: time still passes, but nobody is charged for it.
    fn advance_clock(&mut self, now: Instant) {
        if !self.result.in_progress() {
            return;
        }
        let side = self.position.side_to_move();
        let paused = self.promotion.is_some();
        let mut forfeit = false;
        if let Some(ref mut clock) = self.clock {
            let elapsed = now.duration_since(clock.last_tick);
            clock.last_tick = now;
            if paused {
                return;
            }
            let remaining = match side {
                PieceColour::White => &mut clock.white,
                PieceColour::Black => &mut clock.black,
            };
            if elapsed >= *remaining {
                *remaining = Duration::from_secs(0);
                forfeit = true;
            } else {
                *remaining -= elapsed;
            }
        }
        if forfeit {
            info!("{} ran out of time", side);
            self.result = GameResult::Decisive {
                winner: side.opposite(),
                reason: WinReason::TimeForfeit,
            };
        }
    }

    fn handle_click(&mut self, clicked: Square) {
        if !self.result.in_progress() || self.promotion.is_some() {
            return;
        }
        match mem::replace(&mut self.selection, Selection::Empty) {
            Selection::Empty => self.select(clicked),
            Selection::Selected { from, moves } => {
                if clicked == from {
                    // clicking the selection again is a deselect toggle
                    debug!("deselected {}", from);
                } else if moves.iter().any(|mv| mv.to == clicked) {
                    let promoting = moves
                        .iter()
                        .any(|mv| mv.to == clicked && mv.promotion.is_some());
                    if promoting {
                        let colour = self.position.side_to_move();
                        info!("{} promotion pending on {}", colour, clicked);
                        self.promotion = Some(PromotionRequest {
                            from: from,
                            to: clicked,
                            colour: colour,
                        });
                    } else {
                        self.play(Move {
                            from: from,
                            to: clicked,
                            promotion: None,
                        });
                    }
                } else {
                    // clicking another own piece reselects; anything else
                    // just clears the selection
                    self.select(clicked);
                }
            }
        }
    }

    fn select(&mut self, clicked: Square) {
        let piece = match self.position.piece_at(clicked) {
            Some(piece) => piece,
            None => return,
        };
        if piece.colour != self.position.side_to_move() {
            return;
        }
        let moves = self.position.legal_moves_from(clicked);
        if moves.is_empty() {
            return;
        }
        debug!("selected {} with {} moves", clicked, moves.len());
        self.selection = Selection::Selected {
            from: clicked,
            moves: moves,
        };
    }

    fn handle_promotion(&mut self, choice: Promotion) {
        if !self.result.in_progress() {
            return;
        }
        match self.promotion.take() {
            Some(request) => self.play(Move {
                from: request.from,
                to: request.to,
                promotion: Some(choice),
            }),
            None => warn!("promotion choice {:?} arrived with none pending", choice),
        }
    }

    fn play(&mut self, mv: Move) {
        match self.position.apply(mv) {
            Ok(next) => {
                self.position = next;
                self.detect_termination();
            }
            // a refused move is dropped on the floor, like any stray click
            Err(reason) => info!("discarding {}: {}", mv, reason),
        }
    }

    /// Ask the rules engine whether the game just ended, most decisive
    /// condition first. The first terminal result written here is final.
    fn detect_termination(&mut self) {
        if !self.result.in_progress() {
            return;
        }
        let loser = self.position.side_to_move();
        self.result = if self.position.is_checkmate() {
            GameResult::Decisive {
                winner: loser.opposite(),
                reason: WinReason::Checkmate,
            }
        } else if self.position.is_stalemate() {
            GameResult::Drawn(DrawReason::Stalemate)
        } else if self.position.is_insufficient_material() {
            GameResult::Drawn(DrawReason::InsufficientMaterial)
        } else if self.position.is_move_count_draw() {
            GameResult::Drawn(DrawReason::SeventyFiveMoves)
        } else if self.position.is_nfold_repetition(5) {
            GameResult::Drawn(DrawReason::FivefoldRepetition)
        } else if self.position.is_game_over() {
            // the engine sees an ending we have no name for
            GameResult::Drawn(DrawReason::Unspecified)
        } else {
            GameResult::InProgress
        };
        if !self.result.in_progress() {
            info!("game over: {:?}", self.result);
        }
    }
}
