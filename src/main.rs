extern crate common;
extern crate engine;
extern crate session;
extern crate toml;

#[macro_use]
extern crate log;
extern crate env_logger;

use std::env;
use std::fs::File;
use std::io::prelude::*;
use std::io::{self, BufRead};
use std::path::Path;
use std::time::{Duration, Instant};

use common::{GameResult, Piece, PieceColour, PieceKind, Promotion, Rules, Square, WinReason};
use engine::Game;
use session::{Config, Event, Session, Snapshot};

fn read_config<P: AsRef<Path> + Clone>(path: P) -> Config {
    let mut file =
        File::open(&path).expect(&format!("Could not open config file: {:?}", path.as_ref()));
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .expect("Reading config file failed");
    toml::from_str(&contents).expect("Config file incorrectly formatted")
}

fn format_time(time: Duration) -> String {
    let total = time.as_secs();
    format!("{:02}:{:02}", total / 60, total % 60)
}

fn piece_letter(piece: Piece) -> char {
    let letter = match piece.kind {
        PieceKind::Pawn => 'p',
        PieceKind::Knight => 'n',
        PieceKind::Bishop => 'b',
        PieceKind::Rook => 'r',
        PieceKind::Queen => 'q',
        PieceKind::King => 'k',
    };
    match piece.colour {
        PieceColour::White => letter.to_ascii_uppercase(),
        PieceColour::Black => letter,
    }
}

/// White at the bottom, the selection in parentheses and reachable squares
/// in brackets.
fn draw_board(snapshot: &Snapshot<Game>) {
    println!();
    for rank in (0..8).rev() {
        print!("{} ", rank + 1);
        for file in 0..8 {
            let square = Square::new(file, rank);
            let cell = match snapshot.position.piece_at(square) {
                Some(piece) => piece_letter(piece),
                None => '.',
            };
            if snapshot.selected == Some(square) {
                print!("({})", cell);
            } else if snapshot.destinations.contains(&square) {
                print!("[{}]", cell);
            } else {
                print!(" {} ", cell);
            }
        }
        println!();
    }
    println!("   a  b  c  d  e  f  g  h");
    if let Some((white, black)) = snapshot.clocks {
        println!(
            "White: {}   Black: {}",
            format_time(white),
            format_time(black)
        );
    }
}

fn prompt(snapshot: &Snapshot<Game>) {
    match snapshot.promotion {
        Some(request) => println!(
            "{} pawn promotes on {}: [q]ueen, [r]ook, [b]ishop or k[n]ight?",
            request.colour, request.to
        ),
        None => println!(
            "{} to move. Enter a square (e.g. e2), or quit:",
            snapshot.position.side_to_move()
        ),
    }
}

fn parse_input(line: &str, promoting: bool) -> Option<Event> {
    if line == "quit" {
        return Some(Event::Quit);
    }
    if promoting {
        let choice = match line {
            "q" => Promotion::Queen,
            "r" => Promotion::Rook,
            "b" => Promotion::Bishop,
            "n" => Promotion::Knight,
            _ => return None,
        };
        return Some(Event::Promote(choice));
    }
    line.parse::<Square>().ok().map(Event::Click)
}

fn show_banner(result: GameResult) {
    println!();
    match result {
        GameResult::Decisive { winner, reason } => {
            println!("{} wins!", winner);
            match reason {
                WinReason::Checkmate => println!("Checkmate!"),
                WinReason::TimeForfeit => println!("{} ran out of time!", winner.opposite()),
            }
        }
        GameResult::Drawn(reason) => {
            println!("Draw!");
            println!("{}", reason);
        }
        GameResult::InProgress => (),
    }
    println!("Press enter to exit");
    let mut line = String::new();
    let _ = io::stdin().read_line(&mut line);
}

fn main() {
    env_logger::init().unwrap();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("USAGE: game configpath");
        std::process::exit(1);
    }

    let config = read_config(&args[1]);
    info!("session configured: {:?}", config);

    let mut session: Session<Game> = Session::new(&config, Instant::now());
    let stdin = io::stdin();

    loop {
        session.tick(Instant::now());
        if session.finished() {
            break;
        }

        let promoting = {
            let snapshot = session.snapshot();
            draw_board(&snapshot);
            prompt(&snapshot);
            snapshot.promotion.is_some()
        };

        let mut line = String::new();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .expect("Reading input failed");
        if read == 0 {
            // stdin closed under us; treat it as a quit
            session.submit(Event::Quit);
            continue;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match parse_input(trimmed, promoting) {
            Some(event) => session.submit(event),
            None => println!("Unrecognised input: {}", trimmed),
        }
    }

    if !session.quit_requested() {
        draw_board(&session.snapshot());
        show_banner(session.result());
    }
}
