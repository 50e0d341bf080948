//! Console front end for a Quizlink host or player.
//!
//! ```text
//! quiz-console host <pin> [server]
//! quiz-console play <pin> <uid> [server]
//! ```
//!
//! Host commands on stdin: `start`, `kick <id>`, `end`.
//! Player commands on stdin: the 1-based number of an option.
//! Set `RUST_LOG=quizlink=debug` to watch the session work.

use quizlink::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

enum Mode {
    Host { pin: Pin },
    Play { pin: Pin, uid: PlayerId },
}

fn usage() -> ! {
    eprintln!("usage: quiz-console host <pin> [server]");
    eprintln!("       quiz-console play <pin> <uid> [server]");
    std::process::exit(2);
}

fn parse_args() -> (Mode, Option<String>) {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let number = |s: Option<&String>| s.and_then(|s| s.parse::<u64>().ok());

    match args.first().map(String::as_str) {
        Some("host") => {
            let Some(pin) = number(args.get(1)).and_then(|p| u32::try_from(p).ok()) else {
                usage()
            };
            (Mode::Host { pin: Pin(pin) }, args.get(2).cloned())
        }
        Some("play") => {
            let (Some(pin), Some(uid)) = (
                number(args.get(1)).and_then(|p| u32::try_from(p).ok()),
                number(args.get(2)),
            ) else {
                usage()
            };
            (
                Mode::Play {
                    pin: Pin(pin),
                    uid: PlayerId(uid),
                },
                args.get(3).cloned(),
            )
        }
        _ => usage(),
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn start_rejected_notice(min_players: usize) -> String {
    format!("need at least {min_players} players to start")
}

fn render_host(view: &HostView, min_players: usize) {
    println!("[{:?}] players: {}", view.state, view.roster.len());
    for player in view.roster.iter() {
        let mark = if player.connected { " " } else { "x" };
        let pending = if player.pending { " (kicking)" } else { "" };
        println!("  {mark} {} {} {} pts{pending}", player.id.0, player.name, player.score);
    }
    if view.start_rejected {
        println!("  {}", start_rejected_notice(min_players));
    }
    if let Some(question) = &view.question {
        println!("  Q: {} ({} answers in)", question.title, view.answers_received);
    }
    if let Some(countdown) = &view.countdown {
        println!("  {}s", countdown.remaining);
    }
}

fn render_player(view: &PlayerView) {
    println!("[{:?}] {} pts, rank {}", view.state, view.points, view.rank);
    if let Some(countdown) = &view.countdown {
        match &countdown.title {
            Some(title) => println!("  {title}: {}", countdown.remaining),
            None => println!("  {}", countdown.remaining),
        }
    }
    if let (PlayerState::Question, Some(question)) = (view.state, &view.question) {
        println!("  {}", question.title);
        for (i, option) in question.answers.iter().enumerate() {
            println!("    {}. {}", i + 1, option.title);
        }
    }
    if let Some(feedback) = &view.feedback {
        let verdict = if feedback.correct { "correct" } else { "wrong" };
        println!("  {verdict}, +{}", feedback.points);
    }
}

// ---------------------------------------------------------------------------
// Session loops
// ---------------------------------------------------------------------------

fn report(result: Result<CommandOutcome, QuizlinkError>) {
    match result {
        Ok(CommandOutcome::Accepted) => {}
        Ok(CommandOutcome::Rejected) => println!("not now"),
        Err(e) => println!("refused: {e}"),
    }
}

async fn run_host(client: &QuizClient, pin: Pin) -> Result<SessionOutcome, QuizlinkError> {
    let min_players = client.config().session.min_players;
    let handle = client.connect_host(pin).await?;
    let mut view = handle.subscribe();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                render_host(&view.borrow_and_update(), min_players);
            }
            line = stdin.next_line() => {
                let Ok(Some(line)) = line else {
                    handle.shutdown().await;
                    break;
                };
                let mut words = line.split_whitespace();
                let result = match (words.next(), words.next()) {
                    (Some("start"), _) => handle.start_game().await,
                    (Some("end"), _) => handle.end_question().await,
                    (Some("kick"), Some(id)) => match id.parse() {
                        Ok(id) => handle.kick(PlayerId(id)).await,
                        Err(_) => {
                            println!("kick needs a numeric id");
                            continue;
                        }
                    },
                    _ => {
                        println!("commands: start | kick <id> | end");
                        continue;
                    }
                };
                report(result);
            }
        }
    }
    Ok(handle.wait().await)
}

async fn run_player(
    client: &QuizClient,
    pin: Pin,
    uid: PlayerId,
) -> Result<SessionOutcome, QuizlinkError> {
    let handle = client.connect_player(pin, uid).await?;
    let mut view: watch::Receiver<PlayerView> = handle.subscribe();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            changed = view.changed() => {
                if changed.is_err() {
                    break;
                }
                render_player(&view.borrow_and_update());
            }
            line = stdin.next_line() => {
                let Ok(Some(line)) = line else {
                    handle.shutdown().await;
                    break;
                };
                match line.trim().parse::<usize>() {
                    Ok(choice) if choice > 0 => report(handle.answer(choice - 1).await),
                    _ => println!("type the number of an option"),
                }
            }
        }
    }
    Ok(handle.wait().await)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let (mode, server) = parse_args();
    let mut builder = QuizClient::builder();
    if let Some(server) = &server {
        builder = builder.server(server);
    }
    let client = builder.build();

    let outcome = match mode {
        Mode::Host { pin } => run_host(&client, pin).await?,
        Mode::Play { pin, uid } => run_player(&client, pin, uid).await?,
    };
    tracing::info!(?outcome, "session over");

    match outcome {
        SessionOutcome::Finished => println!("game over"),
        SessionOutcome::Left(reason) => println!("disconnected: {reason:?}"),
        SessionOutcome::Closed => println!("closed"),
        SessionOutcome::Failed(e) => return Err(e.into()),
    }
    Ok(())
}
