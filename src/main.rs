use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use log::{error, info};

use multiverse_chess::move_generation::perft::perft_divide;
use multiverse_chess::search::parallel_perft::{run_perft, PerftMode};
use multiverse_chess::search::threading::{SearchConfig, ThreadingConfig};
use multiverse_chess::utils::move_notation::render_action;
use multiverse_chess::utils::render_game_state::render_position;
use multiverse_chess::{ChessError, ChessResult, Game, RenderFlags};

#[derive(Parser, Debug)]
#[command(author, version, about = "Multiverse chess perft and notation tool", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Source {
    /// Game file to load; the search starts from its last node
    #[arg(long)]
    pgn: Option<PathBuf>,

    /// Built-in variant used when no game file is given
    #[arg(long, default_value = "Standard")]
    variant: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Count leaf positions of the action tree
    Perft {
        #[command(flatten)]
        source: Source,
        #[arg(long, default_value_t = 1)]
        depth: u8,
        /// Worker threads, 0 for all cores
        #[arg(long, default_value_t = 0)]
        threads: usize,
        /// sequential | parallel | dynamic | tt | timed
        #[arg(long, default_value = "dynamic")]
        mode: PerftMode,
        #[arg(long, default_value_t = 64)]
        tt_mb: usize,
        #[arg(long, default_value_t = 2)]
        split_depth: u8,
        /// Deadline in milliseconds (timed mode)
        #[arg(long)]
        timeout: Option<u64>,
        /// Also print the per-action split at the root
        #[arg(long)]
        divide: bool,
    },
    /// Count legal actions from the loaded position
    Count {
        #[command(flatten)]
        source: Source,
    },
    /// Write the loaded game back as text
    Render {
        #[command(flatten)]
        source: Source,
        #[arg(long)]
        all_variations: bool,
        /// Write jump targets relative to the source board
        #[arg(long)]
        relative: bool,
        /// Suffix checking moves with + and mating moves with #
        #[arg(long)]
        check_marks: bool,
        /// Print the boards of the last position instead of the movetext
        #[arg(long)]
        boards: bool,
    },
}

fn load(source: &Source) -> ChessResult<Game> {
    match &source.pgn {
        Some(path) => {
            let text = std::fs::read_to_string(path).map_err(|e| {
                ChessError::malformed(format!("cannot read {}: {e}", path.display()))
            })?;
            Game::from_pgn(&text)
        }
        None => Game::new(&source.variant),
    }
}

fn run(cli: Cli) -> ChessResult<()> {
    match cli.command {
        Command::Perft {
            source,
            depth,
            threads,
            mode,
            tt_mb,
            split_depth,
            timeout,
            divide,
        } => {
            let game = load(&source)?;
            let config = SearchConfig {
                threading: ThreadingConfig::new(threads),
                split_depth,
                tt_mb,
                timeout: timeout.map(Duration::from_millis),
            };
            if divide && depth > 0 {
                let root = game.node_position();
                for (action, nodes) in perft_divide(root, depth) {
                    println!("{}: {nodes}", render_action(root, &action, false)?);
                }
            }
            let report = run_perft(game.node_position(), depth, mode, &config)?;
            let secs = report.elapsed.as_secs_f64();
            let nps = if secs > 0.0 {
                (report.nodes as f64 / secs) as u64
            } else {
                0
            };
            println!(
                "depth {depth} nodes {} completed {} time {:.3}s nps {nps}",
                report.nodes, report.completed, secs
            );
        }
        Command::Count { source } => {
            let game = load(&source)?;
            println!("{}", game.count_actions());
        }
        Command::Render {
            source,
            all_variations,
            relative,
            check_marks,
            boards,
        } => {
            let game = load(&source)?;
            if boards {
                print!("{}", render_position(game.node_position()));
            } else {
                let flags = RenderFlags {
                    all_variations,
                    relative_targets: relative,
                    check_marks,
                };
                print!("{}", game.render(flags)?);
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, log_level),
    )
    .init();
    info!("multiverse_chess {}", env!("CARGO_PKG_VERSION"));

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
