//! muxterm - replay and inspect terminal byte streams
//!
//! Feeds a recorded byte stream (a file or stdin) through the virtual
//! terminal and either renders it live in the host terminal or prints the
//! final screen text.
//!
//! ```text
//! muxterm session.log            # Replay in the alternate screen
//! cat session.log | muxterm      # Same, from stdin
//! muxterm --dump -W 80 -H 24 f   # Print the final screen
//! ```
//!
//! # Keys while replaying
//!
//! | Key | Action |
//! |-----|--------|
//! | PageUp/PageDown | Scroll through history |
//! | q / Esc | Quit once the stream has ended |
//! | Ctrl+C | Quit |

use std::env;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::mpsc::TryRecvError;
use std::time::Duration;

use anyhow::{bail, Context};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::{execute, terminal::SetTitle};
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use muxterm::config::Config;
use muxterm::core::session::{Notification, Session};
use muxterm::core::term::Surface;
use muxterm::ui::Renderer;

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command line options
#[derive(Debug, Default)]
struct Args {
    /// Print the final screen instead of rendering
    dump: bool,
    cols: Option<u16>,
    rows: Option<u16>,
    /// Input file; stdin when unset
    input: Option<PathBuf>,
}

fn print_version() {
    eprintln!("muxterm {}", VERSION);
}

fn print_help() {
    eprintln!("muxterm {} - virtual terminal replay", VERSION);
    eprintln!();
    eprintln!("Usage: muxterm [OPTIONS] [FILE]");
    eprintln!();
    eprintln!("Reads FILE (or stdin) as terminal output and replays it.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -d, --dump            Print the final screen text and exit");
    eprintln!("  -W, --width <COLS>    Screen width for --dump (default 80)");
    eprintln!("  -H, --height <ROWS>   Screen height for --dump (default 24)");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
    eprintln!();
    eprintln!("Configuration: ~/.muxterm/config.toml");
}

fn parse_size(value: Option<&String>, name: &str) -> Result<u16, String> {
    let value = value.ok_or_else(|| format!("Missing {} argument", name))?;
    match value.parse::<u16>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("Invalid {}: {}", name, value)),
    }
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args::default();
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-d" | "--dump" => {
                parsed.dump = true;
            }
            "-W" | "--width" => {
                i += 1;
                parsed.cols = Some(parse_size(args.get(i), "width")?);
            }
            "-H" | "--height" => {
                i += 1;
                parsed.rows = Some(parse_size(args.get(i), "height")?);
            }
            arg if arg.starts_with('-') && arg != "-" => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
            path => {
                if parsed.input.is_some() {
                    return Err("Only one input file may be given".to_string());
                }
                if path != "-" {
                    parsed.input = Some(PathBuf::from(path));
                }
            }
        }
        i += 1;
    }

    Ok(parsed)
}

/// Log to a file; the terminal belongs to the replay
fn init_logging(config: &Config) {
    let Some(log_path) = config.log_path() else {
        return;
    };
    if let Some(parent) = log_path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let Ok(file) = fs::OpenOptions::new().create(true).append(true).open(&log_path) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn open_input(args: &Args) -> anyhow::Result<Box<dyn Read + Send>> {
    Ok(match &args.input {
        Some(path) => Box::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        None => Box::new(io::stdin()),
    })
}

fn main() -> anyhow::Result<()> {
    let argv: Vec<String> = env::args().collect();
    let args = match parse_args(&argv) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let config = Config::load();
    init_logging(&config);
    info!("muxterm {} starting", VERSION);

    let source = open_input(&args)?;
    if args.dump {
        run_dump(&args, &config, source)
    } else {
        run_replay(&config, source)
    }
}

/// Decode the whole stream and print the final screen
fn run_dump(args: &Args, config: &Config, source: Box<dyn Read + Send>) -> anyhow::Result<()> {
    let cols = args.cols.unwrap_or(80);
    let rows = args.rows.unwrap_or(24);
    let session = Session::spawn(1, source, io::sink(), cols, rows, config.terminal_options())?;

    for note in session.notifications().iter() {
        match note {
            Notification::Closed => break,
            Notification::Fatal(diag) => bail!("terminal fault: {}", diag),
            other => debug!("dump: {:?}", other),
        }
    }
    println!("{}", session.text());
    session.wait();
    Ok(())
}

/// Render the stream live in the host terminal
fn run_replay(config: &Config, source: Box<dyn Read + Send>) -> anyhow::Result<()> {
    let (cols, rows) = Renderer::host_size()?;
    info!("Terminal size: {}x{}", cols, rows);

    let session = Session::spawn(1, source, io::sink(), cols, rows, config.terminal_options())?;
    let mut renderer = Renderer::new(cols, rows);
    renderer.init()?;

    let result = run_main_loop(&session, &mut renderer);

    let _ = renderer.cleanup();
    if let Err(ref e) = result {
        error!("Replay failed: {}", e);
    }
    result
}

fn redraw(session: &Session, renderer: &mut Renderer) -> anyhow::Result<()> {
    session.draw(renderer);
    renderer.present(session.cursor())?;
    Ok(())
}

/// Main event loop
fn run_main_loop(session: &Session, renderer: &mut Renderer) -> anyhow::Result<()> {
    let poll_timeout = Duration::from_millis(10);
    let mut ended = false;

    loop {
        // Drain session notifications
        loop {
            match session.notifications().try_recv() {
                Ok(Notification::Redraw) => redraw(session, renderer)?,
                Ok(Notification::TitleChanged(title)) => {
                    execute!(io::stdout(), SetTitle(&title))?;
                }
                Ok(Notification::Bell) => debug!("bell"),
                Ok(Notification::MouseModeChanged(modes)) => {
                    debug!("mouse modes now {:?}", modes);
                }
                Ok(Notification::Closed) => {
                    info!("Stream ended");
                    redraw(session, renderer)?;
                    ended = true;
                }
                Ok(Notification::Fatal(diag)) => bail!("terminal fault: {}", diag),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    ended = true;
                    break;
                }
            }
        }

        if !event::poll(poll_timeout)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let ctrl_c = key.modifiers.contains(KeyModifiers::CONTROL)
                    && key.code == KeyCode::Char('c');
                match key.code {
                    _ if ctrl_c => break,
                    KeyCode::Char('q') | KeyCode::Esc if ended => break,
                    KeyCode::PageUp => {
                        session.scroll_view_up(rows_of(renderer) / 2);
                        redraw(session, renderer)?;
                    }
                    KeyCode::PageDown => {
                        session.scroll_view_down(rows_of(renderer) / 2);
                        redraw(session, renderer)?;
                    }
                    _ => {}
                }
            }
            Event::Resize(cols, rows) => {
                info!("Resize to {}x{}", cols, rows);
                session.resize(cols, rows);
                renderer.resize(cols, rows);
                redraw(session, renderer)?;
            }
            _ => {}
        }
    }

    Ok(())
}

fn rows_of(renderer: &Renderer) -> usize {
    Surface::size(renderer).1.max(2) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        std::iter::once("muxterm")
            .chain(args.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_dump_args() {
        let args = parse_args(&argv(&["--dump", "-W", "100", "-H", "40", "rec.log"])).unwrap();
        assert!(args.dump);
        assert_eq!(args.cols, Some(100));
        assert_eq!(args.rows, Some(40));
        assert_eq!(args.input, Some(PathBuf::from("rec.log")));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&argv(&["-W"])).is_err());
        assert!(parse_args(&argv(&["-W", "0"])).is_err());
        assert!(parse_args(&argv(&["--bogus"])).is_err());
        assert!(parse_args(&argv(&["a", "b"])).is_err());
        assert_eq!(parse_args(&argv(&["-"])).unwrap().input, None);
    }
}
