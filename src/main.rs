mod debug_report;

use gridmatch::{Grammar, Grid, parse_verbose};
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "GRIDMATCH_LOG";

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };
    init_tracing();

    if let Err(err) = run(&config) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).try_init();
}

fn run(config: &CliConfig) -> gridmatch::Result<()> {
    let grammar = Grammar::from_yaml_file(&config.grammar)?;
    let text = match &config.grid {
        Some(path) => std::fs::read_to_string(path)?,
        None => read_stdin_input()?,
    };
    let grid = match config.delimiter {
        Some(delimiter) => Grid::from_delimited(&text, delimiter),
        None => Grid::from_chars(&text),
    };

    let res = parse_verbose(&grammar, &grid)?;
    debug_report::print_run(&grammar, &grid, &res, config.color);
    Ok(())
}

struct CliConfig {
    grammar: PathBuf,
    grid: Option<PathBuf>,
    delimiter: Option<char>,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut grammar: Option<PathBuf> = None;
    let mut grid: Option<PathBuf> = None;
    let mut delimiter: Option<char> = None;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    let set_grid = |value: String, grid: &mut Option<PathBuf>| {
        if grid.is_some() {
            return Err("error: grid file provided multiple times".to_string());
        }
        *grid = Some(PathBuf::from(value));
        Ok(())
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("gridmatch {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--grammar" | "-g" => {
                let value = args.next().ok_or_else(|| "error: --grammar expects a value".to_string())?;
                grammar = Some(PathBuf::from(value));
            }
            "--delimiter" | "-d" => {
                let value = args.next().ok_or_else(|| "error: --delimiter expects a value".to_string())?;
                delimiter = Some(parse_delimiter(&value)?);
            }
            "--" => {
                if let Some(value) = args.next() {
                    set_grid(value, &mut grid)?;
                }
                if args.next().is_some() {
                    return Err("error: expected at most one grid file".to_string());
                }
                break;
            }
            _ if arg.starts_with("--grammar=") => {
                grammar = Some(PathBuf::from(arg.trim_start_matches("--grammar=")));
            }
            _ if arg.starts_with("--delimiter=") => {
                delimiter = Some(parse_delimiter(arg.trim_start_matches("--delimiter="))?);
            }
            _ if arg.starts_with('-') && arg != "-" => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            "-" => {}
            _ => set_grid(arg, &mut grid)?,
        }
    }

    let grammar = grammar.ok_or_else(|| format!("error: --grammar is required\n\n{}", help_text()))?;
    Ok(CliConfig { grammar, grid, delimiter, color })
}

fn parse_delimiter(value: &str) -> Result<char, String> {
    match value {
        "\\t" | "tab" => Ok('\t'),
        _ => {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err(format!("error: invalid --delimiter '{value}' (expected a single character)")),
            }
        }
    }
}

fn read_stdin_input() -> io::Result<String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "gridmatch {version}

Recognize grammar-described structures in a 2D text grid.

Usage:
  gridmatch --grammar <file.yaml> [OPTIONS] [--] [grid-file]

The grid is read from grid-file, or from stdin when omitted (or '-'). Without
--delimiter every character is one cell and whitespace is an empty cell.

Options:
  -g, --grammar <file>       YAML grammar to match with (required).
  -d, --delimiter <char>     Split lines into cells on <char> ('tab' or '\\t'
                             for tab separated input).
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Environment:
  {log_env}              Tracing filter, e.g. 'gridmatch=debug'. Default: warn.

Exit codes:
  0  Success.
  1  Grammar, grid or IO error.
  2  Invalid arguments.
",
        version = env!("CARGO_PKG_VERSION"),
        log_env = LOG_ENV,
    )
}
