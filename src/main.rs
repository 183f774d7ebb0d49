use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, bail};
use log::info;
use parse::Parser;
use pollynom::{Board, BoardConfig};

const USAGE: &str = "usage: pollynom [--config FILE] [--dot X,Y[,bad]]... [--json] FORMULA...";

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    dots: Vec<(f64, f64, bool)>,
    json: bool,
    formulas: Vec<String>,
}

fn parse_dot(text: &str) -> anyhow::Result<(f64, f64, bool)> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    let coordinate = |s: &str| {
        s.parse::<f64>()
            .with_context(|| format!("invalid coordinate {s:?} in dot {text:?}"))
    };
    match parts[..] {
        [x, y] => Ok((coordinate(x)?, coordinate(y)?, true)),
        [x, y, "bad"] => Ok((coordinate(x)?, coordinate(y)?, false)),
        _ => bail!("expected X,Y or X,Y,bad but got {text:?}"),
    }
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a file")?;
                parsed.config = Some(path.into());
            }
            "--dot" => {
                let dot = args.next().context("--dot needs X,Y")?;
                parsed.dots.push(parse_dot(&dot)?);
            }
            "--json" => parsed.json = true,
            "-h" | "--help" => bail!(USAGE),
            _ => parsed.formulas.push(arg),
        }
    }
    if parsed.formulas.is_empty() {
        bail!(USAGE);
    }
    Ok(parsed)
}

fn run() -> anyhow::Result<()> {
    let args = parse_args(std::env::args().skip(1))?;

    let config = match &args.config {
        Some(path) => BoardConfig::load(path)?,
        None => BoardConfig::default(),
    };
    info!("window {:?}", config.window);

    let mut board = Board::new(config);
    for &(x, y, good) in &args.dots {
        board.add_dot(x, y, good);
    }
    board.update(&args.formulas);

    if args.json {
        let graphs: Vec<_> = board.graphs().collect();
        println!("{}", serde_json::to_string(&graphs)?);
        return Ok(());
    }

    let parser = Parser::default();
    for (formula, graph) in board.formulas().zip(board.graphs()) {
        if formula.is_empty() {
            continue;
        }
        match parser.try_parse(formula) {
            Ok(expression) => {
                let points: usize = graph.iter().map(|b| b.len()).sum();
                let printed = expression.print().unwrap_or_else(|| formula.into());
                println!("{printed}: {} branches, {points} points", graph.len());
            }
            Err(error) => println!("{formula}: rejected, {error}"),
        }
    }

    for dot in board.dots() {
        let kind = if dot.is_good() { "good" } else { "bad" };
        let state = if dot.is_active() { "hit" } else { "missed" };
        println!("{kind} dot ({}, {}): {state}", dot.x, dot.y);
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{error:#}");
            ExitCode::FAILURE
        }
    }
}
