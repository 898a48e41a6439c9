use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use chordcubes::config::Config;
use chordcubes::console::{self, Level};
use chordcubes::patterns::{render_steps, Style};
use chordcubes::session::{self, Session};
use chordcubes::{repl, tui};

fn cli() -> Command {
    Command::new("chordcubes")
        .about("Drum/metronome transport with a staff-notation overlay")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .global(true)
                .help("YAML config file (default: ./chordcubes.yaml if present)"),
        )
        .arg(
            Arg::new("bpm")
                .long("bpm")
                .value_name("N")
                .value_parser(value_parser!(f64))
                .help("Initial tempo"),
        )
        .arg(
            Arg::new("style")
                .long("style")
                .value_name("NAME")
                .help("Initial drum style"),
        )
        .arg(
            Arg::new("tui")
                .long("tui")
                .action(ArgAction::SetTrue)
                .help("Full-screen interface instead of the line REPL"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Only show warnings and errors; no banner"),
        )
        .subcommand(
            Command::new("patterns")
                .about("Print drum pattern grids")
                .arg(Arg::new("style").value_name("STYLE").help("Only this style")),
        )
        .subcommand(
            Command::new("voicing")
                .about("Print the notes drawn for chord symbols")
                .arg(
                    Arg::new("symbols")
                        .value_name("SYMBOL")
                        .num_args(1..)
                        .required(true),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    let mut config = Config::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    if let Some(bpm) = matches.get_one::<f64>("bpm") {
        config.bpm = *bpm;
    }
    if let Some(style) = matches.get_one::<String>("style") {
        config.style = style.clone();
        config.initial_style()?;
    }
    if matches.get_flag("quiet") {
        config.log_level = config.log_level.max(Level::Warn);
    }
    Ok(config)
}

fn print_patterns(style: Option<&String>) -> Result<()> {
    let styles: Vec<Style> = match style {
        Some(name) => vec![name.parse().map_err(|e| anyhow!("{}", e))?],
        None => Style::ALL.to_vec(),
    };
    for (i, style) in styles.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("{}", style);
        for (drum, steps) in style.pattern() {
            println!("  {:<10} {}", drum.name(), render_steps(steps));
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("patterns", sub)) => return print_patterns(sub.get_one::<String>("style")),
        Some(("voicing", sub)) => {
            let symbols: Vec<&String> = sub.get_many::<String>("symbols").into_iter().flatten().collect();
            println!("{}", session::voicing_listing(&symbols));
            return Ok(());
        }
        _ => {}
    }

    let config = load_config(&matches)?;
    console::configure(config.log_filter());
    let session = Session::new(&config)?;

    if matches.get_flag("tui") {
        return tui::run(session);
    }

    if !matches.get_flag("quiet") {
        let state = session.transport().state();
        println!(
            "CHORDCUBES | bpm: {} style: {} drums: {} metronome: {} (type help)",
            state.bpm,
            state.style,
            if state.drums { "on" } else { "off" },
            if state.metronome { "on" } else { "off" },
        );
    }
    repl::run_repl(session)
}
