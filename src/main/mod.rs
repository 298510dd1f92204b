use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rafile::{
    commands::{ra_check, ra_select, ra_sort},
    prelude::RaError,
};

const INFO: &str = "\
rafile: order-preserving Ra stanza file tools
usage: rafile [--help] <subcommand>

Subcommands:

  check: parse a Ra file and report on its consistency.
  select: print the stanzas (or one field) matching key=value predicates.
  sort: print a Ra file's stanzas ordered by a list of fields.

";

#[derive(Parser)]
#[clap(name = "rafile")]
#[clap(about = INFO)]
struct Cli {
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Check {
        /// an input Ra stanza file
        #[arg(required = true)]
        rafile: PathBuf,

        /// an alternate (possibly non-unique) key field to index and report on
        #[arg(long)]
        alt: Option<String>,

        /// treat duplicate stanza names as errors instead of warnings
        #[arg(long)]
        strict: bool,
    },
    Select {
        /// an input Ra stanza file
        #[arg(required = true)]
        rafile: PathBuf,

        /// a KEY=VALUE predicate each selected stanza must satisfy (repeatable)
        #[arg(long = "where", required = true, value_parser = parse_key_value)]
        conditions: Vec<(String, String)>,

        /// print only this field of each matching stanza
        #[arg(long)]
        pick: Option<String>,

        /// an optional output file (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    Sort {
        /// an input Ra stanza file
        #[arg(required = true)]
        rafile: PathBuf,

        /// comma-separated fields to order stanzas by
        #[arg(long, required = true, value_delimiter = ',')]
        by: Vec<String>,

        /// an optional output file (standard output will be used if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn parse_key_value(pair: &str) -> Result<(String, String), String> {
    pair.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("'{}' is not a KEY=VALUE pair", pair))
}

fn run() -> Result<(), RaError> {
    let cli = Cli::parse();
    let output = match &cli.command {
        Some(Commands::Check {
            rafile,
            alt,
            strict,
        }) => ra_check(rafile, alt.as_ref(), *strict)?,
        Some(Commands::Select {
            rafile,
            conditions,
            pick,
            output,
        }) => ra_select(rafile, conditions, pick.as_ref(), output.as_ref())?,
        Some(Commands::Sort { rafile, by, output }) => ra_sort(rafile, by, output.as_ref())?,
        None => {
            println!("{}\n", INFO);
            std::process::exit(1);
        }
    };
    if !output.report.is_empty() {
        eprint!("{}", output.report);
        std::process::exit(1);
    }
    Ok(())
}

fn main() {
    env_logger::init();
    match run() {
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
