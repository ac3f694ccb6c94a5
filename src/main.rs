use clap::{Parser as ClapParser, Subcommand};
use sift_lang::cli::{self, CliError, FilterOptions, FilterOutput};
use sift_lang::{Value, to_json, to_json_pretty, tokenize};
use std::fs;
use std::io::{self, Read};

#[derive(ClapParser)]
#[command(name = "sift")]
#[command(about = "Sift - a query language for filtering structured log and telemetry events")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter a JSON array of events with one or more queries
    Filter {
        /// The sift queries (an event matches if it satisfies any)
        #[arg(required = true)]
        queries: Vec<String>,

        /// JSON input file (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Print matching indices instead of events
        #[arg(long)]
        indices: bool,
    },

    /// Validate a query's syntax without executing it
    Check {
        /// The sift query to validate
        query: String,
    },

    /// Dump the token list for a query
    Tokens {
        /// The sift query to tokenize
        query: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Filter {
            queries,
            input,
            pretty,
            indices,
        } => run_filter(queries, input, pretty, indices),
        Commands::Check { query } => run_check(&query),
        Commands::Tokens { query } => run_tokens(&query),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn read_input(input: Option<String>) -> Result<Option<String>, CliError> {
    match input {
        Some(path) => fs::read_to_string(path).map(Some).map_err(CliError::Io),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(CliError::Io)?;
            Ok(Some(buffer))
        }
        None => Ok(None),
    }
}

fn run_filter(
    queries: Vec<String>,
    input: Option<String>,
    pretty: bool,
    indices: bool,
) -> Result<(), CliError> {
    let options = FilterOptions {
        queries,
        input: read_input(input)?,
        indices,
    };

    match cli::execute_filter(&options)? {
        FilterOutput::Indices(indices) => {
            let list = Value::Array(indices.into_iter().map(|i| Value::Integer(i as i64)).collect());
            println!("{}", to_json(&list));
        }
        FilterOutput::Events(events) => {
            let list = Value::Array(events);
            if pretty {
                println!("{}", to_json_pretty(&list));
            } else {
                println!("{}", to_json(&list));
            }
        }
    }
    Ok(())
}

fn run_check(query: &str) -> Result<(), CliError> {
    sift_lang::parse_query(query).map_err(CliError::Parse)?;
    println!("Syntax is valid");
    Ok(())
}

fn run_tokens(query: &str) -> Result<(), CliError> {
    let tokens = tokenize(query).map_err(|e| CliError::Parse(e.into()))?;
    for token in tokens {
        println!("{:>3}..{:<3} {:?}", token.start, token.end, token.kind);
    }
    Ok(())
}
