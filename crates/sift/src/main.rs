//! Command-line front end for the sift query compiler.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sift_query::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_TOKENS, Issue, ParseOptions, parse_with_options, tokenize};

#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Compile search-query strings into structured expression trees")]
/// Top-level CLI options.
struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    command: Commands,
}

#[derive(Subcommand)]
/// Supported `sift` subcommands.
enum Commands {
    /// Parse a query and print the resulting expression
    #[command(after_help = "\
QUERY SYNTAX:
  term              Free-text term
  term1 term2       Both terms (implicit AND)
  \"quoted phrase\"   Exact text, kept verbatim
  field:value       Filter, also field:>v field:<v field:>=v field:<=v
  -term             Negation, also the NOT keyword
  term1 OR term2    Either side
  (expr)            Grouping

EXAMPLES:
  sift parse 'tag:invoice AND (status:open OR status:pending)'
  sift parse --optimize --compact 'foo foo bar'
  sift parse --json 'createdAt:>2024-01-01 -archived'")]
    Parse {
        /// Query string to parse
        #[arg(allow_hyphen_values = true)]
        query: String,

        /// Run the optimizer over the parsed expression
        #[arg(long)]
        optimize: bool,

        /// Print the expression in query syntax instead of a tree
        #[arg(long)]
        compact: bool,

        /// Output the full result in JSON format
        #[arg(long)]
        json: bool,

        /// Exit with an error if the query produced any issues
        #[arg(long)]
        strict: bool,

        /// Maximum nesting depth before subtrees are dropped [default: 10]
        #[arg(long)]
        max_depth: Option<usize>,

        /// Maximum number of tokens before input is truncated [default: 200]
        #[arg(long)]
        max_tokens: Option<usize>,
    },

    /// Tokenize a query and print the token stream
    Tokens {
        /// Query string to tokenize
        #[arg(allow_hyphen_values = true)]
        query: String,

        /// Output in JSON format
        #[arg(long)]
        json: bool,

        /// Maximum number of tokens before input is truncated [default: 200]
        #[arg(long)]
        max_tokens: Option<usize>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            query,
            optimize,
            compact,
            json,
            strict,
            max_depth,
            max_tokens,
        } => {
            let options = ParseOptions {
                max_tokens: max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
                max_depth: max_depth.unwrap_or(DEFAULT_MAX_DEPTH),
                optimize,
            };
            cmd_parse(&query, &options, compact, json, strict)
        }
        Commands::Tokens {
            query,
            json,
            max_tokens,
        } => cmd_tokens(&query, max_tokens.unwrap_or(DEFAULT_MAX_TOKENS), json),
    }
}

/// Implements `sift parse`.
fn cmd_parse(
    query: &str,
    options: &ParseOptions,
    compact: bool,
    json: bool,
    strict: bool,
) -> ExitCode {
    let parsed = parse_with_options(query, options);

    if json {
        match serde_json::to_string_pretty(&parsed) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => {
                eprintln!("error: failed to serialize result: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        if compact {
            println!("{}", parsed.expression.to_query_string());
        } else {
            print!("{}", parsed.expression);
        }
        report_issues(&parsed.issues);
    }

    if strict && !parsed.issues.is_empty() {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Implements `sift tokens`.
fn cmd_tokens(query: &str, max_tokens: usize, json: bool) -> ExitCode {
    let (tokens, issues) = tokenize(query, max_tokens);

    if json {
        let result = serde_json::json!({ "tokens": tokens, "issues": issues });
        match serde_json::to_string_pretty(&result) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => {
                eprintln!("error: failed to serialize result: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        for token in &tokens {
            println!("{token:?}");
        }
        report_issues(&issues);
    }

    ExitCode::SUCCESS
}

/// Prints issues as warnings on stderr, with hints where available.
fn report_issues(issues: &[Issue]) {
    for issue in issues {
        eprintln!("warning: {} [{}]", issue.message, issue.code);
        if let Some(hint) = issue.code.hint() {
            eprintln!("hint: {hint}");
        }
    }
}
