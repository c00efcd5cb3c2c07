use anyhow::Result;
use clap::{Parser, Subcommand};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "

License: MIT
Rust Edition: 2024"
);

#[derive(Parser)]
#[command(name = "sedmcp")]
#[command(about = "Regex-based text transformation over stdio, as a tool server or a filter")]
#[command(long_about = "sedmcp applies a subset of sed to in-memory text.

It understands three operations: substitute (s), delete matching lines (d)
and keep matching lines (p). Every run reports what changed, line by line.

Files are only ever read. Results go to stdout.

REGEX SYNTAX:
  Patterns use Rust regex syntax. Replacements use $1 / ${name} for groups;
  in 's' expressions the sed forms \\1 and & are converted for you.

FLAGS:
  g  replace every match (substitute only)
  i  case-insensitive
  m  ^ and $ match at line boundaries
  s  . matches newline

EXAMPLES:
  sedmcp apply -e 's/foo/bar/g' file.txt         Replace all occurrences
  cat file.txt | sedmcp apply -e '/^#/d'         Drop comment lines
  sedmcp apply -e '/error/Ip' app.log            Keep lines containing 'error'
  sedmcp apply -e 's/a/b/' -e '/x/d' file.txt    Run operations in order
  sedmcp apply --preview -e 's/v1/v2/g' f.txt    Show a diff instead
  sedmcp validate 's/(a/b/'                      Check an expression
  sedmcp serve                                   JSON-RPC tool server on stdio")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_version = LONG_VERSION)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply sed expressions to a file or stdin
    #[command(long_about = "Apply one or more sed expressions to a file or stdin.

With a single expression the operation runs on its own. With several, they
run as a batch: each one consumes the previous output, and the first failure
stops the batch and leaves the input unchanged.

EXAMPLES:
  sedmcp apply -e 's/old/new/g' notes.txt
  sedmcp apply -e 's/(\\w+)@example.com/$1@corp.test/g' users.csv
  sedmcp apply --json -e '/^$/d' < input.txt")]
    Apply {
        /// Sed expression (repeat for a batch)
        #[arg(short = 'e', long = "expression", value_name = "EXPRESSION", required = true)]
        expressions: Vec<String>,

        /// File to read (default: stdin)
        #[arg(value_name = "FILE")]
        file: Option<String>,

        /// Show a diff of the changes instead of the result
        #[arg(short = 'p', long, conflicts_with = "json")]
        preview: bool,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,

        /// Number of context lines in previews (default: from config)
        #[arg(short = 'n', long, value_name = "NUM")]
        context: Option<usize>,
    },

    /// Validate a sed expression without running it
    Validate {
        /// Sed expression to check
        #[arg(value_name = "EXPRESSION")]
        expression: String,
    },

    /// Run the JSON-RPC tool server on stdin/stdout
    #[command(long_about = "Run the JSON-RPC 2.0 tool server on stdin/stdout.

Requests are read one per line. Tools: sed_execute, sed_preview,
sed_validate and sed_execute_batch.

Logs never go to stdout. Enable logging.debug in ~/.sedmcp/config.toml to
write a log file.")]
    Serve,

    /// Show configuration
    #[command(long_about = "Show the sedmcp configuration.

The file lives at ~/.sedmcp/config.toml and is created with defaults on
first use.

CONFIGURATION OPTIONS:
  [logging]
    debug = false                 # Write ~/.sedmcp/sedmcp.log
    level = \"info\"                # error, warn, info, debug, trace
    log_dir = \"/path\"             # Custom log directory (optional)

  [engine]
    regex_size_limit_mb = 10      # Max compiled regex size (MB)
    dfa_size_limit_mb = 2         # Max DFA cache per regex (MB)

  [server]
    max_content_bytes = 10485760  # Largest content accepted by tools
    max_batch_operations = 100    # Longest batch accepted

  [display]
    color = true                  # Colour terminal output
    context_lines = 2             # Context lines in previews (max 10)

EXAMPLES:
  sedmcp config --show            Show current configuration
  sedmcp config --path            Print the config file path")]
    Config {
        /// Show current configuration
        #[arg(long = "show", conflicts_with = "path")]
        show: bool,

        /// Print the configuration file path
        #[arg(long = "path")]
        path: bool,
    },
}

pub fn parse_args() -> Result<Args> {
    Ok(into_args(Cli::parse()))
}

fn into_args(cli: Cli) -> Args {
    match cli.command {
        Commands::Apply {
            expressions,
            file,
            preview,
            json,
            context,
        } => {
            let output = if json {
                OutputMode::Json
            } else if preview {
                OutputMode::Preview
            } else {
                OutputMode::Text
            };
            Args::Apply {
                expressions,
                file,
                output,
                context,
            }
        }
        Commands::Validate { expression } => Args::Validate { expression },
        Commands::Serve => Args::Serve,
        Commands::Config { show, path } => Args::Config {
            // No flag behaves like --show
            action: if show || !path {
                ConfigAction::Show
            } else {
                ConfigAction::Path
            },
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// The transformed text only
    Text,
    /// Coloured line diff plus summary
    Preview,
    /// Serialized report
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the configuration file path
    Path,
}

#[derive(Debug)]
pub enum Args {
    Apply {
        expressions: Vec<String>,
        file: Option<String>,
        output: OutputMode,
        context: Option<usize>,
    },
    Validate {
        expression: String,
    },
    Serve,
    Config {
        action: ConfigAction,
    },
}
