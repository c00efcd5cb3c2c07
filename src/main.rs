use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;
use tracing::{debug, info, warn};

use sedmcp::cli::{parse_args, Args, ConfigAction, OutputMode};
use sedmcp::config::{self, Config};
use sedmcp::diff_formatter::DiffFormatter;
use sedmcp::expression::{parse_expression, parse_expressions};
use sedmcp::logger;
use sedmcp::rpc::Server;
use sedmcp::{Engine, EngineError};

fn main() -> Result<ExitCode> {
    let args = parse_args()?;
    let loaded = config::load_config()?;
    let config = loaded.config;
    let log = logger::init_logging(&config.logging)?;
    if let Some(notice) = &loaded.restored {
        warn!("{}", notice);
    }
    if let Some(path) = &log.log_path {
        info!("Logging to {}", path.display());
    }

    let engine = Engine::with_limits(config.engine.limits());
    debug!("Regex limits: {:?}", engine.limits());

    match args {
        Args::Apply {
            expressions,
            file,
            output,
            context,
        } => apply(&engine, &config, &expressions, file.as_deref(), output, context),
        Args::Validate { expression } => Ok(validate(&engine, &expression)),
        Args::Serve => {
            let server = Server::new(engine, config.server.clone());
            server.run(io::stdin().lock(), io::stdout().lock())?;
            Ok(ExitCode::SUCCESS)
        }
        Args::Config { action } => {
            show_config(&config, action)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn apply(
    engine: &Engine,
    config: &Config,
    expressions: &[String],
    file: Option<&str>,
    output: OutputMode,
    context: Option<usize>,
) -> Result<ExitCode> {
    let ops = parse_expressions(expressions)?;
    let content = read_input(file)?;

    let report = match ops.as_slice() {
        [op] if output == OutputMode::Preview => engine.preview(&content, op),
        [op] => engine.execute(&content, op),
        _ => engine.execute_batch(&content, &ops),
    };

    match output {
        OutputMode::Text => {
            if report.success() {
                print!("{}", report.modified_content());
                for warning in report.warnings() {
                    eprintln!("warning: {}", warning);
                }
            } else {
                eprintln!("Error: {}", report.error().unwrap_or("unknown error"));
            }
        }
        OutputMode::Preview => {
            let context = context.unwrap_or(config.display.context_lines);
            let use_color = DiffFormatter::should_use_color(config.display.color);
            print!("{}", DiffFormatter::format_preview(&report, context, use_color));
        }
        OutputMode::Json => {
            let json = serde_json::to_string_pretty(&report)
                .context("Failed to serialize report")?;
            println!("{}", json);
        }
    }

    Ok(if report.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn read_input(file: Option<&str>) -> Result<String> {
    match file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut content = String::new();
            io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read stdin")?;
            Ok(content)
        }
    }
}

fn validate(engine: &Engine, expression: &str) -> ExitCode {
    let checked = parse_expression(expression).and_then(|op| {
        engine.validate(&op)?;
        Ok(op)
    });

    match checked {
        Ok(op) => {
            println!("✅ Operation is valid: {}", op.kind());
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("❌ Validation failed: {}", e);
            if let Some(EngineError::InvalidPattern(pattern_error)) = e.downcast_ref::<EngineError>() {
                eprint!("{}", pattern_error.display());
            }
            ExitCode::FAILURE
        }
    }
}

fn show_config(config: &Config, action: ConfigAction) -> Result<()> {
    let config_path = config::config_file_path()?;

    if action == ConfigAction::Path {
        println!("{}", config_path.display());
        return Ok(());
    }

    println!("# {}", config_path.display());
    let toml_str = toml::to_string_pretty(config).context("Failed to serialize config")?;
    print!("{}", toml_str);

    if config.logging.debug {
        let log_path = logger::get_current_log_path(&config.logging)?;
        println!("\n# Debug log: {}", log_path.display());
    }

    Ok(())
}
