//! MI Bridge
//!
//! Command line front end for the GDB/MI protocol engine.
//!
//! Usage:
//!   Decode a captured MI transcript:
//!   ```text
//!   gdb --interpreter=mi2 ./a.out < cmds | mi-bridge parse --json
//!   ```
//!   Ask which command text a backend expects:
//!   ```text
//!   mi-bridge command --gdb-version "GNU gdb 6.3.50 (Apple version gdb-1708)" --platform macos-x86 exec-finish 1
//!   ```

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use gdb_mi_bridge::gdb::{GdbEvent, MiCommand, MiParser, Peculiarity, Platform, RecordKind};
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mi-bridge", version, about = "GDB/MI record parser and command resolver")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse MI output lines read from stdin
    Parse {
        /// Charset of octal-escaped strings
        #[arg(long, env = "MI_BRIDGE_ENCODING", default_value = "utf-8")]
        encoding: String,
        /// Print records as JSON lines
        #[arg(long)]
        json: bool,
        /// Log the session event each record maps to
        #[arg(long)]
        events: bool,
    },
    /// Print the command text for a logical operation
    Command {
        /// `--version` banner or plain `major.minor`
        #[arg(long = "gdb-version", default_value = "6.8")]
        gdb_version: String,
        /// Backend platform, defaults to the host
        #[arg(long, env = "MI_BRIDGE_PLATFORM")]
        platform: Option<Platform>,
        /// Backend is lldb-mi
        #[arg(long)]
        lldb: bool,
        /// Operation name, e.g. exec-step or var-list-children
        operation: String,
        /// Operation arguments
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize logging to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    debug!("Arguments: {:?}", cli);

    match cli.command {
        Commands::Parse {
            encoding,
            json,
            events,
        } => {
            run_parse(&encoding, json, events).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Command {
            gdb_version,
            platform,
            lldb,
            operation,
            args,
        } => run_command(&gdb_version, platform, lldb, &operation, &args),
    }
}

/// Parse stdin line by line, one record per line on stdout
async fn run_parse(encoding: &str, json: bool, events: bool) -> Result<()> {
    let parser = MiParser::with_encoding(encoding)?;
    info!("Parsing MI output ({})", parser.decoder().encoding_name());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut count = 0usize;

    while let Some(line) = lines.next_line().await? {
        let record = parser.parse_line(&line);
        count += 1;

        if record.kind() == RecordKind::Malformed {
            warn!("Line {} is not MI output: {}", count, line);
        }
        if events {
            if let Some(event) = GdbEvent::from_record(&record) {
                info!("Event: {:?}", event);
            }
        }

        let rendered = if json {
            serde_json::to_string(&record)?
        } else {
            format!("{:<14} {}", format!("{:?}", record.kind()), record)
        };
        stdout.write_all(rendered.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
    }

    stdout.flush().await?;
    info!("Parsed {} lines", count);
    Ok(())
}

fn run_command(
    gdb_version: &str,
    platform: Option<Platform>,
    lldb: bool,
    operation: &str,
    args: &[String],
) -> Result<ExitCode> {
    let platform = platform.unwrap_or_else(Platform::current);
    let peculiarity = Peculiarity::from_banner(gdb_version, platform, lldb);
    let command = build_command(operation, args)?;

    match peculiarity.try_command(&command) {
        Ok(text) => {
            println!("{}", text);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Map an operation name and its positional arguments to a command
fn build_command<'a>(operation: &str, args: &'a [String]) -> Result<MiCommand<'a>> {
    let arg = move |index: usize| {
        args.get(index)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("{} expects argument #{}", operation, index + 1))
    };

    let command = match operation {
        "environment-cd" => MiCommand::EnvironmentCd,
        "exec-step" => MiCommand::ExecStep { thread: arg(0)? },
        "exec-next" => MiCommand::ExecNext { thread: arg(0)? },
        "exec-step-instruction" => MiCommand::ExecStepInstruction { thread: arg(0)? },
        "exec-next-instruction" => MiCommand::ExecNextInstruction { thread: arg(0)? },
        "exec-finish" => MiCommand::ExecFinish { thread: arg(0)? },
        "var-list-children" => MiCommand::VarListChildren {
            var: arg(0)?,
            from: arg(1)?.parse()?,
            to: arg(2)?.parse()?,
        },
        "var-create" => MiCommand::VarCreate {
            expr: arg(0)?,
            thread: arg(1)?,
            frame: arg(2)?,
        },
        "var-show-attributes" => MiCommand::VarShowAttributes { var: arg(0)? },
        "stack-list-frames" => MiCommand::StackListFrames { thread: arg(0)? },
        "stack-list-locals" => MiCommand::StackListLocals,
        other => bail!("Unknown operation: {}", other),
    };
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_command() {
        let args = strings(&["var0", "1", "100"]);
        assert_eq!(
            build_command("var-list-children", &args).unwrap(),
            MiCommand::VarListChildren {
                var: "var0",
                from: 1,
                to: 100
            }
        );
        assert_eq!(
            build_command("environment-cd", &[]).unwrap(),
            MiCommand::EnvironmentCd
        );
    }

    #[test]
    fn test_build_command_errors() {
        assert!(build_command("exec-step", &[]).is_err());
        assert!(build_command("var-list-children", &strings(&["v", "x", "1"])).is_err());
        assert!(build_command("exec-jump", &strings(&["1"])).is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "mi-bridge",
            "command",
            "--gdb-version",
            "7.0",
            "--platform",
            "solaris-x86",
            "exec-step",
            "0",
        ])
        .unwrap();
        match cli.command {
            Commands::Command {
                platform, operation, ..
            } => {
                assert_eq!(platform, Some(Platform::SolarisX86));
                assert_eq!(operation, "exec-step");
            }
            other => panic!("Expected command subcommand, got {:?}", other),
        }
    }
}
