#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::uninlined_format_args)]

use clap::{Parser, Subcommand};
use std::io::IsTerminal;
use tokio::io::AsyncReadExt;
use tracing_subscriber::{fmt, EnvFilter};

use gptcli::config::Config;
use gptcli::conversation::Overrides;
use gptcli::error::Result;
use gptcli::run::RunRequest;
use gptcli::{providers, run, sessions};

fn parse_temperature(s: &str) -> std::result::Result<f64, String> {
    let t: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if !(0.0..=2.0).contains(&t) {
        return Err("temperature must be between 0.0 and 2.0".to_string());
    }
    Ok(t)
}

/// One-shot chat-completion CLI with optional saved conversation state.
#[derive(Parser, Debug)]
#[command(name = "gptcli")]
#[command(version)]
#[command(about = "One-shot chat CLI with optional saved conversation state.", long_about = "\
One-shot chat CLI with optional saved conversation state.

Runs once and prints the assistant reply to stdout. No menus, no REPL.

Examples:
  gptcli --new -p \"Answer this question...\"     # ephemeral, not saved
  gptcli -p \"Answer question 2\" -s chat          # continue session 'chat'
  echo \"Analyze this report\" | gptcli -s chat    # prompt from stdin
  gptcli -p \"Summarize\" --stdin < report.txt     # inline prompt + stdin")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Prompt text; if omitted, read from stdin
    #[arg(short, long)]
    prompt: Option<String>,

    /// Append piped stdin to the inline prompt
    #[arg(long = "stdin")]
    append_stdin: bool,

    /// Session name (stored in the state directory); defaults to the last
    /// session used
    #[arg(short, long)]
    session: Option<String>,

    /// One-off run: no state read or written
    #[arg(long)]
    new: bool,

    /// System prompt override
    #[arg(long)]
    system: Option<String>,

    /// Model override
    #[arg(long)]
    model: Option<String>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(short, long, value_parser = parse_temperature)]
    temperature: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List saved sessions and exit
    Ls,
    /// Delete a saved session and exit
    Rm {
        /// Session name to delete
        name: String,
    },
    /// Rename a saved session and exit
    Rename {
        /// Existing session name
        old: String,
        /// New name for the session
        new: String,
    },
}

#[tokio::main]
async fn main() {
    let code = match try_main().await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("gptcli: {e}");
            e.exit_code()
        }
    };
    std::process::exit(code);
}

async fn try_main() -> Result<()> {
    let cli = Cli::parse();

    // Logging goes to stderr so stdout carries only the reply.
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let mut config = Config::load_or_init().await?;
    config.apply_env_overrides();

    if let Some(command) = cli.command {
        return handle_command(command, &config).await;
    }

    // Credential check precedes any session work.
    let provider = providers::create_provider(&config, None)?;
    let store = sessions::create_session_store(&config.state_dir).await?;

    let piped = read_piped_stdin(cli.prompt.is_none() || cli.append_stdin).await?;

    let request = RunRequest {
        prompt: cli.prompt,
        piped,
        append_stdin: cli.append_stdin,
        session: cli.session,
        ephemeral: cli.new,
        overrides: Overrides {
            system_prompt: cli.system,
            model: cli.model,
            temperature: cli.temperature,
        },
    };

    let reply = run::run(&config, store.as_ref(), provider.as_ref(), request).await?;
    println!("{reply}");
    Ok(())
}

async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    let store = sessions::create_session_store(&config.state_dir).await?;

    match command {
        Commands::Ls => {
            let mut names = store.list().await?;
            if names.is_empty() {
                println!("No saved sessions.");
                return Ok(());
            }
            names.sort_by_key(|name| name.to_lowercase());
            for name in names {
                println!("{name}");
            }
        }
        Commands::Rm { name } => {
            let name = sessions::sanitize_name(&name)?;
            store.delete(&name).await?;
            println!("Deleted session '{name}'.");
        }
        Commands::Rename { old, new } => {
            let old = sessions::sanitize_name(&old)?;
            let new = sessions::sanitize_name(&new)?;
            store.rename(&old, &new).await?;
            println!("Renamed '{old}' -> '{new}'.");
        }
    }
    Ok(())
}

/// Read piped stdin when this invocation wants it and stdin is not a
/// terminal.
async fn read_piped_stdin(wanted: bool) -> Result<Option<String>> {
    if !wanted || std::io::stdin().is_terminal() {
        return Ok(None);
    }
    let mut buf = String::new();
    tokio::io::stdin().read_to_string(&mut buf).await?;
    Ok(Some(buf))
}
