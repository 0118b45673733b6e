use clap::{Parser, Subcommand};
use datatalk_core::config::DEFAULT_CONFIG_PATH;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod render;

#[derive(Parser, Debug)]
#[command(name = "datatalk", version, about = "Invoice questions answered through guarded SQL")]
struct Cli {
    /// Configuration file
    #[arg(long, short = 'c', global = true, env = "DATATALK_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server.
    Serve {
        /// Override `server.bind` from the configuration
        #[arg(long)]
        bind: Option<String>,
    },

    /// List the registered intents.
    Intents,

    /// Generate and validate the statement for an intent without touching the database.
    Explain {
        /// Intent key or alias
        intent: String,

        /// Parameter as name=value (repeatable)
        #[arg(short = 'p', long = "param", value_parser = commands::parse_param)]
        params: Vec<(String, String)>,

        /// Evaluate date defaults as of this day (YYYY-MM-DD)
        #[arg(long)]
        today: Option<chrono::NaiveDate>,
    },

    /// Show how the vocabulary reads an utterance.
    Classify {
        utterance: String,
    },

    /// Resolve one question against the database and print the result.
    Ask {
        utterance: String,

        /// Who is asking (recorded in the audit trail)
        #[arg(long, default_value = "cli")]
        user: String,

        /// Intent key; omit to classify the utterance
        #[arg(long, default_value = "")]
        intent: String,

        /// Parameter as name=value (repeatable)
        #[arg(short = 'p', long = "param", value_parser = commands::parse_param)]
        params: Vec<(String, String)>,

        /// Maximum rows shown in the table
        #[arg(long, default_value_t = 20)]
        max_rows: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Serve { bind } => commands::serve::run(&cli.config, bind).await?,
        Command::Intents => commands::intents::run(&cli.config)?,
        Command::Explain {
            intent,
            params,
            today,
        } => commands::explain::run(&cli.config, &intent, params, today)?,
        Command::Classify { utterance } => commands::classify::run(&utterance),
        Command::Ask {
            utterance,
            user,
            intent,
            params,
            max_rows,
        } => commands::ask::run(&cli.config, &user, &intent, &utterance, params, max_rows).await?,
    }

    Ok(())
}
