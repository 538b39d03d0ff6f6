use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use contentai_core::ClientContext;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "contentai")]
#[command(about = "Terminal client for the content assistant", long_about = None, version)]
struct Cli {
    /// API base URL (overrides config.json and CONTENTAI_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Directory holding config.json and credentials.json
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Sign in and remember the token
    Login {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: Option<String>,
        #[arg(long)]
        name: String,
    },
    /// Forget the stored token
    Logout,
    /// List your chat sessions, newest first
    Sessions,
    /// Print the messages of a session
    History { session_id: String },
    /// Delete a session
    Delete { session_id: String },
    /// List your brand voices
    Voices,
    /// Start an interactive chat
    Chat {
        /// Continue an existing session
        #[arg(long)]
        session: Option<String>,
        /// Brand voice id to write in
        #[arg(long)]
        voice: Option<String>,
        /// Files to attach to the first message
        #[arg(long = "attach", value_name = "PATH")]
        attachments: Vec<PathBuf>,
    },
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut builder = ClientContext::builder().base_url(cli.api_url);
    if let Some(dir) = cli.config_dir {
        builder = builder.config_dir(dir);
    }
    let ctx = builder.build()?;

    match cli.command {
        Commands::Login { email, password } => commands::auth::login(&ctx, &email, password)?,
        Commands::Register {
            email,
            password,
            name,
        } => commands::auth::register(&ctx, &email, password, &name)?,
        Commands::Logout => commands::auth::logout(&ctx)?,
        Commands::Sessions => commands::sessions::list(&ctx)?,
        Commands::History { session_id } => commands::sessions::history(&ctx, &session_id)?,
        Commands::Delete { session_id } => commands::sessions::delete(&ctx, &session_id)?,
        Commands::Voices => commands::voices::list(&ctx)?,
        Commands::Chat {
            session,
            voice,
            attachments,
        } => commands::chat::run(&ctx, session, voice, &attachments)?,
    }

    Ok(())
}
