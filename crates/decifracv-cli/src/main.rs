//! DecifraCV CLI - a command-line shell for the DecifraCV resume-parsing API.
//!
//! Plays the part of the browser shell: it owns the login entry point,
//! listens for the session ending, and keeps protected views behind the
//! route guard.

mod commands;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use decifracv_core::auth::{Credential, LoginRequired};
use decifracv_core::{App, Config};

/// Exit status when the user has to log in first
const EXIT_LOGIN_REQUIRED: u8 = 2;

#[derive(Parser)]
#[command(name = "decifracv", version, about = "Command-line client for the DecifraCV resume-parsing API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// End the current session
    Logout,
    /// Show which credential requests are sent with
    Status,
    /// Register a company and print its API key
    RegisterCompany {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// Register a user under the company identified by DECIFRACV_API_KEY
    RegisterUser {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    /// List processed resumes
    History,
    /// Search processed resumes
    Search {
        #[arg(long)]
        skills: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        city: Option<String>,
        #[arg(long)]
        confidence_min: Option<f64>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Upload a resume for parsing
    Parse { file: PathBuf },
    /// List registered companies
    Companies,
    /// List users of the company
    Users,
    /// Send a raw API request, e.g. `request GET /history`
    Request {
        method: String,
        path: String,
        /// JSON request body
        #[arg(long)]
        json: Option<String>,
        /// Extra header as `Name: value`, repeatable
        #[arg(long = "header")]
        headers: Vec<String>,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load()?;
    let app = App::new(config)?;
    info!(authenticated = app.is_authenticated(), "DecifraCV CLI starting");

    // The shell's "navigation": remember that the user has to log in again
    let session_ended = Arc::new(AtomicBool::new(false));
    let flag = session_ended.clone();
    app.session.on_login_required(move |reason| {
        if reason == LoginRequired::Unauthorized {
            flag.store(true, Ordering::SeqCst);
        }
    });

    // The credential the command starts under decides how a 401 is explained
    let credential = app.gateway.strategy().current();
    let result = commands::dispatch(app, cli.command).await;

    if session_ended.load(Ordering::SeqCst) {
        eprintln!("{}", rejection_message(&credential));
        return Ok(ExitCode::from(EXIT_LOGIN_REQUIRED));
    }
    result
}

fn rejection_message(credential: &Credential) -> &'static str {
    match credential {
        Credential::Bearer(_) => {
            "Your session is no longer valid. Run `decifracv login` to sign in again."
        }
        Credential::ApiKey(_) => {
            "The server rejected the company API key. Check DECIFRACV_API_KEY or run `decifracv login`."
        }
        Credential::Anonymous => "This request needs credentials. Run `decifracv login` first.",
    }
}
