use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use smartshield_client::services::users;
use smartshield_client::state::guard;
use smartshield_client::validation::{self, SignupForm, ValidationError};
use smartshield_client::net::types::Envelope;
use smartshield_client::{
    AuthFacade, ClientConfig, ConfigError, CredentialStore, RequestError, RequestGateway, SessionContext, SessionState,
};


const REDACTED: &str = "[redacted]";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("client setup failed: {0}")]
    Setup(#[from] RequestError),
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Rejected(String),
    #[error("not signed in")]
    NotSignedIn,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "smartshield", about = "SmartShield session and API command-line client")]
struct Cli {
    #[arg(long, env = "SMARTSHIELD_API_URL")]
    base_url: Option<String>,

    #[arg(long, env = "SMARTSHIELD_CREDENTIAL_FILE")]
    credential_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an account and sign in with it.
    Signup(SignupArgs),
    /// Sign in and store the issued credential.
    Login(LoginArgs),
    /// Sign out and clear the stored credential.
    Logout,
    /// Exchange the refresh cookie for a new credential.
    Refresh,
    /// Raw `/auth/me` envelope.
    Me,
    /// Resolve the session and report who is signed in.
    Status,
    /// Stored video history.
    Videos,
    /// Video analysis history.
    Analysis,
}

#[derive(Args, Debug)]
struct LoginArgs {
    #[arg(long)]
    email: String,
    #[arg(long, env = "SMARTSHIELD_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args, Debug)]
struct SignupArgs {
    #[arg(long)]
    email: String,
    #[arg(long, env = "SMARTSHIELD_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long)]
    password_confirm: String,
    #[arg(long, default_value = "")]
    name: String,
    #[arg(long, default_value = "")]
    phone_number: String,
    #[arg(long, default_value = "")]
    management_code: String,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // A missing .env file is the normal case.
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        eprintln!("ignoring unreadable .env: {e}");
    }
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let session = build_session(&cli)?;

    match cli.command {
        Command::Signup(args) => run_signup(&session, args).await,
        Command::Login(args) => run_login(&session, args).await,
        Command::Logout => {
            let response = session.logout().await;
            print_envelope(&response)
        }
        Command::Refresh => {
            let response = session.auth().refresh_token().await;
            print_envelope(&response)
        }
        Command::Me => {
            let response = session.auth().current_user().await;
            print_envelope(&response)
        }
        Command::Status => run_status(&session).await,
        Command::Videos => {
            let response = users::fetch_videos(session.auth().gateway()).await;
            print_envelope(&response)
        }
        Command::Analysis => {
            let response = users::fetch_analysis(session.auth().gateway()).await;
            print_envelope(&response)
        }
    }
}

fn build_session(cli: &Cli) -> Result<SessionContext, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url)?;
    }
    if let Some(path) = &cli.credential_file {
        config.credential_file.clone_from(path);
    }
    tracing::debug!(base_url = %config.base_url, credential_file = %config.credential_file.display(), "client configured");

    let store = CredentialStore::file(&config.credential_file);
    let gateway = RequestGateway::from_config(&config, store)?;
    Ok(SessionContext::new(AuthFacade::new(gateway)))
}

async fn run_login(session: &SessionContext, args: LoginArgs) -> Result<(), CliError> {
    let request = validation::validate_login(&args.email, &args.password)?;
    let response = session.login(&request).await;
    print_envelope(&response)?;
    report_state(&session.state())
}

async fn run_signup(session: &SessionContext, args: SignupArgs) -> Result<(), CliError> {
    let form = SignupForm {
        email: args.email,
        password: args.password,
        password_confirm: args.password_confirm,
        name: args.name,
        phone_number: args.phone_number,
        management_code: args.management_code,
    };
    let request = form.validate()?;
    let response = session.signup(&request).await;
    print_envelope(&response)
}

async fn run_status(session: &SessionContext) -> Result<(), CliError> {
    session.mount().await;
    let state = guard::settled(session.subscribe()).await;
    report_state(&state)
}

fn report_state(state: &SessionState) -> Result<(), CliError> {
    if let Some(target) = guard::redirect_target(state) {
        eprintln!("no active session; sign in first ({target})");
        return Err(CliError::NotSignedIn);
    }
    if let Some(user) = &state.user {
        print_json(user)?;
    }
    Ok(())
}

fn print_envelope<E: Envelope + Serialize>(envelope: &E) -> Result<(), CliError> {
    print_json(&redacted(envelope)?)?;
    if envelope.is_success() {
        Ok(())
    } else {
        Err(CliError::Rejected(envelope.message().to_owned()))
    }
}

/// JSON rendering of `envelope` with any issued credential masked.
fn redacted<E: Serialize>(envelope: &E) -> Result<serde_json::Value, CliError> {
    let mut rendered = serde_json::to_value(envelope)?;
    if let Some(token) = rendered.get_mut("accessToken") {
        *token = serde_json::Value::String(REDACTED.to_owned());
    }
    Ok(rendered)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
