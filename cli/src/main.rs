//! `cinetracks` command-line client.
//!
//! DESIGN
//! ======
//! Each command plays the part of one view: it builds a single
//! `SessionManager`, restores the persisted session, applies the same
//! route guard a page would, and then runs against that manager by
//! reference. Results are printed to stdout as text or pretty JSON; logs
//! go to stderr under `RUST_LOG`.

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;

use std::path::PathBuf;
use std::process::ExitCode;

use cinetracks::config::ConfigError;
use cinetracks::net::types::WatchStatus;
use cinetracks::routes::{self, Route};
use cinetracks::{CatalogClient, CatalogError, ErrorCode, SessionConfig, SessionError, SessionManager, SessionPhase};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("[{}] {}", .0.error_code(), .0.user_message())]
    Session(#[from] SessionError),
    #[error("[{}] {}", .0.error_code(), .0)]
    Catalog(#[from] CatalogError),
    #[error("not signed in; run `cinetracks login` first")]
    NotSignedIn,
    #[error("the issued session expires within the safety margin; sign in again later")]
    SessionTooShort,
    #[error("movie {0} not found")]
    MovieNotFound(u64),
    #[error("movie {0} is not on your watchlist")]
    NotOnWatchlist(String),
    #[error("refusing to delete the account without --yes")]
    ConfirmationRequired,
    #[error("invalid JSON output: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "cinetracks", about = "CineTracks account, movie, and watchlist CLI")]
struct Cli {
    #[arg(long, env = "CINETRACKS_AUTH_URL")]
    auth_url: Option<String>,

    #[arg(long, env = "CINETRACKS_CATALOG_URL")]
    catalog_url: Option<String>,

    #[arg(long, env = "CINETRACKS_STATE_DIR")]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and persist the session.
    Login {
        username: String,
        #[arg(long, env = "CINETRACKS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in to it.
    Register {
        username: String,
        #[arg(long, env = "CINETRACKS_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = "USER")]
        role: String,
    },
    /// Show the signed-in user.
    Whoami,
    /// Drop the persisted session.
    Logout,
    Profile(ProfileCommand),
    Session(SessionCommand),
    Movies(MoviesCommand),
    Watchlist(WatchlistCommand),
}

#[derive(Args, Debug)]
struct ProfileCommand {
    #[command(subcommand)]
    command: ProfileSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProfileSubcommand {
    Update {
        #[arg(long, help = "New username; defaults to the current one")]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },
    Password {
        #[arg(long, env = "CINETRACKS_NEW_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Delete {
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(Args, Debug)]
struct SessionCommand {
    #[command(subcommand)]
    command: SessionSubcommand,
}

#[derive(Subcommand, Debug)]
enum SessionSubcommand {
    /// Block until the session ends, printing phase changes.
    Watch,
}

#[derive(Args, Debug)]
struct MoviesCommand {
    #[command(subcommand)]
    command: MoviesSubcommand,
}

#[derive(Subcommand, Debug)]
enum MoviesSubcommand {
    Popular {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    Show {
        id: u64,
    },
    Search {
        query: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
}

#[derive(Args, Debug)]
struct WatchlistCommand {
    #[command(subcommand)]
    command: WatchlistSubcommand,
}

#[derive(Subcommand, Debug)]
enum WatchlistSubcommand {
    List,
    Add {
        movie_id: String,
        #[arg(long, default_value = "plan-to-watch", value_parser = parse_status)]
        status: WatchStatus,
    },
    Status {
        movie_id: String,
        #[arg(value_parser = parse_status)]
        status: WatchStatus,
    },
    Remove {
        movie_id: String,
    },
}

impl Cli {
    /// Environment config with command-line flags layered on top.
    fn config(&self) -> Result<SessionConfig, CliError> {
        let base = SessionConfig::from_env()?;
        Ok(self.apply_overrides(base))
    }

    fn apply_overrides(&self, mut config: SessionConfig) -> SessionConfig {
        if let Some(url) = non_empty(self.auth_url.as_deref()) {
            config.auth_url = url.trim_end_matches('/').to_owned();
        }
        if let Some(url) = non_empty(self.catalog_url.as_deref()) {
            config.catalog_url = url.trim_end_matches('/').to_owned();
        }
        if let Some(dir) = &self.state_dir {
            config.state_dir.clone_from(dir);
        }
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = cli.config()?;
    let session = SessionManager::from_config(&config)?;
    let phase = session.restore().await;
    tracing::debug!(phase = phase.as_str(), state_dir = %config.state_dir.display(), "session restored");

    match cli.command {
        Command::Login { username, password } => run_login(&session, &username, &password).await,
        Command::Register { username, password, role } => {
            run_register(&session, &username, &password, &role).await
        }
        Command::Whoami => run_whoami(&session),
        Command::Logout => {
            session.logout();
            println!("signed out");
            Ok(())
        }
        Command::Profile(profile) => run_profile(&session, profile).await,
        Command::Session(cmd) => match cmd.command {
            SessionSubcommand::Watch => run_session_watch(&session).await,
        },
        Command::Movies(movies) => run_movies(&session, &config, movies).await,
        Command::Watchlist(watchlist) => run_watchlist(&session, &config, watchlist).await,
    }
}

// =============================================================================
// ACCOUNT
// =============================================================================

async fn run_login(session: &SessionManager, username: &str, password: &str) -> Result<(), CliError> {
    if let Some(name) = already_signed_in(session) {
        println!("already signed in as {name}");
        return Ok(());
    }
    let route = session.login(username, password).await?;
    report_signed_in(session, route)
}

async fn run_register(session: &SessionManager, username: &str, password: &str, role: &str) -> Result<(), CliError> {
    if let Some(name) = already_signed_in(session) {
        println!("already signed in as {name}");
        return Ok(());
    }
    let route = session.register(username, password, role).await?;
    report_signed_in(session, route)
}

fn run_whoami(session: &SessionManager) -> Result<(), CliError> {
    require_view(session, Route::Profile)?;
    print_json(&serde_json::json!({
        "user": session.user(),
        "phase": session.phase().as_str(),
        "expires_at": session.expires_at(),
    }))
}

async fn run_profile(session: &SessionManager, profile: ProfileCommand) -> Result<(), CliError> {
    require_view(session, Route::Profile)?;
    let current = session.user().map(|u| u.username).unwrap_or_default();

    match profile.command {
        ProfileSubcommand::Update { username, email } => {
            let username = username.unwrap_or(current);
            session.update_user(&username, email.as_deref()).await?;
            print_json(&session.user())
        }
        ProfileSubcommand::Password { password } => {
            session.change_password(&current, &password).await?;
            println!("password changed");
            Ok(())
        }
        ProfileSubcommand::Delete { yes } => {
            if !yes {
                return Err(CliError::ConfirmationRequired);
            }
            session.delete_user().await?;
            println!("account {current} deleted");
            Ok(())
        }
    }
}

async fn run_session_watch(session: &SessionManager) -> Result<(), CliError> {
    require_view(session, Route::Dashboard)?;
    let mut rx = session.subscribe();
    let mut last = rx.borrow_and_update().phase;
    println!("{} (expires at {})", last.as_str(), session.expires_at().unwrap_or_default());

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let phase = rx.borrow_and_update().phase;
                if phase != last {
                    println!("{}", phase.as_str());
                    last = phase;
                }
                if phase == SessionPhase::Unauthenticated {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if session.expired() {
        println!("session expired; signed out");
    }
    Ok(())
}

fn report_signed_in(session: &SessionManager, route: Route) -> Result<(), CliError> {
    if route == Route::Login {
        return Err(CliError::SessionTooShort);
    }
    let name = session.user().map(|u| u.username).unwrap_or_default();
    println!("signed in as {name}; next view {}", route.path());
    Ok(())
}

// =============================================================================
// CATALOG
// =============================================================================

async fn run_movies(session: &SessionManager, config: &SessionConfig, movies: MoviesCommand) -> Result<(), CliError> {
    let catalog = CatalogClient::from_config(config)?.with_token(session.token());
    match movies.command {
        MoviesSubcommand::Popular { page } => print_json(&catalog.popular_movies(page).await?),
        MoviesSubcommand::Show { id } => {
            let details = catalog.movie_details(id).await?.ok_or(CliError::MovieNotFound(id))?;
            print_json(&details)
        }
        MoviesSubcommand::Search { query, page } => print_json(&catalog.search_movies(&query, page).await?),
    }
}

async fn run_watchlist(
    session: &SessionManager,
    config: &SessionConfig,
    watchlist: WatchlistCommand,
) -> Result<(), CliError> {
    require_view(session, Route::Dashboard)?;
    let username = session.user().map(|u| u.username).ok_or(CliError::NotSignedIn)?;
    let catalog = CatalogClient::from_config(config)?.with_token(session.token());

    match watchlist.command {
        WatchlistSubcommand::List => print_json(&catalog.movie_watchlist(&username).await?),
        WatchlistSubcommand::Add { movie_id, status } => {
            print_json(&catalog.add_to_watchlist(&username, &movie_id, status).await?)
        }
        WatchlistSubcommand::Status { movie_id, status } => {
            let entry = catalog
                .update_watch_status(&username, &movie_id, status)
                .await?
                .ok_or(CliError::NotOnWatchlist(movie_id))?;
            print_json(&entry)
        }
        WatchlistSubcommand::Remove { movie_id } => {
            catalog.remove_from_watchlist(&username, &movie_id).await?;
            println!("removed {movie_id}");
            Ok(())
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Apply the view guard for `route`; a redirect to login means the command
/// cannot run.
fn require_view(session: &SessionManager, route: Route) -> Result<(), CliError> {
    match routes::guard(route, &session.state()) {
        Some(Route::Login) => Err(CliError::NotSignedIn),
        _ => Ok(()),
    }
}

fn already_signed_in(session: &SessionManager) -> Option<String> {
    match routes::guard(Route::Login, &session.state()) {
        Some(_) => session.user().map(|u| u.username),
        None => None,
    }
}

fn parse_status(raw: &str) -> Result<WatchStatus, String> {
    WatchStatus::parse(raw)
        .ok_or_else(|| format!("expected plan-to-watch, watching, completed, or dropped; got `{raw}`"))
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|v| !v.is_empty())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
