//! profile-dash CLI - learner progress dashboard
//!
//! Signs in, keeps the session token on disk and renders the profile page.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use profile_dash::{
    auth::AuthClient,
    chart::Canvas,
    config::{self, DashboardConfig},
    credentials::{CredentialStore, FileCredentialStore},
    graphql::GraphQLClient,
    html,
    metrics::MetricsAggregator,
    session::{Activation, ActivationOutcome, Navigator, SessionController},
};

/// profile-dash: learner progress dashboard
#[derive(Parser, Debug)]
#[command(name = "profile-dash")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// API base URL (auth and GraphQL endpoints hang off it)
    #[arg(long, global = true, env = "PROFILE_DASH_ENDPOINT", default_value = config::DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Session token file
    #[arg(long, global = true, env = "PROFILE_DASH_SESSION")]
    session_file: Option<PathBuf>,

    /// Days a saved session stays valid
    #[arg(
        long,
        global = true,
        default_value_t = config::DEFAULT_SESSION_DAYS,
        value_parser = clap::value_parser!(i64).range(1..=config::MAX_SESSION_DAYS)
    )]
    session_days: i64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and store the session token
    Login(LoginArgs),

    /// Fetch profile metrics and write the HTML profile page
    Profile(ProfileArgs),

    /// End the session and forget the token
    Logout,

    /// Show whether a session is stored
    Status,
}

#[derive(Parser, Debug)]
struct LoginArgs {
    /// Username or email
    #[arg(short, long, env = "PROFILE_DASH_USERNAME")]
    username: String,

    /// Password
    #[arg(short, long, env = "PROFILE_DASH_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Parser, Debug)]
struct ProfileArgs {
    /// Output directory for the profile page
    #[arg(short, long, default_value = "profile")]
    output_dir: PathBuf,

    /// Page title
    #[arg(long, default_value = "Profile")]
    title: String,

    /// XP chart width
    #[arg(long, default_value_t = 600.0)]
    xp_width: f64,

    /// XP chart height
    #[arg(long, default_value_t = 300.0)]
    xp_height: f64,

    /// Audit chart width
    #[arg(long, default_value_t = 300.0)]
    audit_width: f64,

    /// Audit chart height
    #[arg(long, default_value_t = 300.0)]
    audit_height: f64,
}

/// Navigator for a terminal session: there is no history to guard, so
/// only redirects are reported
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn redirect_to_sign_in(&mut self) {
        warn!("Not signed in. Run `profile-dash login` to start a session.");
    }

    fn reassert_current_page(&mut self) {
        debug!("Keeping profile view");
    }

    fn install_history_guard(&mut self) {
        debug!("History guard not applicable in a terminal");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let mut dashboard_config = DashboardConfig::with_endpoint(&cli.endpoint)
        .with_context(|| format!("Invalid endpoint: {}", cli.endpoint))?;
    if let Some(path) = cli.session_file {
        dashboard_config.session_file = path;
    }
    dashboard_config.session_ttl = chrono::Duration::days(cli.session_days);

    match cli.command {
        Commands::Login(args) => login_command(args, &dashboard_config).await,
        Commands::Profile(args) => profile_command(args, dashboard_config).await,
        Commands::Logout => logout_command(&dashboard_config).await,
        Commands::Status => status_command(&dashboard_config),
    }
}

fn credential_store(config: &DashboardConfig) -> FileCredentialStore {
    FileCredentialStore::new(&config.session_file, config.session_ttl)
}

/// Sign in and persist the token
async fn login_command(args: LoginArgs, config: &DashboardConfig) -> Result<()> {
    let client = AuthClient::new(config)?;

    let token = match client.sign_in(&args.username, &args.password).await {
        Ok(token) => token,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    credential_store(config)
        .save(&token)
        .with_context(|| "Failed to store session token")?;

    info!("Session stored in {:?}", config.session_file);
    println!("Signed in as {}", args.username);

    Ok(())
}

/// Load the profile and write the page
async fn profile_command(args: ProfileArgs, mut config: DashboardConfig) -> Result<()> {
    config.output_dir = args.output_dir;
    config.title = args.title;
    config.xp_canvas = Canvas::new(args.xp_width, args.xp_height);
    config.audit_canvas = Canvas::new(args.audit_width, args.audit_height);

    let mut controller = SessionController::new(credential_store(&config), TerminalNavigator);
    let token = match controller.activate(Activation::FullLoad)? {
        ActivationOutcome::Redirected => anyhow::bail!("No active session"),
        ActivationOutcome::Authenticated(token) => token,
    };

    let aggregator = MetricsAggregator::new(GraphQLClient::new(&config)?);

    match aggregator.load_profile(&token).await {
        Ok(view) => {
            let path = html::write_profile_page(Ok(&view), &config)
                .with_context(|| "Failed to write profile page")?;

            println!("Login:  {}", view.login());
            println!(
                "XP:     {}",
                view.xp_display.ready().map(String::as_str).unwrap_or("Error")
            );
            println!("Audits: {}", view.audit_summary);
            for entry in view.activity() {
                println!("  - {}", entry.label());
            }

            info!("Profile page written to {:?}", path);
            Ok(())
        }
        Err(e) => {
            error!("Failed to load profile: {}", e);
            let message = e.to_string();
            let path = html::write_profile_page(Err(&message), &config)
                .with_context(|| "Failed to write profile page")?;
            info!("Error page written to {:?}", path);
            Err(e).context("Failed to load profile")
        }
    }
}

/// End the session locally and remotely
async fn logout_command(config: &DashboardConfig) -> Result<()> {
    let terminator = AuthClient::new(config)?;
    let mut controller = SessionController::new(credential_store(config), TerminalNavigator);

    controller
        .logout(&terminator)
        .await
        .with_context(|| "Failed to clear session")?;

    println!("Logged out");
    Ok(())
}

/// Report the stored session
fn status_command(config: &DashboardConfig) -> Result<()> {
    let store = credential_store(config);

    match store.read()? {
        Some(_) => {
            let expires = store
                .expires_at()?
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!("Signed in (session expires {})", expires);
        }
        None => println!("Not signed in"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_days_bounds() {
        let cli = Cli::try_parse_from(["profile-dash", "--session-days", "30", "status"]).unwrap();
        assert_eq!(cli.session_days, 30);

        for bad in ["0", "-1", "3651", "1000000000"] {
            assert!(
                Cli::try_parse_from(["profile-dash", "--session-days", bad, "status"]).is_err(),
                "accepted {}",
                bad
            );
        }
    }
}
