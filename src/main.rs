use std::path::PathBuf;

use clap::{Parser, Subcommand};

use jwt_auth::cli::commands;
use jwt_auth::cli::output::print_error;

#[derive(Parser)]
#[command(name = "jwt-auth", version, about = "OAuth2 PKCE login and bearer-token session helper")]
struct Cli {
    /// Settings file (defaults to ~/.jwt-auth/config.json)
    #[arg(long, global = true, env = "JWT_AUTH_CONFIG")]
    config: Option<PathBuf>,

    /// Report errors as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a PKCE verifier, challenge and state
    Pkce,

    /// Print the authorization redirect URL
    Url {
        /// OAuth client id (overrides settings)
        #[arg(long)]
        client_id: Option<String>,

        /// Redirect URI, substituted as given
        #[arg(long)]
        redirect_uri: Option<String>,

        /// Precomputed code challenge
        #[arg(long)]
        challenge: Option<String>,

        /// Precomputed state
        #[arg(long)]
        state: Option<String>,
    },

    /// Log in through the browser and store the token pair
    Login,

    /// Show the stored tokens and decoded claims
    Status,

    /// Remove the stored tokens
    Logout,

    /// Send an authenticated GET, refreshing the token on 401
    Request {
        /// Target URL
        url: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("JWT_AUTH_LOG_LEVEL")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json_mode = cli.json;

    if let Err(e) = run(cli).await {
        print_error(&e, json_mode);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), jwt_auth::AuthError> {
    let settings = || jwt_auth::load_settings(cli.config.as_deref());
    match cli.command {
        Commands::Pkce => commands::run_pkce().await,
        Commands::Url {
            client_id,
            redirect_uri,
            challenge,
            state,
        } => {
            commands::run_url(
                &settings()?,
                client_id.as_deref(),
                redirect_uri.as_deref(),
                challenge.as_deref(),
                state.as_deref(),
            )
            .await
        }
        Commands::Login => commands::run_login_command(settings()?).await,
        Commands::Status => commands::run_status(settings()?),
        Commands::Logout => commands::run_logout(settings()?),
        Commands::Request { url } => commands::run_request(settings()?, &url).await,
    }
}
