use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::net::TcpListener;

use project_tracker::api_client::ApiClient;
use project_tracker::config::{self, Config};
use project_tracker::db;
use project_tracker::http::{self, AppState};
use project_tracker::models::{NewUser, Role};
use project_tracker::telemetry::init_tracing;
use project_tracker::ui;

/// Project delivery tracker: REST server, admin tasks, and terminal client.
#[derive(Debug, Parser)]
#[command(name = "project-tracker", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run migrations and serve the REST API.
    Serve,
    /// Apply pending database migrations and exit.
    Migrate,
    /// Create an account directly in the database.
    CreateUser(CreateUserArgs),
    /// Log in against a running server and print the bearer token.
    Login(LoginArgs),
    /// Open the terminal front end.
    Tui(TuiArgs),
}

#[derive(Debug, Args)]
struct CreateUserArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long, env = "NEW_USER_PASSWORD")]
    password: String,
    /// admin, manager, developer, tester or client
    #[arg(long, default_value = "developer")]
    role: Role,
    #[arg(long)]
    title: Option<String>,
}

#[derive(Debug, Args)]
struct LoginArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    /// Overrides API_URL
    #[arg(long)]
    api_url: Option<String>,
}

#[derive(Debug, Args)]
struct TuiArgs {
    /// Overrides API_URL
    #[arg(long)]
    api_url: Option<String>,
    /// Overrides API_TOKEN
    #[arg(long)]
    token: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::init()?;

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Migrate => {
            init_tracing(&config);
            db::init(&config).await?;
            tracing::info!("migrations applied");
            Ok(())
        }
        Command::CreateUser(args) => create_user(config, args).await,
        Command::Login(args) => {
            let base = args.api_url.unwrap_or(config.api_url);
            let mut client = ApiClient::new(base);
            let response = client.login(&args.email, &args.password).await?;
            println!("{}", response.token);
            eprintln!("expires at {}", response.expires_at);
            Ok(())
        }
        Command::Tui(args) => {
            // No stdout subscriber here: log lines would corrupt the screen.
            let base = args.api_url.unwrap_or(config.api_url);
            let token = args
                .token
                .or(config.api_token)
                .context("a token is required; pass --token or set API_TOKEN")?;
            ui::run(ApiClient::new(base).with_token(token)).await
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    init_tracing(&config);
    let db = db::init(&config).await?;
    tracing::info!("database ready");

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    let state = AppState::new(db, config);
    http::serve(state, listener, shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

async fn create_user(config: Config, args: CreateUserArgs) -> Result<()> {
    init_tracing(&config);
    let db = db::init(&config).await?;
    let user = db
        .create_user(&NewUser {
            name: args.name,
            email: args.email,
            password: args.password,
            role: args.role,
            title: args.title,
        })
        .await?;
    println!("created user {} <{}> as {}", user.id, user.email, user.role.as_str());
    Ok(())
}
