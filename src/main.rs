use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;

use recipe_api::{actions, config::Config, connection, server, state::AppState};

#[derive(Parser, Debug)]
#[command(name = "recipe-api", version, about = "Recipe management REST API")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending migrations and serve the API (default).
    Serve,
    /// Apply pending migrations and exit.
    Migrate,
    /// Create an administrator account.
    CreateSuperuser {
        #[arg(long, env = "SUPERUSER_EMAIL")]
        email: String,
        #[arg(long, env = "SUPERUSER_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = "")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;
    info!("Loaded configuration: {config:?}");

    let pool = connection::connect(&config)
        .await
        .context("Failed to connect to database")?;
    connection::migrate(&pool)
        .await
        .context("Failed to run migrations")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let state = AppState::new(pool, config)?;
            server::start_server(state)
                .await
                .context("Failed to start server")?;
        }
        Command::Migrate => info!("Migrations are up to date"),
        Command::CreateSuperuser {
            email,
            password,
            name,
        } => {
            let user = actions::create_superuser(&pool, &email, &password, &name).await?;
            info!("Created superuser {}", user.email);
        }
    }

    Ok(())
}
