use std::sync::Arc;

use clap::{Parser, Subcommand};
use entertainarr_client::{
    App, AuthApi, ClientConfig, ConfigError, Decision, HttpAuthApi, MemoryNavigator, Navigator, RenderMode, ScreenId,
};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("username must not be empty")]
    EmptyUsername,
    #[error("login failed: {0}")]
    Login(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "entertainarr-client", about = "Session-gated entertainarr client")]
struct Cli {
    #[arg(long, env = "ENTERTAINARR_BASE_URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the signed-in identity.
    Me,
    /// Resolve what a screen shows for the current session.
    Visit { screen: String },
    /// Log in, then land on the screen that asked for it.
    Login {
        username: String,
        #[arg(long)]
        return_to: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url.trim().trim_end_matches('/').to_owned();
    }
    let api: Arc<dyn AuthApi> = Arc::new(HttpAuthApi::new(&config)?);

    match cli.command {
        Command::Me => {
            let (app, _) = mount(config.clone(), api, config.home_screen.clone());
            let state = app.session().resolve().await;
            match state.identity {
                Some(identity) => println!("{}", serde_json::to_string_pretty(identity.as_ref())?),
                None => println!("not authenticated"),
            }
        }
        Command::Visit { screen } => {
            let (app, navigator) = mount(config, api, ScreenId::new(screen));
            let decision = app.settle().await;
            println!("{} {}", navigator.current(), describe(&decision));
        }
        Command::Login { username, return_to } => {
            let username = username.trim().to_owned();
            if username.is_empty() {
                return Err(CliError::EmptyUsername);
            }
            let start = return_to.map_or_else(|| config.home_screen.clone(), ScreenId::new);
            let (app, navigator) = mount(config, api, start);
            app.settle().await;

            let login = app.login_controller();
            login.submit(&username).await;
            if let Some(error) = login.attempt().error {
                return Err(CliError::Login(error.message()));
            }

            let decision = app.settle().await;
            println!("{} {}", navigator.current(), describe(&decision));
            if let Some(identity) = app.session().peek().identity {
                println!("{}", serde_json::to_string_pretty(identity.as_ref())?);
            }
        }
    }
    Ok(())
}

fn mount(config: ClientConfig, api: Arc<dyn AuthApi>, screen: ScreenId) -> (App, Arc<MemoryNavigator>) {
    let navigator = Arc::new(MemoryNavigator::new(screen));
    let app = App::new(config, api, Arc::clone(&navigator) as Arc<dyn Navigator>, RenderMode::Client);
    (app, navigator)
}

fn describe(decision: &Decision) -> String {
    match decision {
        Decision::Loading => "loading".to_owned(),
        Decision::Render => "render".to_owned(),
        Decision::Redirecting { target } => format!("redirect -> {target}"),
    }
}
