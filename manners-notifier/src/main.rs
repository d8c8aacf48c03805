use clap::{Parser, Subcommand, ValueEnum};
use manners_notifier::{
    AppConfig, ApiClient, ApiConfig, CachedCatalog, Credentials, FixedLocation, GeoPoint, LevelProgress, LogDispatcher,
    NotificationSelector, NotifierError, PlacesClient, Poller, Result, SessionStore, TickOutcome, UserOut,
    VotePayload,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "manners-notifier", about = "Everyday manners trivia, delivered near the places they apply to")]
struct Cli {
    /// Base URL of the trivia API (overrides API_BASE_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Session database URL (overrides SESSION_DB)
    #[arg(long, global = true)]
    session_db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an account and log in with it
    Register {
        #[arg(long)]
        user: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm: String,
    },
    Login {
        #[arg(long)]
        user: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List all trivia items
    List,
    /// Show one trivia item with its vote statistics
    Show { id: i64 },
    /// Say whether you already knew a fact
    Vote { id: i64, choice: VoteChoice },
    Stats { id: i64 },
    /// Facts you have voted on
    History,
    /// Your level and progress to the next one
    Level,
    /// Watch nearby places and send trivia notifications
    Poll {
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
        #[arg(long, requires = "lng", allow_negative_numbers = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lng: Option<f64>,
        /// Seconds between cycles
        #[arg(long)]
        interval: Option<u64>,
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum VoteChoice {
    Known,
    Unknown,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("Command failed: {}", e);
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::from_env()?;
    if let Some(api_url) = &cli.api_url {
        let timeout_seconds = config.api.timeout_seconds;
        config.api = ApiConfig::with_base_url(api_url)?;
        config.api.timeout_seconds = timeout_seconds;
    }
    if let Some(session_db) = cli.session_db {
        config.session_db = session_db;
    }

    let api = ApiClient::new(config.api.clone())?;
    let session = SessionStore::open(&config.session_db).await?;
    info!("Using API at {}", api.base_url());

    match cli.command {
        Command::Register { user, password, confirm } => {
            let credentials = Credentials::for_registration(&user, &password, &confirm)?;
            let user = api.register(&credentials).await?;
            session.save_user(&user).await?;
            println!("Registered and logged in as {} (ID {})", user.user_name, user.user_id);
        }
        Command::Login { user, password } => {
            let credentials = Credentials::for_login(&user, &password)?;
            let user = api.login(&credentials).await?;
            session.save_user(&user).await?;
            println!("Welcome, {}!", user.user_name);
        }
        Command::Logout => {
            session.logout().await?;
            println!("Logged out");
        }
        Command::Whoami => match session.current_user().await? {
            Some(user) => println!("{} (ID {})", user.user_name, user.user_id),
            None => println!("Not logged in"),
        },
        Command::List => {
            for item in api.list_trivia().await? {
                let genres: Vec<&str> = item.categories.iter().map(String::as_str).collect();
                println!(
                    "#{:<4} [level {}] {} ({})",
                    item.id,
                    item.difficulty_level,
                    item.title,
                    genres.join(", ")
                );
            }
        }
        Command::Show { id } => {
            let item = api.get_trivia(id).await?;
            println!("#{} {}\n\n{}\n", item.id, item.title, item.content);
            print_stats(&api, id).await?;
            if let Some(user) = session.current_user().await? {
                match api.check_vote(user.user_id, id).await? {
                    Some(vote) if vote.recognized => println!("You voted: knew it"),
                    Some(_) => println!("You voted: did not know it"),
                    None => println!("You have not voted on this one yet"),
                }
            }
        }
        Command::Vote { id, choice } => {
            let user = require_user(&session).await?;
            let recognized = matches!(choice, VoteChoice::Known);
            api.vote(&VotePayload {
                user_id: user.user_id,
                trivia_item_id: id,
                recognized,
            })
            .await?;
            println!("Vote recorded: {}", if recognized { "knew it" } else { "did not know it" });
            print_stats(&api, id).await?;
        }
        Command::Stats { id } => print_stats(&api, id).await?,
        Command::History => {
            let user = require_user(&session).await?;
            let votes = api.user_votes(user.user_id).await?;
            if votes.is_empty() {
                println!("No votes yet");
            }
            for vote in votes {
                let mark = if vote.recognized { "knew it" } else { "did not know" };
                println!("#{:<4} {} [{}]\n      {}", vote.common_sense_id, vote.title, mark, vote.content);
            }
        }
        Command::Level => {
            let user = require_user(&session).await?;
            let level = api.user_level(user.user_id).await?;
            let progress = LevelProgress::from(&level);
            println!("Level {} ({} points)", progress.user_level, progress.level_sum);
            println!(
                "{} more points to level {} ({:.0}%)",
                progress.remaining,
                progress.user_level + 1,
                progress.progress * 100.0
            );
        }
        Command::Poll { once, lat, lng, interval, seed } => {
            if let (Some(lat), Some(lng)) = (lat, lng) {
                config.location = Some(GeoPoint { lat, lng });
            }
            if let Some(interval) = interval {
                config.poll.interval_seconds = interval;
            }
            if seed.is_some() {
                config.poll.rng_seed = seed;
            }
            config.validate()?;
            poll(config, api, once).await?;
        }
    }

    Ok(())
}

async fn require_user(session: &SessionStore) -> Result<UserOut> {
    session.current_user().await?.ok_or(NotifierError::NotLoggedIn)
}

async fn print_stats(api: &ApiClient, id: i64) -> Result<()> {
    let stats = api.vote_stats(id).await?;
    match stats.known_ratio() {
        Some(ratio) => println!(
            "Knew it: {}  Did not know: {}  ({:.0}% knew)",
            stats.known,
            stats.unknown,
            ratio * 100.0
        ),
        None => println!("No votes yet"),
    }
    Ok(())
}

async fn poll(config: AppConfig, api: ApiClient, once: bool) -> Result<()> {
    let selector = NotificationSelector::new(config.selector.clone())?;
    let places = PlacesClient::new(config.places.clone())?;

    let mut poller = Poller::new(
        Arc::new(FixedLocation::new(config.location)),
        Arc::new(places),
        Arc::new(CachedCatalog::new(api)),
        Arc::new(LogDispatcher),
        selector,
    )
    .with_interval(Duration::from_secs(config.poll.interval_seconds))
    .with_radius(config.places.radius_m);
    if let Some(seed) = config.poll.rng_seed {
        poller = poller.with_seed(seed);
    }
    let poller = Arc::new(poller);

    if once {
        poller.ensure_notification_permission().await;
        return match poller.tick().await {
            TickOutcome::Aborted { phase, reason } => {
                Err(NotifierError::General(format!("poll aborted while {}: {}", phase, reason)))
            }
            TickOutcome::PermissionDenied(kind) => Err(NotifierError::PermissionDenied {
                what: format!("{:?}", kind),
            }),
            _ => Ok(()),
        };
    }

    let (refresh_tx, refresh_rx) = mpsc::channel::<()>(1);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Any line on stdin asks for an immediate refresh
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            if refresh_tx.try_send(()).is_err() {
                warn!("Refresh already pending, ignoring");
            }
        }
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    poller.run(refresh_rx, shutdown_rx).await;
    Ok(())
}
