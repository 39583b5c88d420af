//! # PawRescue CLI
//!
//! The entry point that assembles the session and report client from
//! configuration and compile-time features. Each invocation restores the
//! session persisted by the previous one.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use configs::{LogSettings, PasswordScheme, Settings};
use paw_auth_digest::{Argon2Hasher, Sha256Hasher};
use paw_core::{
    AuthSession, Coordinate, CredentialStore, NotificationPrefs, NotificationPrefsStore, PasswordHasher,
    SessionState,
};
use paw_db_sqlite::SqliteStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "reports-rest")]
use paw_core::{AnimalStatus, Report, ReportCategory, ReportClient};
#[cfg(feature = "reports-rest")]
use paw_reports_rest::PostgrestReportClient;

#[derive(Parser)]
#[command(name = "pawrescue")]
#[command(about = "Accounts, session and animal sighting reports for PawRescue")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./pawrescue.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging, overrides RUST_LOG and log.filter
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and log in
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Log in to an existing account
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Use the app without an account
    Guest,

    /// Forget the saved session
    Logout,

    /// Show the restored session state
    Status,

    /// Local account administration
    Users {
        #[command(subcommand)]
        action: UsersCommand,
    },

    /// Nearby-report alerts for the logged-in account
    Notify {
        #[command(subcommand)]
        action: NotifyCommand,
    },

    /// Remote sighting reports
    #[cfg(feature = "reports-rest")]
    Reports {
        #[command(subcommand)]
        action: ReportsCommand,
    },
}

#[derive(Subcommand)]
enum UsersCommand {
    /// List every local account
    List,
    /// Delete every local account
    Reset,
}

#[derive(Subcommand)]
enum NotifyCommand {
    /// Print the saved settings
    Show,
    /// Turn alerts on
    On,
    /// Turn alerts off
    Off,
    /// Alert radius in miles, clamped to 0..=50
    Radius { miles: f64 },
    /// Point the radius is measured from
    #[command(allow_negative_numbers = true)]
    Center { lat: f64, lon: f64 },
    /// Forget the center point
    ClearCenter,
    /// Remote reports that fall inside the alert radius
    #[cfg(feature = "reports-rest")]
    Nearby,
}

#[cfg(feature = "reports-rest")]
#[derive(Subcommand)]
enum ReportsCommand {
    /// Newest first; all categories unless --category is given
    List {
        /// found, lost, injured or wild
        #[arg(long)]
        category: Option<ReportCategory>,
        /// Only reports that can be pinned on a map
        #[arg(long)]
        located: bool,
    },

    /// File a new sighting
    Create {
        #[arg(long)]
        category: ReportCategory,
        #[arg(long)]
        animal: String,
        /// Safe/Contained, Injured, Aggressive, Deceased or Other
        #[arg(long)]
        status: AnimalStatus,
        #[arg(long, default_value = "")]
        color: String,
        #[arg(long, default_value = "")]
        landmark: String,
        #[arg(long, default_value = "")]
        description: String,
        /// RFC 3339 timestamp; defaults to now
        #[arg(long)]
        incident: Option<DateTime<Utc>>,
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,
    },

    /// Change the status of an existing report
    SetStatus {
        id: uuid::Uuid,
        status: AnimalStatus,
    },

    /// Check that the endpoint answers
    Ping,
}

fn init_tracing(log: &LogSettings, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn describe(state: &SessionState) -> String {
    match state {
        SessionState::LoggedOut => "logged out".to_string(),
        SessionState::Guest => "browsing as guest".to_string(),
        SessionState::LoggedIn(user) => format!("logged in as {} <{}>", user.username, user.email),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref()).context("failed to load configuration")?;
    init_tracing(&settings.log, cli.verbose);

    let store = Arc::new(
        SqliteStore::new(&settings.database.url)
            .await
            .with_context(|| format!("failed to open {}", settings.database.url))?,
    );

    let hasher: Arc<dyn PasswordHasher> = match settings.auth.password_scheme {
        PasswordScheme::Sha256 => Arc::new(Sha256Hasher),
        PasswordScheme::Argon2 => Arc::new(Argon2Hasher::new()),
    };

    let mut session = AuthSession::restore(store.clone(), store.clone(), hasher).await;
    if settings.auth.seed_demo_account && session.seed_demo_if_empty().await? {
        info!("demo account available");
    }

    match cli.command {
        Commands::Signup { name, email, password } => {
            let user = match session.sign_up(&name, &email, &password).await {
                Ok(user) => user,
                Err(err) => bail!("{err}"),
            };
            println!("Welcome, {}! Account created for {}.", user.username, user.email);
        }
        Commands::Login { email, password } => {
            let user = match session.login(&email, &password).await {
                Ok(user) => user,
                Err(err) => bail!("{err}"),
            };
            println!("Welcome back, {}.", user.username);
        }
        Commands::Guest => {
            if let Err(err) = session.continue_as_guest().await {
                bail!("{err}");
            }
            println!("{}", describe(&session.state()));
        }
        Commands::Logout => {
            if let Err(err) = session.logout().await {
                bail!("{err}");
            }
            println!("{}", describe(&session.state()));
        }
        Commands::Status => println!("{}", describe(&session.state())),
        Commands::Users { action } => run_users(action, store.as_ref()).await?,
        Commands::Notify { action } => run_notify(action, &session, store.as_ref(), &settings).await?,
        #[cfg(feature = "reports-rest")]
        Commands::Reports { action } => run_reports(action, &settings, &session, store.as_ref()).await?,
    }

    Ok(())
}

async fn run_users(action: UsersCommand, store: &dyn CredentialStore) -> anyhow::Result<()> {
    match action {
        UsersCommand::List => {
            let users = store.list_users().await?;
            if users.is_empty() {
                println!("no accounts");
            }
            for user in users {
                println!("{}  {:<24} {}  {}", user.id, user.name, user.email, user.created_at.to_rfc3339());
            }
        }
        UsersCommand::Reset => {
            let removed = store.reset().await?;
            println!("removed {removed} account(s)");
        }
    }
    Ok(())
}

fn describe_prefs(prefs: &NotificationPrefs) -> String {
    let center = prefs
        .center()
        .map(|c| format!("{:.5}, {:.5}", c.latitude, c.longitude))
        .unwrap_or_else(|| "not set".to_string());
    format!(
        "alerts: {}\nradius: {} mi\ncenter: {center}",
        if prefs.enabled { "on" } else { "off" },
        prefs.radius_miles
    )
}

#[cfg_attr(not(feature = "reports-rest"), allow(unused_variables))]
async fn run_notify(
    action: NotifyCommand,
    session: &AuthSession,
    store: &dyn NotificationPrefsStore,
    settings: &Settings,
) -> anyhow::Result<()> {
    let Some(user) = session.current_user() else {
        bail!("log in to manage notifications");
    };
    let mut prefs = store.load_prefs(&user.email).await?;

    match action {
        NotifyCommand::Show => {
            println!("{}", describe_prefs(&prefs));
            return Ok(());
        }
        NotifyCommand::On => prefs.enabled = true,
        NotifyCommand::Off => prefs.enabled = false,
        NotifyCommand::Radius { miles } => prefs.set_radius(miles),
        NotifyCommand::Center { lat, lon } => prefs.set_center(Some(Coordinate {
            latitude: lat,
            longitude: lon,
        })),
        NotifyCommand::ClearCenter => prefs.set_center(None),
        #[cfg(feature = "reports-rest")]
        NotifyCommand::Nearby => {
            let client = report_client(settings)?;
            let mut nearby: Vec<(f64, Report)> = client
                .list_reports(None)
                .await?
                .into_iter()
                .filter_map(|r| prefs.alert_distance(&r).map(|miles| (miles, r)))
                .collect();
            nearby.sort_by(|a, b| a.0.total_cmp(&b.0));

            if nearby.is_empty() {
                println!("no reports within {} mi", prefs.radius_miles);
            }
            for (miles, report) in nearby {
                println!("{}  {}", report.nearby_summary(miles), report.id);
            }
            return Ok(());
        }
    }

    store.save_prefs(&user.email, &prefs).await?;
    println!("{}", describe_prefs(&prefs));
    Ok(())
}

#[cfg(feature = "reports-rest")]
fn report_client(settings: &Settings) -> anyhow::Result<PostgrestReportClient> {
    let remote = &settings.remote;
    Ok(PostgrestReportClient::new(&remote.base_url()?, remote.api_key()?, remote.timeout())?)
}

#[cfg(feature = "reports-rest")]
async fn run_reports(
    action: ReportsCommand,
    settings: &Settings,
    session: &AuthSession,
    prefs_store: &dyn NotificationPrefsStore,
) -> anyhow::Result<()> {
    let client = report_client(settings)?;

    match action {
        ReportsCommand::List { category, located } => {
            let reports = client.list_reports(category).await?;
            for report in reports.iter().filter(|r| !located || r.coordinate().is_some()) {
                let when = report
                    .created_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                let category = report.category.map(|c| c.as_str()).unwrap_or("-");
                println!(
                    "{when}  [{category}] {} ({}) {}  {}",
                    report.animal_type, report.status, report.nearest_landmark, report.id
                );
            }
        }
        ReportsCommand::Create {
            category,
            animal,
            status,
            color,
            landmark,
            description,
            incident,
            lat,
            lon,
        } => {
            let mut report = Report::draft(category);
            report.animal_type = animal;
            report.status = status;
            report.color = color;
            report.nearest_landmark = landmark;
            report.description = description;
            if incident.is_some() {
                report.incident_date = incident;
            }
            if let (Some(latitude), Some(longitude)) = (lat, lon) {
                report.set_coordinate(Some(Coordinate { latitude, longitude }));
            }

            client.create_report(&report).await?;
            println!("report {} filed under {}", report.id, category);

            if let Some(user) = session.current_user() {
                let prefs = prefs_store.load_prefs(&user.email).await?;
                if let Some(miles) = prefs.alert_distance(&report) {
                    info!(id = %report.id, miles, "report inside alert radius");
                    println!("alert: {}", report.nearby_summary(miles));
                }
            }
        }
        ReportsCommand::SetStatus { id, status } => {
            client.update_status(id, status).await?;
            println!("report {id} is now {status}");
        }
        ReportsCommand::Ping => {
            let status = client.ping().await?;
            println!("{} answered HTTP {status}", client.endpoint());
        }
    }
    Ok(())
}
