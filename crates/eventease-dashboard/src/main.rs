mod config;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use eventease_api::{AuthError, AuthService, LocalBackend};
use eventease_db::Database;
use eventease_gateway::Dispatcher;
use eventease_live::dashboard::{Calendar, DashboardStats};
use eventease_live::preferences::Preferences;
use eventease_live::{
    EventsSpec, LiveCollection, Notices, NotificationsSpec, SessionGuard, VendorsSpec, VenuesSpec,
};
use eventease_types::api::{Session, SignInRequest, SignUpRequest};
use eventease_types::models::NewNotification;

use config::{Config, Credentials};

/// How often the summary is re-checked while following changes.
const SUMMARY_INTERVAL: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eventease=debug".into()),
        )
        .init();

    let config = Config::from_env();

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);
    info!("Opened store at {}", config.db_path.display());

    let service = LocalBackend::new(db.clone(), Dispatcher::new(), config.jwt_secret.as_str());
    let auth = AuthService::new(db, config.jwt_secret.clone());
    let prefs = Preferences::load(&config.prefs_path);
    info!("Language: {}", prefs.language());

    let mut guard = SessionGuard::for_auth(&auth);
    match &config.credentials {
        Some(credentials) => {
            authenticate(&auth, credentials).await?;
        }
        None => {
            auth.restore(None).await;
        }
    }

    let session = match guard.wait_for_session().await {
        Ok(session) => session,
        Err(e) => {
            warn!("{}: set EVENTEASE_EMAIL and EVENTEASE_PASSWORD", e);
            return Ok(());
        }
    };
    info!("Signed in as {}", session.user.display_name());

    let backend = service.for_session(&session)?;
    let notices = Notices::log_only();

    let events = LiveCollection::mount(backend.clone(), EventsSpec, &session, notices.clone()).await?;
    let vendors = LiveCollection::mount(backend.clone(), VendorsSpec, &session, notices.clone()).await?;
    let venues = LiveCollection::mount(backend.clone(), VenuesSpec, &session, notices.clone()).await?;
    let inbox = LiveCollection::mount(backend, NotificationsSpec, &session, notices).await?;

    if inbox.view().await.all.is_empty() {
        welcome(&service, &session).await;
    }

    info!(
        "{} vendor(s), {} venue(s) in the directories",
        vendors.view().await.all.len(),
        venues.view().await.all.len()
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut last = None;
    let mut ticker = tokio::time::interval(SUMMARY_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let events_view = events.view().await;
                let stats = DashboardStats::compute(&events_view, &inbox.view().await, Utc::now());
                if last != Some(stats) {
                    info!(
                        "{} event(s), {} upcoming, {} registered, {} created this month, {} unread",
                        stats.total_events,
                        stats.upcoming_events,
                        stats.registered_events,
                        stats.created_this_month,
                        stats.unread_notifications
                    );

                    let calendar = Calendar::build(&events_view.all);
                    for day in calendar.busy_days().filter(|d| *d >= Utc::now().date_naive()).take(3) {
                        for entry in calendar.events_on(day) {
                            debug!("{} {}", day, serde_json::to_string(entry)?);
                        }
                    }
                    last = Some(stats);
                }
            }
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Sign in, creating the account first when a full name is configured.
async fn authenticate(auth: &AuthService, credentials: &Credentials) -> anyhow::Result<Session> {
    let sign_in = SignInRequest {
        email: credentials.email.clone(),
        password: credentials.password.clone(),
    };

    match (auth.sign_in(sign_in).await, &credentials.full_name) {
        (Ok(session), _) => Ok(session),
        (Err(AuthError::InvalidCredentials), Some(full_name)) => {
            info!("No account for {}, signing up", credentials.email);
            let session = auth
                .sign_up(SignUpRequest {
                    full_name: full_name.clone(),
                    email: credentials.email.clone(),
                    password: credentials.password.clone(),
                })
                .await?;
            Ok(session)
        }
        (Err(e), _) => {
            auth.sign_out();
            Err(e.into())
        }
    }
}

async fn welcome(service: &LocalBackend, session: &Session) {
    let note = NewNotification {
        user_id: session.user_id(),
        title: "Welcome to EventEase".into(),
        message: format!("Hi {}, your dashboard is ready.", session.user.display_name()),
        kind: Some("info".into()),
        link: Some("/dashboard".into()),
    };

    if let Err(e) = service.notify(note).await {
        warn!("Could not deliver welcome notification: {}", e);
    }
}
