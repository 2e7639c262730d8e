#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use argon2::Params;
use chrono::{Duration as Days, Utc};

use eventease_api::{AuthService, Backend, BackendError, LocalBackend};
use eventease_db::Database;
use eventease_gateway::{ChangeStream, Dispatcher};
use eventease_live::forms::EventForm;
use eventease_live::notice::Notice;
use eventease_live::{LiveCollection, LiveSpec, Phase};
use eventease_types::Record;
use eventease_types::api::{Session, SignUpRequest};
use eventease_types::events::Watch;
use eventease_types::query::{Patch, Query};
use tokio::sync::mpsc;

pub const SECRET: &str = "integration-secret";

pub struct Harness {
    pub service: LocalBackend,
    pub auth: AuthService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_dispatcher(Dispatcher::new())
    }

    pub fn with_dispatcher(dispatcher: Dispatcher) -> Self {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let params = Params::new(1024, 1, 1, None).unwrap();
        Self {
            service: LocalBackend::new(db.clone(), dispatcher, SECRET),
            auth: AuthService::with_params(db, SECRET, params),
        }
    }

    /// Register an account and return its session with a backend acting as it.
    pub async fn user(&self, name: &str) -> (Session, LocalBackend) {
        let session = self
            .auth
            .sign_up(SignUpRequest {
                full_name: name.into(),
                email: format!("{}@example.com", name.to_lowercase()),
                password: "Secret123".into(),
            })
            .await
            .unwrap();
        let backend = self.service.for_session(&session).unwrap();
        (session, backend)
    }
}

pub fn tech_conf() -> EventForm {
    EventForm {
        name: "Tech Conf".into(),
        event_type: "Conference".into(),
        date: Some((Utc::now() + Days::days(1)).date_naive()),
        time: "10:00".into(),
        location: "Main Hall".into(),
        ..Default::default()
    }
}

/// Poll the view until `pred` holds. Pushes trigger refetches in the
/// background, so views converge rather than update in lockstep.
pub async fn settle<B, S>(collection: &LiveCollection<B, S>, pred: impl Fn(&S::View) -> bool) -> S::View
where
    B: Backend,
    S: LiveSpec,
{
    for _ in 0..300 {
        let view = collection.view().await;
        if pred(&view) {
            return view;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} never reached the expected state", S::NAME);
}

/// Wait until the change feed has gone quiet: the collection must report
/// `Ready` on several consecutive polls.
pub async fn ready<B, S>(collection: &LiveCollection<B, S>)
where
    B: Backend,
    S: LiveSpec,
{
    let mut streak = 0;
    for _ in 0..300 {
        if collection.phase().await == Phase::Ready {
            streak += 1;
            if streak == 5 {
                return;
            }
        } else {
            streak = 0;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} never settled into Ready", S::NAME);
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<Notice>) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        notices.push(notice);
    }
    notices
}

/// Wraps a backend and fails reads and/or writes on demand with a network
/// error.
#[derive(Clone)]
pub struct Flaky<B> {
    inner: B,
    reads_down: Arc<AtomicBool>,
    writes_down: Arc<AtomicBool>,
}

impl<B: Backend> Flaky<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            reads_down: Arc::new(AtomicBool::new(false)),
            writes_down: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_reads_down(&self, down: bool) {
        self.reads_down.store(down, Ordering::SeqCst);
    }

    pub fn set_writes_down(&self, down: bool) {
        self.writes_down.store(down, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool) -> Result<(), BackendError> {
        if flag.load(Ordering::SeqCst) {
            return Err(BackendError::Network("connection refused".into()));
        }
        Ok(())
    }
}

impl<B: Backend> Backend for Flaky<B> {
    async fn select<R: Record>(&self, query: Query) -> Result<Vec<R>, BackendError> {
        Self::check(&self.reads_down)?;
        self.inner.select(query).await
    }

    async fn insert<R: Record>(&self, record: R) -> Result<R, BackendError> {
        Self::check(&self.writes_down)?;
        self.inner.insert(record).await
    }

    async fn update<R: Record>(&self, query: Query, patch: Patch) -> Result<usize, BackendError> {
        Self::check(&self.writes_down)?;
        self.inner.update::<R>(query, patch).await
    }

    async fn delete<R: Record>(&self, query: Query) -> Result<usize, BackendError> {
        Self::check(&self.writes_down)?;
        self.inner.delete::<R>(query).await
    }

    fn subscribe(&self, watch: Watch) -> Result<ChangeStream, BackendError> {
        self.inner.subscribe(watch)
    }
}
