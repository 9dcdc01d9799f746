//! # Stockroom Library
//!
//! The application shell: state, pages and the command line, on top of
//! `stockroom-core` (domain logic) and `stockroom-backend` (hosted backend).
//!
//! ## Module Organization
//! ```text
//! stockroom/
//! ├── lib.rs          ◄─── You are here (App wiring & logging)
//! ├── main.rs         ◄─── Binary entry point
//! ├── cli.rs          ◄─── Command line parsing & output
//! ├── demo.rs         ◄─── Seeded in-memory backend for --offline
//! ├── storage.rs      ◄─── LocalStore (JSON key-value file)
//! ├── error.rs        ◄─── ApiError shown to the user
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── config.rs   ◄─── ConfigState (file + env)
//! │   ├── backend.rs  ◄─── BackendState (dyn Backend + repositories)
//! │   ├── route.rs    ◄─── RouteState (current page + history)
//! │   └── session.rs  ◄─── SessionState (auth events, permissions)
//! └── pages/
//!     ├── auth.rs  dashboard.rs  clients.rs
//!     └── products.rs  orders.rs  inventory.rs
//! ```

pub mod cli;
pub mod demo;
pub mod error;
pub mod pages;
pub mod state;
pub mod storage;

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stockroom_backend::{Backend, RestBackend, Session};

use error::ApiError;
use state::{BackendState, ConfigState, RouteState, SessionState};
use storage::LocalStore;

/// Store file used with `--offline`, kept apart from the real session.
const OFFLINE_STORE_FILE: &str = "offline-store.json";

/// Everything a page needs.
pub struct App {
    pub config: ConfigState,
    pub backend: BackendState,
    pub store: Arc<LocalStore>,
    pub routes: Arc<RouteState>,
    pub session: Arc<SessionState>,
}

impl App {
    /// Wires the state types around a backend and a store.
    pub fn new(config: ConfigState, backend: Arc<dyn Backend>, store: Arc<LocalStore>) -> Self {
        let backend = BackendState::new(backend);
        let routes = Arc::new(RouteState::restore(store.clone()));
        let session = Arc::new(SessionState::new(backend.clone(), store.clone(), routes.clone()));
        App {
            config,
            backend,
            store,
            routes,
            session,
        }
    }

    /// The hosted backend described by the configuration.
    ///
    /// ## Startup Sequence
    /// ```text
    /// 1. BackendConfig from ConfigState (url + anon key required)
    /// 2. RestBackend (reqwest client with timeout)
    /// 3. LocalStore at <data dir>/local-store.json
    /// 4. RouteState restored, SessionState subscribed
    /// ```
    pub fn connect(config: ConfigState) -> Result<Self, ApiError> {
        let backend_config = config.backend_config()?;
        info!(backend = %backend_config.url, "Using hosted backend");
        let backend = RestBackend::new(backend_config)?;
        let store = LocalStore::open(config.store_path()?)?;
        Ok(App::new(config, Arc::new(backend), Arc::new(store)))
    }

    /// The seeded in-memory backend, for trying the app without a server.
    /// Changes are lost when the process exits.
    pub fn offline(config: ConfigState) -> Result<Self, ApiError> {
        let path = config.store_path()?.with_file_name(OFFLINE_STORE_FILE);
        let store = LocalStore::open(path)?;
        let backend = demo::demo_backend()?;
        info!("Using offline demo backend");
        Ok(App::new(config, Arc::new(backend), Arc::new(store)))
    }

    /// Restores the persisted session and fixes up the route.
    pub async fn start(&self) -> Option<Session> {
        self.session.start().await
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=stockroom_backend=trace` - Trace backend calls only
/// - Otherwise the `log_filter` from the config (default `info,stockroom=debug`)
///
/// Logs go to stderr so command output stays clean.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // a second call (tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
