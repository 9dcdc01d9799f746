//! # State Module
//!
//! Application state, one focused type per concern.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌─────────────┐ │
//! │  │ ConfigState  │  │ BackendState │  │ RouteState   │  │SessionState │ │
//! │  │              │  │              │  │              │  │             │ │
//! │  │ url, key,    │  │ Arc<dyn      │  │ current page │  │ auth events │ │
//! │  │ data dir,    │  │   Backend>   │  │ + history    │  │ permissions │ │
//! │  │ log filter   │  │              │  │              │  │ cache       │ │
//! │  └──────────────┘  └──────────────┘  └──────┬───────┘  └──────┬──────┘ │
//! │                                             │                 │        │
//! │                                             ▼                 ▼        │
//! │                                     ┌────────────────────────────────┐ │
//! │                                     │  LocalStore (JSON file)        │ │
//! │                                     │  "route", "auth.session"       │ │
//! │                                     └────────────────────────────────┘ │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • ConfigState: Read-only after initialization                         │
//! │  • BackendState: the backend handles its own locking                   │
//! │  • RouteState / SessionState: internal Mutex, shared through Arc       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod backend;
mod config;
mod route;
mod session;

pub use backend::BackendState;
pub use config::{ConfigError, ConfigState, DEFAULT_LOG_FILTER};
pub use route::{Route, RouteState, HISTORY_KEY, ROUTE_KEY};
pub use session::{SessionState, SESSION_KEY};
