//! # Scissors Workspace
//!
//! Server side of stylesheet synchronization: the last good rule tree of
//! every open sheet, the connections that mirror it, and the sources that
//! change it (client edits and watched files).

pub mod hub;
pub mod protocol;
pub mod server;
pub mod service;
pub mod state;
pub mod watcher;

pub use hub::{ConnectionId, Hub, HubError, HubResult};
pub use protocol::{ClientMessage, CssType, OpenSheet, ProtocolError, ProtocolResult, ServerMessage};
pub use server::{router, serve, ServerConfig, ServerError, ServerResult};
pub use service::Workspace;
pub use state::{
    CssParser, SheetParser, SheetRegistry, StateError, StateResult, UpdateOutcome, UpdateTicket,
};
pub use watcher::{changed_paths, SheetFilter, SheetWatcher, WatcherError, WatcherResult};
