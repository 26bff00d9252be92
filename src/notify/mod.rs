//! Change notification: per-source watchers fanned into a single dispatcher.
//!
//! Every [`SourceWatcher`] runs on its own timer and sends confirmed
//! changes into one shared channel. The [`Dispatcher`] is the only reader of
//! that channel and the only caller of the reload trigger, so reloads are
//! serialized while detection runs in parallel.

pub mod dispatcher;
pub mod watcher;

pub use dispatcher::{DispatchStats, Dispatcher};
pub use watcher::{SourceWatcher, WatchOptions};
