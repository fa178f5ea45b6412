//! Cross-tick state read by several surface passes.
//!
//! Each structure sits behind its own mutex so a host thread can push a new
//! transcript or settings while the tick thread renders.

use crate::{chat::ChatState, settings::DashboardModel};
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct SharedState {
    pub chat: Mutex<ChatState>,
    pub dashboard: Mutex<DashboardModel>,
}

impl SharedState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}
