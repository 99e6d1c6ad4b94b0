use crate::console::Console;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub console: Arc<Console>,
}

impl AppState {
    pub fn new(console: Arc<Console>) -> Self {
        Self { console }
    }
}
