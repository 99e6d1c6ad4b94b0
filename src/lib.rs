pub mod app;
pub mod config;
pub mod console;
pub mod dispatcher;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod poller;
pub mod relay;
pub mod socket;
pub mod state;
pub mod ui;

pub use app::router;
pub use config::ConsoleConfig;
pub use console::Console;
pub use state::AppState;
