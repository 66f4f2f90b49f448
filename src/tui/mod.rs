mod app;
mod form;
mod ui;

pub use app::run_tui;
