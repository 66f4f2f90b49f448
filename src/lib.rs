pub mod aggregate;
pub mod backend;
pub mod clipboard;
pub mod config;
pub mod deep_link;
pub mod ide;
pub mod model;
pub mod project_match;
pub mod quick_select;
pub mod reorder;
pub mod state;
pub mod use_cases;
