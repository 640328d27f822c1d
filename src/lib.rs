pub mod config;
pub mod model;
pub mod predict;
pub mod scheduler;
pub mod time_expr;
