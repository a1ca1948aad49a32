mod app;
pub mod args;
mod line_reader;
mod logging;
pub mod terminal;

pub use app::run;
pub use args::Cli;
