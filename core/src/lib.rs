//! Orchestration engine for the `aos` console.
//!
//! The engine owns the modal input loop, the meta-command table, the
//! sequential evaluation pipeline and the live status feed. Everything that
//! reaches the network, the filesystem or the terminal sits behind the
//! traits in [`capability`] and [`display`].

pub mod bootstrap;
pub mod capability;
pub mod config;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod evaluate;
pub mod help;
pub mod monitor;
pub mod repl;
pub mod session;

pub use bootstrap::Bootstrap;
pub use bootstrap::Startup;
pub use bootstrap::StartupOptions;
pub use config::Config;
pub use config::ConfigOverrides;
pub use dispatch::Dispatcher;
pub use dispatch::Flow;
pub use dispatch::Route;
pub use display::Display;
pub use display::Progress;
pub use error::CredentialError;
pub use error::EvaluationError;
pub use error::LoadError;
pub use error::RegistrationError;
pub use error::ReplError;
pub use evaluate::EvaluationResult;
pub use evaluate::Evaluator;
pub use monitor::LiveFeed;
pub use monitor::MonitorHandle;
pub use monitor::MonitorLifecycle;
pub use monitor::StatusFeed;
pub use repl::Repl;
pub use session::Credential;
pub use session::Mode;
pub use session::ProcessId;
pub use session::Session;
