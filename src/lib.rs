//! gesture-migrate library for moving Angular projects off the deprecated
//! HammerJS gesture setup.
//!
//! The core workflow involves three phases:
//!
//! 1. **Discovery**: Collect each target's TypeScript sources and HTML templates
//! 2. **Evidence**: Parse everything and gather usage evidence without editing
//! 3. **Rewriting**: Pick one strategy per target and apply it through a
//!    deferred change set
//!
//! # Example
//!
//! ```no_run
//! use gesture_migrate::changes::ChangeSet;
//! use gesture_migrate::config::LegacyApi;
//! use gesture_migrate::engine::run_target;
//! use gesture_migrate::project::collect_targets;
//! use std::path::PathBuf;
//!
//! let api = LegacyApi::default();
//! let targets = collect_targets(&[PathBuf::from("./app")], &[], true).unwrap();
//!
//! let mut changes = ChangeSet::new();
//! for target in &targets {
//!     let outcome = run_target(&api, target, &mut changes).unwrap();
//!     println!("{}: {}", target.root.display(), outcome.strategy.describe());
//! }
//!
//! // Dry-run: returns what each file would look like without writing.
//! let rewritten = changes.write(true).unwrap();
//! println!("{} file(s) would change", rewritten.len());
//! ```

pub mod aggregate;
pub mod changes;
pub mod cli;
pub mod config;
pub mod edits;
pub mod engine;
pub mod imports;
pub mod project;
pub mod source;
pub mod template;

// Re-export commonly used types at crate root
pub use changes::ChangeSet;
pub use config::LegacyApi;
pub use engine::{Failure, Severity, Strategy, TargetOutcome};
