//! Generic deep and shallow cloning for the Replica object model.
//!
//! This crate provides:
//!
//! - **Clone operations** ([`deep_clone`], [`shallow_clone`],
//!   [`deep_clone_into`], [`shallow_clone_into`]) over values and heap
//!   objects of any registered type.
//!
//! - **Safety classification** ([`is_safe`], [`is_class_safe`]): which
//!   types never need recursive cloning. Primitives, strings, enums,
//!   pointers and structs of safe fields are returned unchanged.
//!
//! - **Clone strategies** ([`strategy::CloneStrategy`]): one compiled
//!   procedure per concrete runtime type, synthesized on first use and
//!   cached for the life of the process.
//!
//! - **Identity tracking** ([`state::CloneState`]): within one call, every
//!   source object maps to exactly one copy, so shared references and
//!   cycles survive the clone.
//!
//! # Design
//!
//! Objects are walked through the `replica_model` heap rather than via
//! generated code. Copies are allocated without running constructors and
//! filled through the raw field path, so read-only fields are reproduced
//! exactly while keeping their read-only metadata. Dispatch is always on
//! the runtime type of the object in a slot, never the slot's declared
//! type.
//!
//! # Tracing
//!
//! Strategy synthesis logs at `debug`, per-call summaries at `trace`. Call
//! [`init_tracing`] and set `RUST_LOG=replica_clone=debug` to see them.

mod array;
mod config;
mod engine;
mod entry;
mod error;
pub mod safety;
mod stack;
pub mod state;
pub mod strategy;

use std::sync::Once;

pub use config::{configure, CloneConfig, GROW_STACK_VAR};
pub use entry::{deep_clone, deep_clone_into, shallow_clone, shallow_clone_into};
pub use error::{CloneError, ConfigError};
pub use safety::{is_class_safe, is_safe};

static TRACING_INIT: Once = Once::new();

/// Install a `fmt` subscriber for the clone engine's events.
///
/// Only acts when `RUST_LOG` is set. `RUST_LOG=replica_clone=debug` shows
/// strategy synthesis and lost first-use races; `RUST_LOG=replica_clone=trace`
/// adds one line per deep clone. Lines carry thread ids. A host that
/// already installed a global subscriber keeps it. Calling this more than
/// once has no further effect.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        let layer = fmt::layer().with_target(true).with_thread_ids(true);
        let installed = tracing_subscriber::registry()
            .with(layer)
            .with(EnvFilter::from_default_env())
            .try_init();
        if installed.is_err() {
            tracing::debug!("global subscriber already set, keeping it");
        }
    });
}
