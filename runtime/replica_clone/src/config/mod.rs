//! Engine configuration.
//!
//! Configuration is process-wide and fixed the first time the engine reads
//! it. Call [`configure`] during startup, before any clone runs; afterwards
//! it fails with [`ConfigError::AlreadyConfigured`].
//!
//! # Environment
//!
//! - `REPLICA_GROW_STACK`: `1`/`true` (default) or `0`/`false`.

use std::sync::OnceLock;

use replica_model::TypeId;
use rustc_hash::FxHashSet;

use crate::ConfigError;

/// Environment variable toggling stack growth.
pub const GROW_STACK_VAR: &str = "REPLICA_GROW_STACK";

/// Engine settings.
#[derive(Clone, Debug)]
pub struct CloneConfig {
    pass_through: FxHashSet<TypeId>,
    grow_stack: bool,
}

impl Default for CloneConfig {
    fn default() -> Self {
        CloneConfig {
            pass_through: FxHashSet::default(),
            grow_stack: true,
        }
    }
}

impl CloneConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat `ty` as wrapping a resource that must not be duplicated.
    ///
    /// Values of pass-through types are classified safe: cloning returns
    /// the same reference and fields of that type are copied as-is.
    #[must_use]
    pub fn pass_through(mut self, ty: TypeId) -> Self {
        self.pass_through.insert(ty);
        self
    }

    /// Run graph recursion on a growable stack.
    #[must_use]
    pub fn grow_stack(mut self, enabled: bool) -> Self {
        self.grow_stack = enabled;
        self
    }

    #[inline]
    pub fn is_pass_through(&self, ty: TypeId) -> bool {
        self.pass_through.contains(&ty)
    }

    #[inline]
    pub fn grows_stack(&self) -> bool {
        self.grow_stack
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overridden by `lookup`, which maps variable names to values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(GROW_STACK_VAR) {
            config.grow_stack = parse_flag(GROW_STACK_VAR, &raw)?;
        }
        Ok(config)
    }
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            var,
            value: raw.to_owned(),
        }),
    }
}

static CONFIG: OnceLock<CloneConfig> = OnceLock::new();

/// Install the process-wide configuration.
///
/// Fails if a configuration is already installed or the engine has already
/// started with the defaults.
pub fn configure(config: CloneConfig) -> Result<(), ConfigError> {
    CONFIG
        .set(config)
        .map_err(|_| ConfigError::AlreadyConfigured)?;
    tracing::debug!("clone engine configured");
    Ok(())
}

/// The active configuration, locking in the defaults on first use.
pub(crate) fn active() -> &'static CloneConfig {
    CONFIG.get_or_init(CloneConfig::default)
}
