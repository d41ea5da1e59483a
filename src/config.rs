//! Global configuration options.

use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Global configuration options for the hslab crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with
/// [`global_config_mut`].
///
/// # Chunk Heuristic Options
///
/// ## Chunk Base
/// > default: `16 KiB`
///
/// Multiplier of the target chunk byte size computed by
/// [`suggest_chunk_shape`](crate::suggest_chunk_shape).
///
/// ## Chunk Min
/// > default: `8 KiB`
///
/// Soft lower limit of the target chunk byte size.
///
/// ## Chunk Max
/// > default: `1 MiB`
///
/// Hard upper limit of the chunk byte size. Only a chunk that is a single
/// element on every axis may exceed it.
///
/// ## Unlimited Axis Guess
/// > default: `1024`
///
/// Length substituted for unlimited or zero-length axes before chunking.
///
/// # Miscellaneous Options
///
/// ## Error Reporting
/// > default: [`true`]
///
/// Initial value of the automatic error reporting of a newly created
/// [`ZarrBackend`](crate::ZarrBackend). Existence checks suppress it
/// temporarily regardless of this setting.
///
/// ## Create Intermediate Groups
/// > default: [`true`]
///
/// If enabled, creating a dataset also creates the missing groups along its
/// path.
#[derive(Debug)]
pub struct Config {
    chunk_base: usize,
    chunk_min: usize,
    chunk_max: usize,
    unlimited_axis_guess: u64,
    error_reporting: bool,
    create_intermediate_groups: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            chunk_base: 16 * 1024,
            chunk_min: 8 * 1024,
            chunk_max: 1024 * 1024,
            unlimited_axis_guess: 1024,
            error_reporting: true,
            create_intermediate_groups: true,
        }
    }
}

impl Config {
    /// Get the [chunk base](#chunk-base) configuration.
    #[must_use]
    pub fn chunk_base(&self) -> usize {
        self.chunk_base
    }

    /// Set the [chunk base](#chunk-base) configuration.
    pub fn set_chunk_base(&mut self, chunk_base: usize) {
        self.chunk_base = chunk_base;
    }

    /// Get the [chunk min](#chunk-min) configuration.
    #[must_use]
    pub fn chunk_min(&self) -> usize {
        self.chunk_min
    }

    /// Set the [chunk min](#chunk-min) configuration.
    pub fn set_chunk_min(&mut self, chunk_min: usize) {
        self.chunk_min = chunk_min;
    }

    /// Get the [chunk max](#chunk-max) configuration.
    #[must_use]
    pub fn chunk_max(&self) -> usize {
        self.chunk_max
    }

    /// Set the [chunk max](#chunk-max) configuration.
    pub fn set_chunk_max(&mut self, chunk_max: usize) {
        self.chunk_max = chunk_max;
    }

    /// Get the [unlimited axis guess](#unlimited-axis-guess) configuration.
    #[must_use]
    pub fn unlimited_axis_guess(&self) -> u64 {
        self.unlimited_axis_guess
    }

    /// Set the [unlimited axis guess](#unlimited-axis-guess) configuration.
    pub fn set_unlimited_axis_guess(&mut self, guess: u64) {
        self.unlimited_axis_guess = guess;
    }

    /// Get the [error reporting](#error-reporting) configuration.
    #[must_use]
    pub fn error_reporting(&self) -> bool {
        self.error_reporting
    }

    /// Set the [error reporting](#error-reporting) configuration.
    pub fn set_error_reporting(&mut self, error_reporting: bool) {
        self.error_reporting = error_reporting;
    }

    /// Get the [create intermediate groups](#create-intermediate-groups)
    /// configuration.
    #[must_use]
    pub fn create_intermediate_groups(&self) -> bool {
        self.create_intermediate_groups
    }

    /// Set the [create intermediate groups](#create-intermediate-groups)
    /// configuration.
    pub fn set_create_intermediate_groups(&mut self, create: bool) {
        self.create_intermediate_groups = create;
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global hslab configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might
/// panic if the global config is already held by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .read()
        .unwrap()
}

/// Returns a mutable reference to the global hslab configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might
/// panic if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .write()
        .unwrap()
}
