//! Configuration for the hash containers
//!
//! A [`TableConfig`] is a plain record of growth knobs copied into the
//! container at `create` time. Thresholds are integer percentages of the
//! active table range.

use crate::error::{Result, SetKitError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Growth and allocation policy for a hash container.
///
/// The constraint `grow_threshold > 2 * shrink_threshold` keeps a
/// grow-then-shrink sequence from oscillating: halving a table that just
/// grew must not immediately re-trigger growth.
///
/// # Examples
///
/// ```rust
/// use setkit::TableConfig;
///
/// let config = TableConfig {
///     table_count_min: 4,
///     grow_threshold: 80,
///     shrink_threshold: 30,
///     ..TableConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TableConfig {
    /// Smallest slot count ever allocated. Must be at least 2.
    pub alloc_count_min: usize,
    /// Smallest active hash range. Must be at least 2.
    pub table_count_min: usize,
    /// Insert-triggered growth once `load% >= grow_threshold` (0-100).
    pub grow_threshold: u32,
    /// Remove-triggered shrink once `load% < shrink_threshold` (0-100).
    pub shrink_threshold: u32,
    /// Resize automatically on insert. When false, call `update()`.
    pub auto_grow: bool,
    /// Resize automatically on remove. When false, call `update()`.
    pub auto_shrink: bool,
    /// Allow growth to allocate beyond the initial capacity. Forced off
    /// when the container adopts a fixed buffer.
    pub dynamic_alloc: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            alloc_count_min: 32,
            table_count_min: 8,
            grow_threshold: 75,
            shrink_threshold: 25,
            auto_grow: true,
            auto_shrink: true,
            dynamic_alloc: true,
        }
    }
}

impl TableConfig {
    /// Preset for small, short-lived tables.
    pub fn small() -> Self {
        Self {
            alloc_count_min: 8,
            table_count_min: 4,
            grow_threshold: 80,
            shrink_threshold: 30,
            ..Self::default()
        }
    }

    /// Preset for containers backed by a caller-supplied fixed buffer.
    ///
    /// `dynamic_alloc` is off; growth only extends the hash range into the
    /// buffer's spare capacity.
    pub fn fixed() -> Self {
        Self {
            dynamic_alloc: false,
            ..Self::default()
        }
    }

    /// Validate the configuration for correctness and consistency.
    pub fn validate(&self) -> Result<()> {
        if self.alloc_count_min < 2 || self.table_count_min < 2 {
            return Err(SetKitError::InvalidArguments);
        }
        if self.grow_threshold > 100 || self.shrink_threshold > 100 {
            return Err(SetKitError::InvalidArguments);
        }
        if self.grow_threshold <= self.shrink_threshold * 2 {
            return Err(SetKitError::InvalidArguments);
        }
        Ok(())
    }
}
