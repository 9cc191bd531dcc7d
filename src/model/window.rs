//! Inclusive time window.

use serde::{Deserialize, Serialize};
use crate::{Error, Result};

/// Closed interval of timepoints `[from, till]`.
///
/// Deserializing a window that ends before it starts fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "WindowFields")]
pub struct TimeWindow {
    pub from: i32,
    pub till: i32,
}

impl TimeWindow {
    pub fn new(from: i32, till: i32) -> Result<Self> {
        let window = Self { from, till };
        window.validate()?;
        Ok(window)
    }

    /// Reject a window built field by field that ends before it starts.
    pub fn validate(&self) -> Result<()> {
        if self.till < self.from {
            return Err(Error::InvalidConfig(format!(
                "time window ends ({}) before it starts ({})",
                self.till, self.from
            )));
        }
        Ok(())
    }

    /// Window of a single timepoint.
    pub fn at(time: i32) -> Self {
        Self { from: time, till: time }
    }

    pub fn contains(&self, time: i32) -> bool {
        self.from <= time && time <= self.till
    }

    /// Pin a timepoint into the window.
    pub fn clamp(&self, time: i32) -> i32 {
        time.max(self.from).min(self.till)
    }

    pub fn timepoints(&self) -> std::ops::RangeInclusive<i32> {
        self.from..=self.till
    }

    /// Number of timepoints covered.
    pub fn len(&self) -> usize {
        (self.till as i64 - self.from as i64 + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.till < self.from
    }
}

#[derive(Deserialize)]
struct WindowFields {
    from: i32,
    till: i32,
}

impl TryFrom<WindowFields> for TimeWindow {
    type Error = Error;

    fn try_from(fields: WindowFields) -> Result<Self> {
        Self::new(fields.from, fields.till)
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self { from: 0, till: 0 }
    }
}
