//! Typed configuration passed into each import/export entry point.
//!
//! Every value is plain data with `serde` support so a host application can
//! persist the last-used settings however it likes.

use serde::{Deserialize, Serialize};

use crate::model::TimeWindow;
use crate::{Error, Result};

/// Fallback spot radius used by every reader when the input carries none.
pub const DEFAULT_RADIUS: f64 = 10.0;

/// Default file-name pattern for per-timepoint point-cloud exports.
pub const DEFAULT_POINT_FILE_PATTERN: &str = "pointCloud_t%04d.txt";

// ============================================================================
// Track table
// ============================================================================

/// Settings for graph → track table export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub window: TimeWindow,
    /// Written into the first header comment, e.g. the project path.
    pub provenance: String,
    /// Append the UTC export time to the provenance line.
    pub timestamp_header: bool,
    /// A lone follower more than one timepoint later opens a child segment.
    pub split_on_gaps: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            window: TimeWindow::default(),
            provenance: String::from("unknown"),
            timestamp_header: false,
            split_on_gaps: true,
        }
    }
}

impl ExportConfig {
    pub fn new(window: TimeWindow) -> Self {
        Self { window, ..Self::default() }
    }

    pub fn with_provenance(mut self, provenance: impl Into<String>) -> Self {
        self.provenance = provenance.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.window.validate()
    }
}

/// Settings for track table → graph import.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub default_radius: f64,
    /// Use the optional 8th column as the spot radius where present.
    pub prefer_radius_column: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self { default_radius: DEFAULT_RADIUS, prefer_radius_column: true }
    }
}

impl ImportConfig {
    pub fn validate(&self) -> Result<()> {
        check_radius(self.default_radius)
    }
}

// ============================================================================
// Point clouds
// ============================================================================

/// Where 3-column points land in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    /// Every row becomes one isolated spot at this timepoint
    /// (clamped into the window).
    SingleTimepoint(i32),
    /// Every row becomes a linked chain spanning the whole window.
    AllTimepoints,
}

/// Settings for point-cloud import.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointImportConfig {
    pub window: TimeWindow,
    /// Ignored by the 4-column reader, which carries its own times.
    pub placement: Placement,
    pub radius: f64,
}

impl Default for PointImportConfig {
    fn default() -> Self {
        Self {
            window: TimeWindow::default(),
            placement: Placement::SingleTimepoint(0),
            radius: DEFAULT_RADIUS,
        }
    }
}

impl PointImportConfig {
    pub fn validate(&self) -> Result<()> {
        self.window.validate()?;
        check_radius(self.radius)
    }
}

/// Settings for point-cloud export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointExportConfig {
    pub window: TimeWindow,
    /// C-style pattern with exactly one `%d` / `%0Nd`, per-timepoint export only.
    pub file_name_pattern: String,
}

impl Default for PointExportConfig {
    fn default() -> Self {
        Self {
            window: TimeWindow::default(),
            file_name_pattern: DEFAULT_POINT_FILE_PATTERN.to_string(),
        }
    }
}

impl PointExportConfig {
    pub fn new(window: TimeWindow) -> Self {
        Self { window, ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        self.window.validate()
    }

    /// Expand the file-name pattern for one timepoint.
    pub fn file_name(&self, time: i32) -> Result<String> {
        format_timepoint(&self.file_name_pattern, time)
    }
}

fn check_radius(radius: f64) -> Result<()> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!("radius must be positive, got {radius}")))
    }
}

/// Expand one `%d`, `%Nd` or `%0Nd` placeholder; `%%` is a literal percent.
pub fn format_timepoint(pattern: &str, time: i32) -> Result<String> {
    let invalid = |why: &str| Error::InvalidConfig(format!("file name pattern {pattern:?}: {why}"));

    let mut out = String::with_capacity(pattern.len() + 8);
    let mut chars = pattern.chars().peekable();
    let mut placeholders = 0;

    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }

        let zero_pad = chars.peek() == Some(&'0');
        if zero_pad {
            chars.next();
        }
        let mut width = String::new();
        while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
            width.push(d);
            chars.next();
        }
        if chars.next() != Some('d') {
            return Err(invalid("only %d placeholders are supported"));
        }
        let width: usize = if width.is_empty() {
            0
        } else {
            width.parse().map_err(|_| invalid("bad field width"))?
        };

        if zero_pad {
            out.push_str(&format!("{time:0width$}"));
        } else {
            out.push_str(&format!("{time:width$}"));
        }
        placeholders += 1;
    }

    match placeholders {
        1 => Ok(out),
        0 => Err(invalid("missing %d placeholder")),
        _ => Err(invalid("more than one placeholder")),
    }
}
