//! Derived-Field Calculator
//!
//! Pure functions turning pixel sizes into physical print sizes and gross print
//! costs into consumer prices. Everything here is stateless; the merge engine
//! feeds it through a [`PricingPolicy`] built from configuration.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Default print resolution in dots per inch.
pub const DEFAULT_DPI: f64 = 250.0;
/// Default absolute margin floor, in currency units.
pub const DEFAULT_MIN_MARGIN: f64 = 100.0;
/// Default VAT rate applied on top of cost plus margin.
pub const DEFAULT_VAT_RATE: f64 = 0.21;

const CM_PER_INCH: f64 = 2.54;
const SIZE_STEP_CM: f64 = 0.5;
const MARGIN_RATE: f64 = 0.41;
const MARGIN_RATE_EXTRA_LARGE: f64 = 0.45;

/// Format code for the artist proof edition; never priced.
pub const ARTIST_PROOF: &str = "artist";

/// Image orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
}

impl Orientation {
    /// Landscape when `width >= height`, portrait otherwise.
    pub fn from_pixels(width: u32, height: u32) -> Self {
        if width >= height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

/// Physical print size in centimetres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalDimensions {
    pub long_side: f64,
    pub short_side: f64,
    pub orientation: Orientation,
}

impl PhysicalDimensions {
    /// Render as `"<w> × <h> cm"`, width first in the image's own orientation.
    pub fn label(&self) -> String {
        let (w, h) = match self.orientation {
            Orientation::Landscape => (self.long_side, self.short_side),
            Orientation::Portrait => (self.short_side, self.long_side),
        };
        format!("{} × {} cm", format_cm(w), format_cm(h))
    }
}

/// Round to the nearest multiple of `step`, halves away from zero.
pub fn round_to_step(value: f64, step: f64) -> f64 {
    (value / step).round() * step
}

/// Physical print dimensions for a pixel size at the given resolution.
pub fn compute_physical_dimensions(pixel_width: u32, pixel_height: u32, dpi: f64) -> PhysicalDimensions {
    let long_px = pixel_width.max(pixel_height) as f64;
    let short_px = pixel_width.min(pixel_height) as f64;

    PhysicalDimensions {
        long_side: round_to_step(long_px / dpi * CM_PER_INCH, SIZE_STEP_CM),
        short_side: round_to_step(short_px / dpi * CM_PER_INCH, SIZE_STEP_CM),
        orientation: Orientation::from_pixels(pixel_width, pixel_height),
    }
}

/// Consumer price for a print.
///
/// `gross_cost` must be non-negative; the result for negative input is unspecified.
pub fn compute_final_price(gross_cost: f64, is_extra_large: bool, min_margin: f64, vat_rate: f64) -> i64 {
    let margin_rate = if is_extra_large {
        MARGIN_RATE_EXTRA_LARGE
    } else {
        MARGIN_RATE
    };
    let margin = (gross_cost * margin_rate).max(min_margin);
    ((gross_cost + margin) * (1.0 + vat_rate)).round() as i64
}

/// `width / height` rounded to two decimals.
pub fn aspect_ratio(width: u32, height: u32) -> f64 {
    (width as f64 / height as f64 * 100.0).round() / 100.0
}

fn format_cm(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}

/// Pricing and sizing rules applied to every catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingPolicy {
    #[serde(default = "default_dpi")]
    pub dpi: f64,

    /// Per-format resolution, falling back to `dpi`
    #[serde(default)]
    pub dpi_overrides: BTreeMap<String, f64>,

    #[serde(default = "default_min_margin")]
    pub min_margin: f64,

    #[serde(default = "default_vat_rate")]
    pub vat_rate: f64,

    /// Printing cost per format code before margin and VAT
    #[serde(default = "default_gross_costs")]
    pub gross_costs: BTreeMap<String, f64>,

    /// Format codes priced with the extra-large margin rate
    #[serde(default = "default_extra_large_formats")]
    pub extra_large_formats: BTreeSet<String>,

    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_dpi() -> f64 {
    DEFAULT_DPI
}

fn default_min_margin() -> f64 {
    DEFAULT_MIN_MARGIN
}

fn default_vat_rate() -> f64 {
    DEFAULT_VAT_RATE
}

fn default_gross_costs() -> BTreeMap<String, f64> {
    BTreeMap::from([("L".to_string(), 250.0), ("XL".to_string(), 400.0)])
}

fn default_extra_large_formats() -> BTreeSet<String> {
    BTreeSet::from(["XL".to_string()])
}

fn default_currency_symbol() -> String {
    "€".to_string()
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            dpi: default_dpi(),
            dpi_overrides: BTreeMap::new(),
            min_margin: default_min_margin(),
            vat_rate: default_vat_rate(),
            gross_costs: default_gross_costs(),
            extra_large_formats: default_extra_large_formats(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

impl PricingPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if self.dpi <= 0.0 || self.dpi_overrides.values().any(|d| *d <= 0.0) {
            return Err("DPI must be positive".to_string());
        }
        if self.vat_rate < 0.0 {
            return Err("VAT rate cannot be negative".to_string());
        }
        if let Some((code, _)) = self.gross_costs.iter().find(|(_, cost)| **cost < 0.0) {
            return Err(format!("Gross cost for format '{}' cannot be negative", code));
        }
        Ok(())
    }

    /// Upper-case every format code. Layered config sources may fold map keys
    /// to lower case, while print formats are always upper case.
    pub fn canonicalize_format_codes(&mut self) {
        self.dpi_overrides = std::mem::take(&mut self.dpi_overrides)
            .into_iter()
            .map(|(code, dpi)| (code.to_uppercase(), dpi))
            .collect();
        self.gross_costs = std::mem::take(&mut self.gross_costs)
            .into_iter()
            .map(|(code, cost)| (code.to_uppercase(), cost))
            .collect();
        self.extra_large_formats = std::mem::take(&mut self.extra_large_formats)
            .into_iter()
            .map(|code| code.to_uppercase())
            .collect();
    }

    pub fn dpi_for(&self, format: &str) -> f64 {
        self.dpi_overrides.get(format).copied().unwrap_or(self.dpi)
    }

    pub fn is_extra_large(&self, format: &str) -> bool {
        self.extra_large_formats.contains(format)
    }

    /// Final price for a format, or `None` when the format is not sold.
    pub fn price_for(&self, format: &str) -> Option<i64> {
        if format == ARTIST_PROOF {
            return None;
        }
        self.gross_costs.get(format).map(|gross| {
            compute_final_price(*gross, self.is_extra_large(format), self.min_margin, self.vat_rate)
        })
    }

    pub fn format_price(&self, price: i64) -> String {
        format!("{}{}", self.currency_symbol, price)
    }

    /// Physical size label for one format of an image.
    pub fn dimensions_label(&self, format: &str, width: u32, height: u32) -> String {
        compute_physical_dimensions(width, height, self.dpi_for(format)).label()
    }
}
