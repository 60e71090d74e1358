use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::page::PageBox;

pub const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;

const ASPECT_ERROR: &str = "aspect must be a float, 'equal', or 'auto'";
const SCALE_ERROR: &str = "scale must be positive";

/// Converts TeX points to inches.
pub fn convert_pt_to_inches(pt: f64) -> f64 {
    pt * 12.0 * 249.0 / 250.0 / 864.0
}

/// Converts inches to TeX points.
pub fn convert_inches_to_pt(inches: f64) -> f64 {
    inches * 864.0 * 250.0 / 249.0 / 12.0
}

/// Drops everything past the first decimal. This truncates toward zero
/// rather than rounding, so 2.99 becomes 2.9.
fn truncate_tenths(value: f64) -> f64 {
    (10.0 * value).trunc() / 10.0
}

/// Width-to-height ratio of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aspect {
    Ratio(f64),
    /// Square cells, same as `Ratio(1.0)`.
    Equal,
    /// Ignore the aspect and fill the scaled page box.
    Auto,
}

impl Default for Aspect {
    fn default() -> Self {
        Self::Ratio(GOLDEN_RATIO)
    }
}

impl FromStr for Aspect {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "equal" => Ok(Self::Equal),
            "auto" | "fill" => Ok(Self::Auto),
            other => match other.parse::<f64>() {
                Ok(ratio) if ratio.is_finite() && ratio > 0.0 => Ok(Self::Ratio(ratio)),
                _ => Err(AppError::invalid_argument(ASPECT_ERROR)),
            },
        }
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ratio(ratio) => write!(f, "{ratio}"),
            Self::Equal => f.write_str("equal"),
            Self::Auto => f.write_str("auto"),
        }
    }
}

impl From<f64> for Aspect {
    fn from(ratio: f64) -> Self {
        Self::Ratio(ratio)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FigsizeParams {
    pub nrows: usize,
    pub ncols: usize,
    pub scale: f64,
    pub aspect: Aspect,
    pub height_ratios: Option<Vec<f64>>,
    pub width_ratios: Option<Vec<f64>>,
}

impl Default for FigsizeParams {
    fn default() -> Self {
        Self {
            nrows: 1,
            ncols: 1,
            scale: 1.0,
            aspect: Aspect::default(),
            height_ratios: None,
            width_ratios: None,
        }
    }
}

impl FigsizeParams {
    pub fn grid(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            ..Self::default()
        }
    }

    /// The ratios actually used: explicit ones, or all ones.
    pub fn resolved_ratios(&self) -> (Vec<f64>, Vec<f64>) {
        let width = self
            .width_ratios
            .clone()
            .unwrap_or_else(|| vec![1.0; self.ncols]);
        let height = self
            .height_ratios
            .clone()
            .unwrap_or_else(|| vec![1.0; self.nrows]);
        (width, height)
    }

    fn validate(&self) -> AppResult<()> {
        if !self.scale.is_finite() || self.scale < 0.0 {
            return Err(AppError::invalid_argument(SCALE_ERROR));
        }
        if let Aspect::Ratio(ratio) = self.aspect
            && !(ratio.is_finite() && ratio > 0.0)
        {
            return Err(AppError::invalid_argument(ASPECT_ERROR));
        }
        if self.nrows == 0 || self.ncols == 0 {
            return Err(AppError::invalid_argument(format!(
                "grid must have at least one row and column, got {}x{}",
                self.nrows, self.ncols
            )));
        }
        check_ratio_len("width_ratios", self.width_ratios.as_deref(), self.ncols, "ncols")?;
        check_ratio_len("height_ratios", self.height_ratios.as_deref(), self.nrows, "nrows")?;
        Ok(())
    }
}

fn check_ratio_len(
    name: &str,
    ratios: Option<&[f64]>,
    expected: usize,
    dim: &str,
) -> AppResult<()> {
    match ratios {
        Some(ratios) if ratios.len() != expected => Err(AppError::invalid_argument(format!(
            "{name} has {} entries but {dim} is {expected}",
            ratios.len()
        ))),
        _ => Ok(()),
    }
}

/// Figure dimensions in inches, truncated to one decimal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FigureSize {
    pub width_in: f64,
    pub height_in: f64,
}

impl FigureSize {
    pub fn as_tuple(&self) -> (f64, f64) {
        (self.width_in, self.height_in)
    }
}

impl fmt::Display for FigureSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.width_in, self.height_in)
    }
}

/// Computes the figure size for `params` inside `page_box`.
///
/// With a numeric aspect the width takes the full scaled page width and the
/// height follows from the aspect and the grid's row/column weights. If that
/// height overflows the page, both sides shrink until the height fits, so
/// the aspect survives and the width is what gets sacrificed.
/// `Aspect::Auto` fills the scaled page box regardless of grid shape.
pub fn figsize(page_box: PageBox, params: &FigsizeParams) -> AppResult<FigureSize> {
    params.validate()?;

    let (width_ratios, height_ratios) = params.resolved_ratios();
    let (max_width_pt, max_height_pt) = page_box.get();
    let scale = params.scale;

    let aspect = match params.aspect {
        Aspect::Ratio(ratio) => Some(ratio),
        Aspect::Equal => Some(1.0),
        Aspect::Auto => None,
    };

    let (width_pt, height_pt) = match aspect {
        Some(aspect) => {
            let width_sum: f64 = width_ratios.iter().sum();
            let height_sum: f64 = height_ratios.iter().sum();
            if !(width_sum > 0.0 && height_sum > 0.0) {
                return Err(AppError::invalid_argument(
                    "width_ratios and height_ratios must have positive sums",
                ));
            }

            let mut width_pt = max_width_pt * scale;
            let mut height_pt = width_pt / aspect * (height_sum / width_sum);
            if height_pt > max_height_pt {
                width_pt *= max_height_pt / height_pt;
                height_pt = max_height_pt;
            }
            (width_pt, height_pt)
        }
        None => (scale * max_width_pt, scale * max_height_pt),
    };

    Ok(FigureSize {
        width_in: truncate_tenths(convert_pt_to_inches(width_pt)),
        height_in: truncate_tenths(convert_pt_to_inches(height_pt)),
    })
}
