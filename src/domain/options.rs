//! Print options accepted from callers and their validation rules.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::error::DomainError;

const PX_PER_INCH: f64 = 96.0;
const CM_PER_INCH: f64 = 2.54;
const MM_PER_INCH: f64 = 25.4;

/// CSS media type the page is rendered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Media {
    #[default]
    Print,
    Screen,
}

impl Media {
    pub fn as_str(self) -> &'static str {
        match self {
            Media::Print => "print",
            Media::Screen => "screen",
        }
    }
}

impl fmt::Display for Media {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Media {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "print" => Ok(Media::Print),
            "screen" => Ok(Media::Screen),
            other => Err(DomainError::validation(
                "media",
                format!("`{other}` is not one of print, screen"),
            )),
        }
    }
}

/// Paper size of the exported document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaperFormat {
    Letter,
    Legal,
    #[serde(alias = "Tabload")]
    Tabloid,
    Ledger,
    A0,
    A1,
    A2,
    A3,
    #[default]
    A4,
    A5,
}

impl PaperFormat {
    pub const ALL: [PaperFormat; 10] = [
        PaperFormat::Letter,
        PaperFormat::Legal,
        PaperFormat::Tabloid,
        PaperFormat::Ledger,
        PaperFormat::A0,
        PaperFormat::A1,
        PaperFormat::A2,
        PaperFormat::A3,
        PaperFormat::A4,
        PaperFormat::A5,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PaperFormat::Letter => "Letter",
            PaperFormat::Legal => "Legal",
            PaperFormat::Tabloid => "Tabloid",
            PaperFormat::Ledger => "Ledger",
            PaperFormat::A0 => "A0",
            PaperFormat::A1 => "A1",
            PaperFormat::A2 => "A2",
            PaperFormat::A3 => "A3",
            PaperFormat::A4 => "A4",
            PaperFormat::A5 => "A5",
        }
    }

    /// Portrait `(width, height)` in inches.
    pub fn size_inches(self) -> (f64, f64) {
        match self {
            PaperFormat::Letter => (8.5, 11.0),
            PaperFormat::Legal => (8.5, 14.0),
            PaperFormat::Tabloid => (11.0, 17.0),
            PaperFormat::Ledger => (17.0, 11.0),
            PaperFormat::A0 => (33.1, 46.8),
            PaperFormat::A1 => (23.4, 33.1),
            PaperFormat::A2 => (16.54, 23.4),
            PaperFormat::A3 => (11.7, 16.54),
            PaperFormat::A4 => (8.27, 11.7),
            PaperFormat::A5 => (5.83, 8.27),
        }
    }
}

impl fmt::Display for PaperFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaperFormat {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == "Tabload" {
            return Ok(PaperFormat::Tabloid);
        }
        PaperFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == value)
            .ok_or_else(|| {
                DomainError::validation(
                    "format",
                    format!("`{value}` is not a supported paper format"),
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Portrait,
    Landscape,
}

impl Layout {
    pub fn as_str(self) -> &'static str {
        match self {
            Layout::Portrait => "portrait",
            Layout::Landscape => "landscape",
        }
    }

    pub fn is_landscape(self) -> bool {
        matches!(self, Layout::Landscape)
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layout {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "portrait" => Ok(Layout::Portrait),
            "landscape" => Ok(Layout::Landscape),
            other => Err(DomainError::validation(
                "layout",
                format!("`{other}` is not one of portrait, landscape"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
    Px,
    In,
    Cm,
    Mm,
}

impl LengthUnit {
    fn suffix(self) -> &'static str {
        match self {
            LengthUnit::Px => "px",
            LengthUnit::In => "in",
            LengthUnit::Cm => "cm",
            LengthUnit::Mm => "mm",
        }
    }
}

/// A page margin such as `10px`, `1cm` or `0.5in`. Bare numbers are pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DimensionRepr", into = "String")]
pub struct Dimension {
    value: f64,
    unit: LengthUnit,
}

impl Dimension {
    pub fn new(value: f64, unit: LengthUnit) -> Self {
        Self { value, unit }
    }

    pub fn to_inches(self) -> f64 {
        match self.unit {
            LengthUnit::Px => self.value / PX_PER_INCH,
            LengthUnit::In => self.value,
            LengthUnit::Cm => self.value / CM_PER_INCH,
            LengthUnit::Mm => self.value / MM_PER_INCH,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}

impl FromStr for Dimension {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim().to_ascii_lowercase();
        let (number, unit) = [LengthUnit::Px, LengthUnit::In, LengthUnit::Cm, LengthUnit::Mm]
            .into_iter()
            .find_map(|unit| {
                trimmed
                    .strip_suffix(unit.suffix())
                    .map(|number| (number.trim_end().to_string(), unit))
            })
            .unwrap_or((trimmed.clone(), LengthUnit::Px));

        let value = number.parse::<f64>().map_err(|_| {
            DomainError::validation("margin", format!("`{raw}` is not a valid dimension"))
        })?;
        if !value.is_finite() || value < 0.0 {
            return Err(DomainError::validation(
                "margin",
                format!("`{raw}` must be a non-negative length"),
            ));
        }

        Ok(Self { value, unit })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DimensionRepr {
    Number(f64),
    Text(String),
}

impl TryFrom<DimensionRepr> for Dimension {
    type Error = DomainError;

    fn try_from(repr: DimensionRepr) -> Result<Self, Self::Error> {
        match repr {
            DimensionRepr::Number(value) => format!("{value}px").parse(),
            DimensionRepr::Text(text) => text.parse(),
        }
    }
}

impl From<Dimension> for String {
    fn from(dimension: Dimension) -> Self {
        dimension.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Margin {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<Dimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottom: Option<Dimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<Dimension>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<Dimension>,
}

/// Rendering options for a single print job.
///
/// Unknown fields are ignored on deserialization; unknown values for known
/// fields are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrintOptions {
    pub media: Media,
    pub format: PaperFormat,
    pub background: bool,
    pub layout: Layout,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<Margin>,
    pub scale: f64,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            media: Media::Print,
            format: PaperFormat::A4,
            background: true,
            layout: Layout::Portrait,
            margin: None,
            scale: 1.0,
        }
    }
}

impl PrintOptions {
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(DomainError::validation(
                "scale",
                format!("{} must be a positive number", self.scale),
            ));
        }
        Ok(())
    }
}
