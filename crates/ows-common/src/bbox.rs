//! Bounding box (GEOBBOX) parsing and formatting.

use serde::{Deserialize, Serialize};

/// A rectangular extent given by its lower and upper corners.
///
/// Coordinates are carried as given; axis order follows the CRS and is never
/// reinterpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lower_corner: (f64, f64),
    pub upper_corner: (f64, f64),
    pub srs_name: Option<String>,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            lower_corner: (min_x, min_y),
            upper_corner: (max_x, max_y),
            srs_name: None,
        }
    }

    pub fn with_srs_name(mut self, srs_name: impl Into<String>) -> Self {
        self.srs_name = Some(srs_name.into());
        self
    }

    /// Parse a KVP BBOX value: `minx,miny,maxx,maxy[,crs]`.
    ///
    /// Exactly four numbers are required; a fifth token, when present, is the
    /// CRS of the coordinates.
    pub fn from_kvp(s: &str) -> Result<Self, BboxParseError> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() != 4 && parts.len() != 5 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }

        let srs_name = match parts.get(4) {
            Some(crs) if crs.is_empty() => {
                return Err(BboxParseError::InvalidFormat(s.to_string()));
            }
            Some(crs) => Some(crs.to_string()),
            None => None,
        };

        Ok(Self {
            lower_corner: (parse_number(parts[0])?, parse_number(parts[1])?),
            upper_corner: (parse_number(parts[2])?, parse_number(parts[3])?),
            srs_name,
        })
    }

    /// Parse a GML/OWS corner position: two whitespace separated numbers.
    pub fn parse_corner(s: &str) -> Result<(f64, f64), BboxParseError> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.len() != 2 {
            return Err(BboxParseError::InvalidFormat(s.to_string()));
        }
        Ok((parse_number(parts[0])?, parse_number(parts[1])?))
    }

    /// The four coordinates with six decimals: `minx,miny,maxx,maxy`.
    pub fn coordinates_kvp(&self) -> String {
        format!(
            "{:.6},{:.6},{:.6},{:.6}",
            self.lower_corner.0, self.lower_corner.1, self.upper_corner.0, self.upper_corner.1
        )
    }

    /// KVP form, with the CRS appended when known.
    pub fn to_kvp(&self) -> String {
        match &self.srs_name {
            Some(srs_name) => format!("{},{}", self.coordinates_kvp(), srs_name),
            None => self.coordinates_kvp(),
        }
    }

    /// Corner as written inside XML position elements.
    pub fn format_corner(corner: (f64, f64)) -> String {
        format!("{} {}", corner.0, corner.1)
    }

    /// Width of the bounding box in coordinate units.
    pub fn width(&self) -> f64 {
        self.upper_corner.0 - self.lower_corner.0
    }

    /// Height of the bounding box in coordinate units.
    pub fn height(&self) -> f64 {
        self.upper_corner.1 - self.lower_corner.1
    }

    /// Lower corner lies above or right of the upper corner.
    pub fn is_inverted(&self) -> bool {
        self.width() < 0.0 || self.height() < 0.0
    }
}

fn parse_number(token: &str) -> Result<f64, BboxParseError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| BboxParseError::InvalidNumber(token.to_string()))
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BboxParseError {
    #[error("Invalid BBOX format: {0}. Expected 'minx,miny,maxx,maxy[,crs]'")]
    InvalidFormat(String),

    #[error("Invalid number in BBOX: {0}")]
    InvalidNumber(String),
}
