//! Tile request parameters.
//!
//! Parses the inbound `.../{z}/{x}/{y}` path and the `color` / `sport` query
//! values into a validated [`TileRequest`].

use std::fmt;
use std::str::FromStr;

use url::form_urlencoded;

use crate::error::TileParamError;

// =============================================================================
// Heat Color
// =============================================================================

/// Heatmap color scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Heat {
    Orange,
    /// The upstream default, also accepted as `red`
    #[default]
    Hot,
    Blue,
    BlueRed,
    Purple,
    Gray,
}

impl Heat {
    /// Token used in upstream tile paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Heat::Orange => "orange",
            Heat::Hot => "hot",
            Heat::Blue => "blue",
            Heat::BlueRed => "bluered",
            Heat::Purple => "purple",
            Heat::Gray => "gray",
        }
    }
}

impl FromStr for Heat {
    type Err = TileParamError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "orange" => Ok(Heat::Orange),
            "hot" | "red" => Ok(Heat::Hot),
            "blue" => Ok(Heat::Blue),
            "bluered" => Ok(Heat::BlueRed),
            "purple" => Ok(Heat::Purple),
            "gray" => Ok(Heat::Gray),
            _ => Err(TileParamError::BadQueryValue {
                param: "color",
                kind: "heat color",
                value: raw.to_string(),
            }),
        }
    }
}

impl fmt::Display for Heat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sport Filter
// =============================================================================

/// Activity type filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Sport {
    #[default]
    All,
    Ride,
    Run,
    Water,
    Winter,
}

impl Sport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::All => "all",
            Sport::Ride => "ride",
            Sport::Run => "run",
            Sport::Water => "water",
            Sport::Winter => "winter",
        }
    }
}

impl FromStr for Sport {
    type Err = TileParamError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "all" => Ok(Sport::All),
            "ride" => Ok(Sport::Ride),
            "run" => Ok(Sport::Run),
            "water" => Ok(Sport::Water),
            "winter" => Ok(Sport::Winter),
            _ => Err(TileParamError::BadQueryValue {
                param: "sport",
                kind: "sport",
                value: raw.to_string(),
            }),
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Coordinates
// =============================================================================

/// Zoom / column / row address of a map tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoords {
    pub z: u64,
    pub x: u64,
    pub y: u64,
}

impl TileCoords {
    pub fn new(z: u64, x: u64, y: u64) -> Self {
        Self { z, x, y }
    }

    /// Parse the last three `/`-separated segments of `path` as `z/x/y`.
    ///
    /// Anything before them is ignored. A path that does not end in three
    /// all-digit segments is [`TileParamError::NotFound`]; a digit string too
    /// large for a u64 is [`TileParamError::BadCoordinate`].
    pub fn from_path(path: &str) -> Result<Self, TileParamError> {
        let mut segments = path.rsplit('/');
        let y = segments.next().ok_or(TileParamError::NotFound)?;
        let x = segments.next().ok_or(TileParamError::NotFound)?;
        let z = segments.next().ok_or(TileParamError::NotFound)?;

        if ![z, x, y].iter().all(|s| is_digits(s)) {
            return Err(TileParamError::NotFound);
        }

        Ok(Self {
            z: parse_coordinate("z", z)?,
            x: parse_coordinate("x", x)?,
            y: parse_coordinate("y", y)?,
        })
    }
}

fn is_digits(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

fn parse_coordinate(name: &'static str, raw: &str) -> Result<u64, TileParamError> {
    raw.parse()
        .map_err(|_| TileParamError::BadCoordinate(name))
}

// =============================================================================
// Tile Request
// =============================================================================

/// A validated request for one heatmap tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRequest {
    pub coords: TileCoords,
    pub heat: Heat,
    pub sport: Sport,
}

impl TileRequest {
    /// Create a request with the default color and sport.
    pub fn new(z: u64, x: u64, y: u64) -> Self {
        Self {
            coords: TileCoords::new(z, x, y),
            heat: Heat::default(),
            sport: Sport::default(),
        }
    }

    pub fn with_heat(mut self, heat: Heat) -> Self {
        self.heat = heat;
        self
    }

    pub fn with_sport(mut self, sport: Sport) -> Self {
        self.sport = sport;
        self
    }

    /// Build a request from an inbound path and raw query string.
    ///
    /// Only the first `color` and `sport` values are used. An empty value is
    /// rejected like any other unknown value.
    pub fn from_parts(path: &str, query: Option<&str>) -> Result<Self, TileParamError> {
        let coords = TileCoords::from_path(path)?;

        let mut color = None;
        let mut sport = None;
        for (key, value) in form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
            match key.as_ref() {
                "color" if color.is_none() => color = Some(value.into_owned()),
                "sport" if sport.is_none() => sport = Some(value.into_owned()),
                _ => {}
            }
        }

        Ok(Self {
            coords,
            heat: color.as_deref().map(str::parse).transpose()?.unwrap_or_default(),
            sport: sport.as_deref().map(str::parse).transpose()?.unwrap_or_default(),
        })
    }
}
