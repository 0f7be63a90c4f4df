use thiserror::Error;

/// A parsed latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Errors produced while parsing a `"lat,lon"` string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoordinateError {
    #[error("latLong must contain a latitude and a longitude separated by a comma")]
    MissingSeparator,
    #[error("invalid {axis} value: {raw}")]
    NotNumeric { axis: &'static str, raw: String },
}

impl Coordinates {
    /// Parses a `"lat,lon"` string, trimming whitespace around each half.
    ///
    /// Non-numeric or non-finite halves are rejected here instead of
    /// letting NaN coordinates reach the geocoder.
    pub fn parse(raw: &str) -> Result<Self, CoordinateError> {
        let (lat_raw, lon_raw) = raw
            .split_once(',')
            .ok_or(CoordinateError::MissingSeparator)?;

        let lat = parse_axis("latitude", lat_raw)?;
        let lon = parse_axis("longitude", lon_raw)?;

        Ok(Self { lat, lon })
    }
}

fn parse_axis(axis: &'static str, raw: &str) -> Result<f64, CoordinateError> {
    let trimmed = raw.trim();
    let not_numeric = || CoordinateError::NotNumeric {
        axis,
        raw: trimmed.to_string(),
    };

    // str::parse accepts "NaN" and "inf"; neither is a usable coordinate.
    let value: f64 = trimmed.parse().map_err(|_| not_numeric())?;
    if !value.is_finite() {
        return Err(not_numeric());
    }

    Ok(value)
}
