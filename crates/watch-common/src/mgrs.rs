//! MGRS grid-cell resolution.
//!
//! Resolves 5-character MGRS references ("10SEG": grid zone designator plus
//! 100 km square identifier) to the geographic center of the referenced
//! square. The square identifier is decoded with the standard MGRS lettering
//! scheme (six-set column/row cycle, I and O skipped, latitude band
//! disambiguating the 2,000 km row repeat), then the UTM center point is
//! converted to WGS84 with the inverse transverse Mercator series.

use crate::bbox::BoundingBox;
use crate::error::{WatchError, WatchResult};

/// WGS84 semi-major axis in meters.
const WGS84_A: f64 = 6_378_137.0;
/// WGS84 first eccentricity squared.
const WGS84_ECC_SQ: f64 = 0.006_694_38;
/// Transverse Mercator scale factor at the central meridian.
const K0: f64 = 0.9996;
/// UTM false easting in meters.
const FALSE_EASTING: f64 = 500_000.0;
/// False northing applied in the southern hemisphere, in meters.
const FALSE_NORTHING: f64 = 10_000_000.0;

/// Column letter origin for each of the six 100 km sets.
const SET_ORIGIN_COLUMNS: [u8; 6] = [b'A', b'J', b'S', b'A', b'J', b'S'];
/// Row letter origin for each of the six 100 km sets.
const SET_ORIGIN_ROWS: [u8; 6] = [b'A', b'F', b'A', b'F', b'A', b'F'];

/// Side of a 100 km grid square, in meters.
const SQUARE_SIZE_M: f64 = 100_000.0;
/// Half the side of a 100 km grid square, in kilometers.
const HALF_SQUARE_KM: f64 = 50.0;

/// A parsed 5-character MGRS reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GridRef {
    /// UTM zone number, 1-60.
    zone: u8,
    /// Latitude band letter, C-X without I and O.
    band: u8,
    /// 100 km square column letter.
    column: u8,
    /// 100 km square row letter.
    row: u8,
}

/// Resolve an MGRS cell to the bounding box used for catalog queries: a
/// square centered on the cell's center point, spanning 100 km in each axis
/// with the longitude extent corrected by the cosine of latitude.
pub fn locate(cell: &str) -> WatchResult<BoundingBox> {
    let (lat, lon) = cell_center(cell)?;
    let bbox = BoundingBox::square_around(lat, lon, HALF_SQUARE_KM);
    if !bbox.is_valid() {
        return Err(invalid(cell, "degenerate bounding box"));
    }
    Ok(bbox)
}

/// Geographic center of the cell's 100 km square as (latitude, longitude)
/// in degrees.
pub fn cell_center(cell: &str) -> WatchResult<(f64, f64)> {
    let gref = parse(cell)?;

    let set = ((gref.zone as usize) - 1) % 6;
    let easting = column_easting(gref.column, set);
    let mut northing = row_northing(gref.row, set);

    // Row letters repeat every 2,000 km; the latitude band picks the cycle.
    let min_northing = band_min_northing(gref.band);
    while northing < min_northing {
        northing += 2_000_000.0;
    }

    // Center of the square rather than its southwest corner.
    let center_easting = easting + SQUARE_SIZE_M / 2.0;
    let center_northing = northing + SQUARE_SIZE_M / 2.0;

    let southern = gref.band < b'N';
    let (lat, lon) = utm_to_geographic(gref.zone, center_easting, center_northing, southern);

    if !lat.is_finite() || !lon.is_finite() || lat.abs() > 90.0 || lon.abs() > 180.0 {
        return Err(invalid(cell, "conversion produced an out-of-range coordinate"));
    }
    Ok((lat, lon))
}

fn invalid(cell: &str, message: &str) -> WatchError {
    WatchError::InvalidCoordinate {
        cell: cell.to_string(),
        message: message.to_string(),
    }
}

fn parse(cell: &str) -> WatchResult<GridRef> {
    let trimmed = cell.trim().to_ascii_uppercase();
    let bytes = trimmed.as_bytes();

    let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 || digits > 2 || bytes.len() != digits + 3 {
        return Err(invalid(cell, "expected zone digits followed by three letters"));
    }

    let zone: u8 = trimmed[..digits]
        .parse()
        .map_err(|_| invalid(cell, "unparseable zone number"))?;
    if zone == 0 || zone > 60 {
        return Err(invalid(cell, "zone number out of range 1-60"));
    }

    let band = bytes[digits];
    let column = bytes[digits + 1];
    let row = bytes[digits + 2];

    if !(b'C'..=b'X').contains(&band) || band == b'I' || band == b'O' {
        return Err(invalid(cell, "latitude band must be C-X without I or O"));
    }
    if !column.is_ascii_uppercase() || column == b'I' || column == b'O' {
        return Err(invalid(cell, "invalid 100 km column letter"));
    }
    if !(b'A'..=b'V').contains(&row) || row == b'I' || row == b'O' {
        return Err(invalid(cell, "invalid 100 km row letter"));
    }

    Ok(GridRef {
        zone,
        band,
        column,
        row,
    })
}

/// Easting in meters of a 100 km column letter within its zone's set.
///
/// Counts forward from the set's origin letter, skipping I and O and
/// wrapping after Z; the first column of a set sits at 100 km easting.
fn column_easting(column: u8, set: usize) -> f64 {
    let mut cur = SET_ORIGIN_COLUMNS[set];
    let mut easting = SQUARE_SIZE_M;
    while cur != column {
        cur += 1;
        if cur == b'I' {
            cur += 1;
        }
        if cur == b'O' {
            cur += 1;
        }
        if cur > b'Z' {
            cur = b'A';
        }
        easting += SQUARE_SIZE_M;
    }
    easting
}

/// Northing in meters of a 100 km row letter within its zone's set, before
/// the latitude-band cycle adjustment. Rows run A-V, skipping I and O.
fn row_northing(row: u8, set: usize) -> f64 {
    let mut cur = SET_ORIGIN_ROWS[set];
    let mut northing = 0.0;
    while cur != row {
        cur += 1;
        if cur == b'I' {
            cur += 1;
        }
        if cur == b'O' {
            cur += 1;
        }
        if cur > b'V' {
            cur = b'A';
        }
        northing += SQUARE_SIZE_M;
    }
    northing
}

/// Minimum northing in meters for a latitude band, used to pick the right
/// 2,000 km row-letter cycle.
fn band_min_northing(band: u8) -> f64 {
    match band {
        b'C' => 1_100_000.0,
        b'D' => 2_000_000.0,
        b'E' => 2_800_000.0,
        b'F' => 3_700_000.0,
        b'G' => 4_600_000.0,
        b'H' => 5_500_000.0,
        b'J' => 6_400_000.0,
        b'K' => 7_300_000.0,
        b'L' => 8_200_000.0,
        b'M' => 9_100_000.0,
        b'N' => 0.0,
        b'P' => 800_000.0,
        b'Q' => 1_700_000.0,
        b'R' => 2_600_000.0,
        b'S' => 3_500_000.0,
        b'T' => 4_400_000.0,
        b'U' => 5_300_000.0,
        b'V' => 6_200_000.0,
        b'W' => 7_000_000.0,
        b'X' => 7_900_000.0,
        _ => 0.0,
    }
}

/// Inverse transverse Mercator: UTM easting/northing to geographic degrees.
///
/// Standard series expansion on the WGS84 ellipsoid: recover the footpoint
/// latitude from the meridional arc, then correct for the easting offset.
/// Accurate to well under a meter across a zone, far tighter than the 100 km
/// cells this module resolves.
fn utm_to_geographic(zone: u8, easting: f64, northing: f64, southern: bool) -> (f64, f64) {
    let ecc = WGS84_ECC_SQ;
    let ecc_prime = ecc / (1.0 - ecc);
    let e1 = (1.0 - (1.0 - ecc).sqrt()) / (1.0 + (1.0 - ecc).sqrt());

    let x = easting - FALSE_EASTING;
    let y = if southern {
        northing - FALSE_NORTHING
    } else {
        northing
    };

    // Meridional arc and footpoint latitude.
    let m = y / K0;
    let mu = m / (WGS84_A
        * (1.0 - ecc / 4.0 - 3.0 * ecc * ecc / 64.0 - 5.0 * ecc * ecc * ecc / 256.0));

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let n1 = WGS84_A / (1.0 - ecc * sin_phi1 * sin_phi1).sqrt();
    let t1 = tan_phi1 * tan_phi1;
    let c1 = ecc_prime * cos_phi1 * cos_phi1;
    let r1 = WGS84_A * (1.0 - ecc) / (1.0 - ecc * sin_phi1 * sin_phi1).powf(1.5);
    let d = x / (n1 * K0);

    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d * d / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ecc_prime) * d.powi(4)
                    / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                    - 252.0 * ecc_prime
                    - 3.0 * c1 * c1)
                    * d.powi(6)
                    / 720.0);

    let lon = (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
        + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ecc_prime + 24.0 * t1 * t1)
            * d.powi(5)
            / 120.0)
        / cos_phi1;

    let central_meridian = ((zone as f64) - 1.0) * 6.0 - 180.0 + 3.0;
    (lat.to_degrees(), central_meridian + lon.to_degrees())
}
