//! Geofencing
//!
//! Circular venue checks using great-circle (haversine) distance. Events
//! without a registered venue are treated as virtual and accept any fix.

use thiserror::Error;

/// Mean Earth radius used for haversine distance, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Default admission radius around a venue, in kilometres.
pub const DEFAULT_RADIUS_KM: f64 = 0.5;

/// Errors raised for malformed geographic input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeofenceError {
    /// Latitude outside `[-90, 90]` or not finite.
    #[error("latitude {0} is outside [-90, 90]")]
    InvalidLatitude(f64),

    /// Longitude outside `[-180, 180]` or not finite.
    #[error("longitude {0} is outside [-180, 180]")]
    InvalidLongitude(f64),

    /// Radius that is not a positive finite number.
    #[error("radius {0} km must be positive")]
    InvalidRadius(f64),
}

/// A validated latitude/longitude pair, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Validate and build a coordinate.
    ///
    /// # Errors
    ///
    /// Returns an error when either component is out of range or not finite.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeofenceError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GeofenceError::InvalidLatitude(latitude));
        }

        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeofenceError::InvalidLongitude(longitude));
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance to `other`, in kilometres.
    #[must_use]
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_KM * c
    }
}

/// A circular admission area around a venue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geofence {
    center: Coordinate,
    radius_km: f64,
}

impl Geofence {
    /// Build a geofence.
    ///
    /// # Errors
    ///
    /// Returns an error when the radius is not a positive finite number.
    pub fn new(center: Coordinate, radius_km: f64) -> Result<Self, GeofenceError> {
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(GeofenceError::InvalidRadius(radius_km));
        }

        Ok(Self { center, radius_km })
    }

    /// Venue coordinate.
    #[must_use]
    pub const fn center(&self) -> Coordinate {
        self.center
    }

    /// Admission radius in kilometres.
    #[must_use]
    pub const fn radius_km(&self) -> f64 {
        self.radius_km
    }

    /// Check `fix` against this fence.
    ///
    /// # Errors
    ///
    /// Returns [`OutsideGeofence`] when the fix is further than the radius.
    pub fn check(&self, fix: &Coordinate) -> Result<f64, OutsideGeofence> {
        let distance_km = self.center.distance_km(fix);

        if distance_km > self.radius_km {
            return Err(OutsideGeofence {
                distance_km,
                radius_km: self.radius_km,
            });
        }

        Ok(distance_km)
    }
}

/// A fix that landed outside the venue radius.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("you are {distance_km:.2} km from the venue; check-in requires being within {radius_km:.2} km")]
pub struct OutsideGeofence {
    /// Measured distance from the venue.
    pub distance_km: f64,

    /// Radius that was exceeded.
    pub radius_km: f64,
}

/// Accepted location check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationVerdict {
    /// Event has no venue, any location is accepted.
    Virtual,

    /// Fix was inside the venue radius.
    OnSite {
        /// Measured distance from the venue.
        distance_km: f64,
    },
}

/// Validate a raw GPS fix against an optional venue.
///
/// The fix is range-checked before any distance is computed, even for virtual
/// events, so garbage input is always rejected as malformed.
///
/// # Errors
///
/// The outer error reports malformed input; the inner one reports a fix that
/// was well-formed but outside the fence.
pub fn validate_location(
    latitude: f64,
    longitude: f64,
    venue: Option<&Geofence>,
) -> Result<Result<LocationVerdict, OutsideGeofence>, GeofenceError> {
    let fix = Coordinate::new(latitude, longitude)?;

    let Some(venue) = venue else {
        return Ok(Ok(LocationVerdict::Virtual));
    };

    Ok(venue
        .check(&fix)
        .map(|distance_km| LocationVerdict::OnSite { distance_km }))
}
