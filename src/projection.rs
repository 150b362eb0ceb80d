use crate::error::MapError;
use crate::types::RegionFeature;
use geo::{Coord, CoordsIter, MapCoords, MultiPolygon};

/// Albers equal-area conic parameters for the contiguous US, matching the
/// projection the original view was built around.
const STANDARD_PARALLELS: (f64, f64) = (29.5, 45.5);
const CENTRAL_MERIDIAN: f64 = -96.0;
const ORIGIN_LATITUDE: f64 = 38.5;

/// A fitted projection: the conic transform plus the translation and
/// uniform scale that place the geometry extent inside the viewport.
/// Fitting is deterministic for identical inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    n: f64,
    c: f64,
    rho0: f64,
    scale: f64,
    center: (f64, f64),
    viewport: (f64, f64),
}

impl Projection {
    /// Fit the projection so the full collection extent fills the viewport
    /// while preserving relative shape. Fails on an empty collection;
    /// callers never get an unfit handle.
    pub fn fit(features: &[RegionFeature], viewport: (f64, f64)) -> Result<Self, MapError> {
        let phi1 = STANDARD_PARALLELS.0.to_radians();
        let phi2 = STANDARD_PARALLELS.1.to_radians();
        let n = (phi1.sin() + phi2.sin()) / 2.0;
        let c = phi1.cos().powi(2) + 2.0 * n * phi1.sin();
        let rho0 = (c - 2.0 * n * ORIGIN_LATITUDE.to_radians().sin()).sqrt() / n;

        let mut projection = Projection {
            n,
            c,
            rho0,
            scale: 1.0,
            center: (0.0, 0.0),
            viewport,
        };

        let mut min = (f64::INFINITY, f64::INFINITY);
        let mut max = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        let mut seen = false;
        for feature in features {
            for coord in feature.geometry.coords_iter() {
                let (x, y) = projection.raw_forward(coord.x, coord.y);
                if !x.is_finite() || !y.is_finite() {
                    continue;
                }
                seen = true;
                min.0 = min.0.min(x);
                min.1 = min.1.min(y);
                max.0 = max.0.max(x);
                max.1 = max.1.max(y);
            }
        }
        if !seen {
            return Err(MapError::EmptyGeometry);
        }

        let extent = (max.0 - min.0, max.1 - min.1);
        let sx = if extent.0 > 0.0 {
            viewport.0 / extent.0
        } else {
            f64::INFINITY
        };
        let sy = if extent.1 > 0.0 {
            viewport.1 / extent.1
        } else {
            f64::INFINITY
        };
        let scale = sx.min(sy);
        // A single-point extent has no usable ratio; fall back to unit scale.
        projection.scale = if scale.is_finite() { scale } else { 1.0 };
        projection.center = ((min.0 + max.0) / 2.0, (min.1 + max.1) / 2.0);
        Ok(projection)
    }

    /// Geographic (lon, lat) degrees to screen (x, y), y growing downward.
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let (x, y) = self.raw_forward(lon, lat);
        (
            (x - self.center.0) * self.scale + self.viewport.0 / 2.0,
            (self.center.1 - y) * self.scale + self.viewport.1 / 2.0,
        )
    }

    /// Screen (x, y) back to geographic (lon, lat) degrees. Exact inverse
    /// of `forward` for the same fitted handle, up to floating point.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let rx = (x - self.viewport.0 / 2.0) / self.scale + self.center.0;
        let ry = self.center.1 - (y - self.viewport.1 / 2.0) / self.scale;
        self.raw_inverse(rx, ry)
    }

    /// Forward-map every coordinate of a geometry into screen space.
    pub fn project_geometry(&self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        geometry.map_coords(|coord| {
            let (x, y) = self.forward(coord.x, coord.y);
            Coord { x, y }
        })
    }

    // Snyder's spherical Albers forward, unit sphere, y up.
    fn raw_forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let phi = lat.to_radians();
        let lambda = (lon - CENTRAL_MERIDIAN).to_radians();
        let rho = (self.c - 2.0 * self.n * phi.sin()).sqrt() / self.n;
        let theta = self.n * lambda;
        (rho * theta.sin(), self.rho0 - rho * theta.cos())
    }

    fn raw_inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let rho0_y = self.rho0 - y;
        let rho = (x * x + rho0_y * rho0_y).sqrt();
        let theta = x.atan2(rho0_y);
        let sin_phi = ((self.c - rho * rho * self.n * self.n) / (2.0 * self.n)).clamp(-1.0, 1.0);
        let phi = sin_phi.asin();
        let lambda = theta / self.n;
        (lambda.to_degrees() + CENTRAL_MERIDIAN, phi.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};

    fn square(id: &str, x0: f64, y0: f64, size: f64) -> RegionFeature {
        let ring = polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
            (x: x0, y: y0),
        ];
        RegionFeature {
            id: id.to_string(),
            name: id.to_string(),
            geometry: MultiPolygon::new(vec![ring]),
        }
    }

    fn fitted() -> Projection {
        let features = vec![square("06", -120.0, 32.0, 8.0), square("36", -80.0, 40.0, 6.0)];
        Projection::fit(&features, (960.0, 600.0)).unwrap()
    }

    #[test]
    fn empty_collection_fails_to_fit() {
        assert_eq!(
            Projection::fit(&[], (960.0, 600.0)),
            Err(MapError::EmptyGeometry)
        );
    }

    #[test]
    fn fit_is_deterministic() {
        let a = fitted();
        let b = fitted();
        assert_eq!(a, b);
        assert_eq!(a.forward(-100.0, 38.0), b.forward(-100.0, 38.0));
    }

    #[test]
    fn round_trips_screen_coordinates() {
        let projection = fitted();
        for &(x, y) in &[(100.0, 100.0), (480.0, 300.0), (812.5, 41.25), (30.0, 555.0)] {
            let (lon, lat) = projection.inverse(x, y);
            let (rx, ry) = projection.forward(lon, lat);
            assert!((rx - x).abs() < 1e-6, "x: {rx} vs {x}");
            assert!((ry - y).abs() < 1e-6, "y: {ry} vs {y}");
        }
    }

    #[test]
    fn round_trips_geographic_coordinates() {
        let projection = fitted();
        for &(lon, lat) in &[(-118.0, 34.0), (-96.0, 38.5), (-77.0, 42.9)] {
            let (x, y) = projection.forward(lon, lat);
            let (rlon, rlat) = projection.inverse(x, y);
            assert!((rlon - lon).abs() < 1e-9, "lon: {rlon} vs {lon}");
            assert!((rlat - lat).abs() < 1e-9, "lat: {rlat} vs {lat}");
        }
    }

    #[test]
    fn fitted_extent_stays_inside_viewport() {
        let features = vec![square("06", -120.0, 32.0, 8.0), square("36", -80.0, 40.0, 6.0)];
        let projection = Projection::fit(&features, (960.0, 600.0)).unwrap();
        for feature in &features {
            for coord in feature.geometry.coords_iter() {
                let (x, y) = projection.forward(coord.x, coord.y);
                assert!((-1e-6..=960.0 + 1e-6).contains(&x));
                assert!((-1e-6..=600.0 + 1e-6).contains(&y));
            }
        }
    }
}
