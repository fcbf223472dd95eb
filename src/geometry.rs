//! Point clouds and bounding boxes.
//!
//! A point cloud is three parallel `Vec<f64>` axes, not a `Vec` of per-point
//! structs, so the grid builder streams over it with sequential reads that
//! feed the CPU cache instead of chasing heap pointers.

use crate::error::{Axis, PairCountError, Result};

/// Three parallel coordinate arrays of equal length. Order is irrelevant to
/// pair counts; [`crate::grid::Lattice`] is free to permute points when it
/// bins them into cells.
#[derive(Debug, Clone)]
pub struct PointCloud {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl PointCloud {
    /// Builds a point cloud from three equal-length axis arrays.
    ///
    /// # Panics
    /// Panics if the three arrays differ in length — this is a programmer
    /// error at construction time, not a runtime condition the caller
    /// recovers from, so it is not part of [`PairCountError`].
    pub fn new(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Self {
        assert_eq!(x.len(), y.len(), "coordinate array length mismatch");
        assert_eq!(y.len(), z.len(), "coordinate array length mismatch");
        Self { x, y, z }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Axis-aligned bounding box. Invariant: every point of the clouds it was
/// built for lies inside it — checked by [`BoundingBox::validate`], not
/// assumed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub zmin: f64,
    pub zmax: f64,
}

impl BoundingBox {
    pub fn new(
        xmin: f64,
        xmax: f64,
        ymin: f64,
        ymax: f64,
        zmin: f64,
        zmax: f64,
    ) -> Result<Self> {
        let bbox = Self {
            xmin,
            xmax,
            ymin,
            ymax,
            zmin,
            zmax,
        };
        bbox.validate_extent()?;
        Ok(bbox)
    }

    fn validate_extent(&self) -> Result<()> {
        if self.xmax <= self.xmin {
            return Err(PairCountError::InvalidGeometry {
                axis: Axis::X,
                detail: format!("xmax ({}) <= xmin ({})", self.xmax, self.xmin),
            });
        }
        if self.ymax <= self.ymin {
            return Err(PairCountError::InvalidGeometry {
                axis: Axis::Y,
                detail: format!("ymax ({}) <= ymin ({})", self.ymax, self.ymin),
            });
        }
        if self.zmax <= self.zmin {
            return Err(PairCountError::InvalidGeometry {
                axis: Axis::Z,
                detail: format!("zmax ({}) <= zmin ({})", self.zmax, self.zmin),
            });
        }
        Ok(())
    }

    /// Checks that every point of `cloud` lies inside the box. Called once
    /// at the start of [`crate::grid::build`] rather than trusted silently.
    pub fn validate_contains(&self, cloud: &PointCloud) -> Result<()> {
        for i in 0..cloud.len() {
            let (x, y, z) = (cloud.x[i], cloud.y[i], cloud.z[i]);
            if x < self.xmin || x > self.xmax {
                return Err(PairCountError::InvalidGeometry {
                    axis: Axis::X,
                    detail: format!(
                        "point {i} has x = {x}, outside [{}, {}]",
                        self.xmin, self.xmax
                    ),
                });
            }
            if y < self.ymin || y > self.ymax {
                return Err(PairCountError::InvalidGeometry {
                    axis: Axis::Y,
                    detail: format!(
                        "point {i} has y = {y}, outside [{}, {}]",
                        self.ymin, self.ymax
                    ),
                });
            }
            if z < self.zmin || z > self.zmax {
                return Err(PairCountError::InvalidGeometry {
                    axis: Axis::Z,
                    detail: format!(
                        "point {i} has z = {z}, outside [{}, {}]",
                        self.zmin, self.zmax
                    ),
                });
            }
        }
        Ok(())
    }

    #[inline]
    pub fn extent_x(&self) -> f64 {
        self.xmax - self.xmin
    }

    #[inline]
    pub fn extent_y(&self) -> f64 {
        self.ymax - self.ymin
    }

    #[inline]
    pub fn extent_z(&self) -> f64 {
        self.zmax - self.zmin
    }
}
