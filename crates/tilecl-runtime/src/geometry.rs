use core::fmt::Display;

use crate::error::GeometryError;

/// Name of the generated header fragment holding the tiling constants.
pub const TILING_HEADER_NAME: &str = "const.h";

/// Tiling constants shared by the host launch geometry and the device kernels.
///
/// The same value renders the header prepended to every program and computes the launch
/// geometry, so the host and device sides can't disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TileConfig {
    /// Edge length of the square output tile computed by one work-group.
    #[serde(default = "default_tile_size")]
    pub tile_size: usize,
    /// Output rows computed by each work-item.
    #[serde(default = "default_elems_per_thread")]
    pub elems_per_thread: usize,
}

fn default_tile_size() -> usize {
    32
}

fn default_elems_per_thread() -> usize {
    4
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            tile_size: default_tile_size(),
            elems_per_thread: default_elems_per_thread(),
        }
    }
}

impl TileConfig {
    /// Create a checked tiling configuration.
    pub fn new(tile_size: usize, elems_per_thread: usize) -> Result<Self, GeometryError> {
        let config = Self {
            tile_size,
            elems_per_thread,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that a tile splits evenly between work-items.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.tile_size == 0
            || self.elems_per_thread == 0
            || self.tile_size % self.elems_per_thread != 0
        {
            return Err(GeometryError::InvalidTiling {
                tile_size: self.tile_size,
                elems_per_thread: self.elems_per_thread,
            });
        }
        Ok(())
    }

    /// Rows of a tile covered by one pass of a work-group.
    pub fn rows_per_pass(&self) -> usize {
        self.tile_size / self.elems_per_thread
    }

    /// Render the header fragment defining the tiling constants for the device compiler.
    pub fn header(&self) -> String {
        format!(
            "#ifndef TILECL_CONST_H\n\
             #define TILECL_CONST_H\n\
             \n\
             #ifdef TILE_SIZE\n\
             #error Redefinition of TILE_SIZE\n\
             #else\n\
             #define TILE_SIZE {}\n\
             #endif\n\
             \n\
             #ifdef ELEMS_PER_THREAD\n\
             #error Redefinition of ELEMS_PER_THREAD\n\
             #else\n\
             #define ELEMS_PER_THREAD {}\n\
             #endif\n\
             \n\
             #endif\n",
            self.tile_size, self.elems_per_thread
        )
    }
}

/// Extent of a launch along up to two axes.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkSize {
    /// Extent along the first axis.
    pub x: usize,
    /// Extent along the second axis.
    pub y: usize,
}

impl WorkSize {
    /// A one dimensional extent.
    pub fn new_1d(x: usize) -> Self {
        Self { x, y: 1 }
    }

    /// Total number of elements covered.
    pub fn num_elems(&self) -> usize {
        self.x * self.y
    }

    /// The extents as an array, truncated to `dims` axes.
    pub fn as_slice(&self, dims: u32) -> Vec<usize> {
        [self.x, self.y][..dims as usize].to_vec()
    }
}

impl Display for WorkSize {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Global and local work sizes of a kernel launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaunchGeometry {
    /// Number of meaningful axes, 1 or 2.
    pub dims: u32,
    /// Total work-items along each axis.
    pub global: WorkSize,
    /// Work-items per work-group along each axis.
    pub local: WorkSize,
}

impl LaunchGeometry {
    /// Geometry of the tiled GEMM kernel.
    ///
    /// Each work-item computes `elems_per_thread` rows of one output column and a work-group
    /// covers a `tile_size × tile_size` output tile: global = {K, N / EPT}, local = {TS, TS / EPT}.
    pub fn gemm(n: usize, m: usize, k: usize, tiling: &TileConfig) -> Result<Self, GeometryError> {
        tiling.validate()?;

        for (dim, value) in [("N", n), ("M", m), ("K", k)] {
            if value == 0 || value % tiling.tile_size != 0 {
                return Err(GeometryError::NotMultiple {
                    dim,
                    value,
                    multiple: tiling.tile_size,
                });
            }
        }

        Ok(Self {
            dims: 2,
            global: WorkSize::new(k, n / tiling.elems_per_thread),
            local: WorkSize::new(tiling.tile_size, tiling.rows_per_pass()),
        })
    }

    /// Geometry of the single work-group scan kernel: global = local = N.
    ///
    /// The kernel keeps the whole array in local scratch sized by the tile, so N can't exceed it.
    pub fn scan(n: usize, tiling: &TileConfig) -> Result<Self, GeometryError> {
        tiling.validate()?;

        if n == 0 || n > tiling.tile_size {
            return Err(GeometryError::OutOfRange {
                dim: "N",
                value: n,
                max: tiling.tile_size,
            });
        }

        Ok(Self {
            dims: 1,
            global: WorkSize::new_1d(n),
            local: WorkSize::new_1d(n),
        })
    }

    /// Number of work-groups along each axis.
    pub fn group_count(&self) -> WorkSize {
        WorkSize::new(self.global.x / self.local.x, self.global.y / self.local.y)
    }

    /// Number of work-items in one work-group.
    pub fn units_per_group(&self) -> usize {
        self.local.num_elems()
    }

    /// Whether every axis is covered by whole work-groups.
    pub fn is_aligned(&self) -> bool {
        self.local.x != 0
            && self.local.y != 0
            && self.global.x % self.local.x == 0
            && self.global.y % self.local.y == 0
    }
}

impl Display for LaunchGeometry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}D global={} local={} groups={}",
            self.dims,
            self.global,
            self.local,
            self.group_count()
        )
    }
}
