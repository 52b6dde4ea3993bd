//! Pack-wide constants and default values

/// Node naming and catalogue constants
pub mod catalogue {
    /// Default category root and unique-name prefix
    pub const DEFAULT_PREFIX: &str = "NumPy";
}

/// Parameter widget defaults
pub mod defaults {
    /// Shape used by array creation nodes
    pub const SHAPE: &str = "(3, 3)";

    /// Shape used by the sampled-function nodes (sine, cosine)
    pub const SIGNAL_SHAPE: &str = "(100,)";

    /// Tooltip shared by every shape field
    pub const SHAPE_TOOLTIP: &str = "Array shape, e.g. (3, 3), (5,) or 10";

    /// Element count for linspace / geomspace
    pub const SAMPLE_COUNT: i64 = 50;

    /// Upper bound accepted by integer count widgets
    pub const MAX_COUNT: i64 = 1_000_000;
}

/// Allocation limits
pub mod limits {
    /// Largest number of elements a creation node will allocate
    pub const MAX_ELEMENTS: usize = 1 << 28;
}

/// Numeric tolerances
pub mod tolerance {
    /// Determinant magnitude below which a matrix is reported as singular
    pub const SINGULAR_DETERMINANT: f64 = 1e-12;

    /// Iteration budget per matrix dimension for SVD and eigen solvers
    pub const ITERATIONS_PER_DIMENSION: usize = 200;

    /// Magnitude below which an eigen or singular value counts as zero
    pub const NEGLIGIBLE: f64 = 1e-10;
}

/// Configuration file location, relative to the home directory
pub mod config {
    pub const DIRECTORY: &str = ".nodle";
    pub const FILE_NAME: &str = "numeric.json";
}
