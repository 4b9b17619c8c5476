//! Domain primitives for the cluster control plane
//!
//! This component holds the pieces that do not talk to the network:
//! - Topology model (`CoordinationDatabase`, `CoordinationNode`)
//! - Restore points and the user's restore-point selector
//! - Host/node realignment used when reviving onto new addresses
//! - Validation of user supplied names and communal storage locations
//!
//! # Examples
//!
//! ```
//! use cluster_primitives::{RestorePoint, RestorePointPolicy};
//!
//! let points = vec![
//!     RestorePoint::new("nightly", 1, "a1"),
//!     RestorePoint::new("nightly", 2, "b2"),
//! ];
//! let policy = RestorePointPolicy::by_index("nightly", 2);
//! assert_eq!(policy.resolve(&points).unwrap(), "b2");
//! ```

mod database;
mod paths;
mod restore;
mod validation;

pub use database::{first_duplicate, CoordinationDatabase, CoordinationNode, RealignedDatabase};
pub use paths::{
    current_description_path, restore_point_description_path, CATALOG_PATH,
    CURRENT_DESCRIPTION_DEST_PATH, RESTORE_POINT_DESCRIPTION_DEST_PATH,
};
pub use restore::{
    RestorePoint, RestorePointError, RestorePointNotFound, RestorePointPolicy,
    RestorePointSelector,
};
pub use validation::{validate_communal_location, validate_db_name, ValidationError};
