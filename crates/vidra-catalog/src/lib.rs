//! Video catalog: the Postgres system of record for committed videos.
//!
//! A row in the `videos` table means ingestion finished and every URL the
//! row carries resolves to a stored artifact. Rows are created last during
//! ingestion; removal reclaims the stored artifacts before dropping the row.

pub mod error;
pub mod pool;
pub mod repository;

pub use error::{CatalogError, CatalogResult};
pub use pool::connect;
pub use repository::{PgVideoCatalog, VideoCatalog};
