//! Gallery Catalog
//!
//! The catalog is the public gallery document: one entry per published image,
//! mixing fields a curator owns with fields derived from the image files.
//! Updates merge fresh extractor output into the previous catalog and persist
//! the result with a backup of what it replaces.

pub mod defaults;
pub mod entry;
pub mod merge;
pub mod metadata;
pub mod normalize;
pub mod sync;

pub use entry::{catalog_ids, Catalog, CatalogEntry, Edition};
pub use merge::{merge, MergeContext, MergeOutcome, MergeWarning};
pub use metadata::{image_id, load_metadata, ImageMetadata, PrintSize};
pub use sync::{CatalogSync, RestoreReport, UpdateReport};
