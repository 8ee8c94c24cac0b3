mod record;
mod search;
mod value;

pub use record::{FileInfo, ImageInfo, MetadataRecord, Resolution, GPS_TAG};
pub use search::{SearchFailure, SearchOutcome, SearchPhase, SearchResult};
pub use value::{ExifValue, GpsCoordinate};
