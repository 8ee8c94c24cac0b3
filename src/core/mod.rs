pub mod formats;
pub mod gps;
pub mod metadata;
pub mod report;
pub mod resolution;
