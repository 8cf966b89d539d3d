//! File-format boundary for frame data.
//!
//! The pipeline only ever talks to storage through [`FormatAdapter`]; the
//! bundled implementation is the primary-HDU FITS codec in [`fits`].

pub mod fits;

use crate::header::Header;
use crate::normalize::RawImage;
use std::path::Path;

pub use fits::{
    parse_fits, read_fits, read_fits_header, serialize_fits, write_fits, FitsCodec, FitsError,
};

/// Scoped access to an on-disk frame format.
///
/// Every call opens, fully reads or writes, and closes the file before
/// returning, including on error paths.
pub trait FormatAdapter {
    /// Decode the primary pixel array and its header
    fn open_for_read(&self, path: &Path) -> Result<(RawImage, Header), FitsError>;

    /// Encode `raw` and `header` to `path`; fails if the file exists and `overwrite` is false
    fn write(
        &self,
        raw: &RawImage,
        header: &Header,
        path: &Path,
        overwrite: bool,
    ) -> Result<(), FitsError>;

    /// Decode only the header, without touching the data unit
    fn read_header_only(&self, path: &Path) -> Result<Header, FitsError>;
}
