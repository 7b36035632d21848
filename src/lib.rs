//! # speclib - Spectral Library Core
//!
//! `speclib` reads field and laboratory spectrometer files, stores their
//! profiles in attribute tables and moves those tables in and out of the dense
//! arrays that raster algorithms work on.
//!
//! ## Key Features
//!
//! - **Instrument Codecs**: ASD FieldSpec binaries, Spectral Evolution `.sed`
//!   text files and delimited CSV/TSV tables, all parsed into one
//!   [`SpectralProfile`](profile::SpectralProfile) model.
//!
//! - **Portable Profile Encoding**: a compact JSON document (`x`, `y`, `xUnit`,
//!   `bbl`, ...) stored in Binary or Utf8 columns tagged as profile fields.
//!
//! - **Spectral Settings**: profiles sharing band count, wavelengths and unit are
//!   grouped and interned, so equal settings are compared by pointer.
//!
//! - **Field/Array Mapping**: table columns become band-sequential arrays with
//!   per-array no-data sentinels, and result arrays are written back as new or
//!   overwritten columns.
//!
//! - **Expression Functions**: `raster_profile`, `spectral_profile` and
//!   `spectral_data` for geometry-driven pixel extraction.
//!
//! - **Parquet Libraries**: libraries persist as Parquet files with ZSTD
//!   compression and a format version in the footer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use speclib::codec::Codec;
//! use speclib::library::{read_parquet, write_parquet, CompressionType, LibraryBuilder};
//! use speclib::mapper::{to_arrays, MapperOptions};
//! use speclib::setting::SettingCache;
//!
//! // Parse instrument files into one library row each
//! let codec = Codec::new();
//! let mut builder = LibraryBuilder::new();
//! for path in ["leaf_01.asd", "leaf_02.asd"] {
//!     builder.add_file(&codec.parse_path(path, None)?)?;
//! }
//! write_parquet("leaves.parquet", &builder.finish()?, CompressionType::default())?;
//!
//! // Turn the stored profiles into arrays, one per spectral setting
//! let library = read_parquet("leaves.parquet")?;
//! let mut cache = SettingCache::new();
//! let arrays = to_arrays(&library.batch, &["Spectrum"], &mut cache, &MapperOptions::default())?;
//! for batch in &arrays["Spectrum"].batches {
//!     println!("{:?} rows {:?}", batch.array.shape(), batch.binding.rows);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Modules
//!
//! - [`profile`]: profile model, wavelength units and the portable encoding
//! - [`codec`]: instrument file parsers
//! - [`setting`]: spectral settings and profile grouping
//! - [`schema`]: profile field tagging and library column names
//! - [`mapper`]: table to array conversion and write-back
//! - [`functions`]: expression functions for pixel extraction
//! - [`library`]: library tables and Parquet storage
//! - [`config`]: TOML configuration

pub mod codec;
pub mod config;
pub mod functions;
pub mod library;
pub mod mapper;
pub mod profile;
pub mod schema;
pub mod setting;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::codec::{Codec, FileFormat, NamedProfile, ParsedFile};
    pub use crate::config::SpeclibConfig;
    pub use crate::library::{read_parquet, write_parquet, CompressionType, LibraryBuilder};
    pub use crate::mapper::{to_arrays, write_back, FieldArrays, MapperOptions, RasterArray};
    pub use crate::profile::{
        decode_profile, encode_profile, SpectralProfile, SpectralProfileBuilder, UnitPolicy,
        WavelengthUnit,
    };
    pub use crate::setting::{group, SettingCache, SpectralSetting};
}
