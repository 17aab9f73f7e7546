//! agenda-json - Conference agenda converter from Excel/CSV exports to JSON
//!
//! This crate reads a single tabular export of a conference agenda (an Excel
//! workbook or a CSV file), maps its ad-hoc column layout onto a fixed session
//! record through a [`SourceProfile`], and produces a normalized JSON schedule.
//! A separate [`VisibilityUpdater`] pass recomputes the `regEnabled` flag of an
//! already generated document from a title deny-list.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use agenda_json::{write_document, ConverterBuilder, SourceProfile};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // The named "Agenda" worksheet, header on the third row
//!     let converter = ConverterBuilder::new()
//!         .with_profile(SourceProfile::agenda_sheet())
//!         .build()?;
//!
//!     let conversion = converter.convert_file("agenda.xlsx")?;
//!     println!(
//!         "{} sessions, {} rows skipped",
//!         conversion.document.metadata.total_sessions,
//!         conversion.report.skipped_rows
//!     );
//!
//!     write_document(&conversion.document, "agenda.json")?;
//!     Ok(())
//! }
//! ```
//!
//! # Custom Profiles
//!
//! Column layouts are data. A profile names, per field, the candidate headers
//! (or column indices) to try in order and the default to use when none of them
//! yields a value:
//!
//! ```rust
//! use agenda_json::{ColumnKey, ConverterBuilder, FieldRule, SourceProfile};
//!
//! # fn main() -> Result<(), agenda_json::AgendaToJsonError> {
//! let mut profile = SourceProfile::csv_export();
//! profile.delimiter = ';';
//! profile.fields.room = FieldRule::new(["Venue", "Sessions Main Location"], "TBA");
//! profile.fields.visibility = vec![ColumnKey::header("Visibility")];
//!
//! let converter = ConverterBuilder::new().with_profile(profile).build()?;
//! # Ok(())
//! # }
//! ```
//!
//! Profiles can also be loaded from JSON with [`SourceProfile::from_json_file`].
//!
//! # Visibility
//!
//! ```rust,no_run
//! use agenda_json::VisibilityUpdater;
//!
//! # fn main() -> Result<(), agenda_json::AgendaToJsonError> {
//! let report = VisibilityUpdater::default().update_file("agenda.json")?;
//! println!("{} changed", report.changed);
//! # Ok(())
//! # }
//! ```

mod api;
mod builder;
mod error;
mod formatter;
mod mapper;
mod output;
mod parser;
mod profile;
mod security;
mod types;
mod visibility;

// 公開API
pub use api::{ColumnKey, SheetSelector, SourceFormat};
pub use builder::{Conversion, ConversionReport, Converter, ConverterBuilder};
pub use error::{AgendaToJsonError, FieldParseFailure};
pub use mapper::{IdGenerator, RandomIdGenerator, SequentialIdGenerator, GENERATED_ID_LEN};
pub use output::{generated_at, load_document, write_document};
pub use parser::tokenize_line;
pub use profile::{
    FieldMap, FieldRule, SourceProfile, TrackGuard, DEFAULT_LEVEL, DEFAULT_TIMESTAMP_OFFSET,
    DEFAULT_TRACK, PLACEHOLDER,
};
pub use security::SecurityConfig;
pub use types::{AgendaDocument, Metadata, Session};
pub use visibility::{VisibilityChange, VisibilityReport, VisibilityUpdater, DEFAULT_DENY_LIST};
