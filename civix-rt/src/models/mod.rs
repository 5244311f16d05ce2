//! Domain models

pub mod report;

pub use report::{
    Category, Report, ReportDraft, ReportFilter, ReportPatch, ReportStatus, UserId, ValidDraft,
    ValidPatch, ADDRESS_PLACEHOLDER,
};
