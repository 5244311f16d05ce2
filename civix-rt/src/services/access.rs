//! Access control for report operations

use std::fmt;

use crate::error::{ReportError, ReportResult};
use crate::models::{Report, UserId};

/// Operation an identity attempts on a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    List,
    UpdateContent,
    Delete,
    ChangeStatus,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Read => "read",
            Operation::List => "list",
            Operation::UpdateContent => "update",
            Operation::Delete => "delete",
            Operation::ChangeStatus => "change the status of",
        };
        f.write_str(name)
    }
}

/// Ownership-based authorization
///
/// Reads and listings are open. Content edits and deletion belong to the
/// owner. Anyone may request a status change; the verification state machine
/// decides what that request is worth.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGuard;

impl AccessGuard {
    pub fn new() -> Self {
        Self
    }

    pub fn authorize(
        &self,
        report: &Report,
        actor: &UserId,
        operation: Operation,
    ) -> ReportResult<()> {
        match operation {
            Operation::Read | Operation::List | Operation::ChangeStatus => Ok(()),
            Operation::UpdateContent | Operation::Delete => {
                if report.is_owned_by(actor) {
                    Ok(())
                } else {
                    tracing::debug!(
                        report_id = %report.id,
                        actor = %actor,
                        operation = %operation,
                        "Rejected non-owner operation"
                    );
                    Err(ReportError::Forbidden(format!(
                        "Not authorized to {} report {}",
                        operation, report.id
                    )))
                }
            }
        }
    }
}
