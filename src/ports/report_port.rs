//! Report generation port trait.

use crate::domain::error::FolioError;
use crate::domain::plan::InvestmentPlan;

/// Port for writing plan reports.
pub trait ReportPort {
    fn write(&self, plan: &InvestmentPlan, output_path: &str) -> Result<(), FolioError>;
}
