// Human readable output of validation runs and provisioning outcomes
use crate::application::provisioning_service::ProvisionOutcome;
use crate::application::table_service::{TableTarget, TableWriteSummary};
use crate::domain::dashboard::DashboardHandle;
use crate::domain::validation::ValidationReport;
use std::io::{self, Write};

pub fn write_validation(out: &mut impl Write, report: &ValidationReport) -> io::Result<()> {
    for result in &report.results {
        match (result.passed, &result.error) {
            (true, _) => writeln!(out, "[PASS] {}", result.requirement)?,
            (false, Some(error)) => writeln!(out, "[FAIL] {}: {}", result.requirement, error)?,
            (false, None) => writeln!(out, "[FAIL] {}", result.requirement)?,
        }
    }
    if !report.qualifying_warehouses.is_empty() {
        let names = report
            .qualifying_warehouses
            .iter()
            .map(|w| format!("{} ({})", w.name, w.size_class.label()))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(out, "Qualifying warehouses: {}", names)?;
    }
    Ok(())
}

pub fn write_dashboard_ready(out: &mut impl Write, handle: &DashboardHandle) -> io::Result<()> {
    writeln!(out, "The Dashboard Draft is ready at: {}", handle.url())?;
    writeln!(
        out,
        "Attach a warehouse of size Medium or larger to the draft if none is attached."
    )?;
    writeln!(out, "Click 'Publish' to share it with the rest of the workspace.")
}

pub fn write_provision_outcome(out: &mut impl Write, outcome: &ProvisionOutcome) -> io::Result<()> {
    match outcome {
        ProvisionOutcome::Halted(report) => {
            write_validation(out, report)?;
            writeln!(out, "Prerequisites are not met; no dashboard was written.")
        }
        ProvisionOutcome::Created(handle) | ProvisionOutcome::Updated(handle) => {
            write_dashboard_ready(out, handle)
        }
        ProvisionOutcome::Skipped { name } => {
            writeln!(out, "Dashboard '{}' already exists and was left unchanged.", name)
        }
    }
}

pub fn write_table_summary(
    out: &mut impl Write,
    target: &TableTarget,
    summary: &TableWriteSummary,
) -> io::Result<()> {
    let verb = if summary.created { "Created" } else { "Wrote to" };
    writeln!(out, "{} {}: {} rows", verb, target.full_name(), summary.rows_written)?;
    if summary.comments_applied > 0 {
        writeln!(out, "Commented {} columns", summary.comments_applied)?;
    }
    Ok(())
}
