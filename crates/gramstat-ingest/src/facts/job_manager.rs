use gramstat_core::{FieldError, Packet, fields};
use gramstat_store::JobManagerStatusRow;

use crate::error::{AtStep, ResolveResult, Step};
use crate::resolve::ResolveContext;

/// `send_time - start_time`, formatted the way the status table stores it.
pub(crate) fn lifetime(packet: &impl Packet) -> ResolveResult<String> {
    let start = packet
        .float_field(fields::START_TIME)
        .and_then(|start| start.ok_or_else(|| FieldError::missing(fields::START_TIME)))
        .at(Step::Lifetime)?;
    Ok(format!("{:.6} seconds", packet.send_time_ticks() - start))
}

pub fn build_job_manager_status(
    ctx: &mut ResolveContext<'_>,
    packet: &impl Packet,
) -> ResolveResult<JobManagerStatusRow> {
    let status_time = packet.send_time().at(Step::SendTime)?;
    let lifetime = lifetime(packet)?;
    let counter = |code: &str| packet.int_field(code).at(Step::Counters);

    let mut row = JobManagerStatusRow {
        job_manager_instance_id: None,
        restarted_jobs: counter(fields::RESTARTED_JOBS)?,
        status_time,
        lifetime,
        total_jobs: counter(fields::TOTAL_JOBS)?,
        total_failed: counter(fields::TOTAL_FAILED)?,
        total_canceled: counter(fields::TOTAL_CANCELED)?,
        total_done: counter(fields::TOTAL_DONE)?,
        total_dry_run: counter(fields::TOTAL_DRY_RUN)?,
        peak_jobs: counter(fields::PEAK_JOBS)?,
        current_jobs: counter(fields::CURRENT_JOBS)?,
        unsubmitted: counter(fields::JOBS_UNSUBMITTED)?,
        stage_in: counter(fields::JOBS_STAGE_IN)?,
        pending: counter(fields::JOBS_PENDING)?,
        active: counter(fields::JOBS_ACTIVE)?,
        stage_out: counter(fields::JOBS_STAGE_OUT)?,
        failed: counter(fields::JOBS_FAILED)?,
        done: counter(fields::JOBS_DONE)?,
    };
    row.job_manager_instance_id = ctx.job_manager_instance_id(packet)?;
    Ok(row)
}
