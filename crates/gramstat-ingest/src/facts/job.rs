use chrono::{DateTime, Utc};

use gramstat_core::{FieldError, Packet, fields, timestamp_from_ticks};
use gramstat_store::{JobRow, JobStatusRow};

use crate::error::{AtStep, ResolveResult, Step};
use crate::resolve::ResolveContext;

/// Stage timestamp. Values of 1 or less mean the job never reached the
/// stage. A field that is present must be numeric, empty included.
pub(crate) fn stage_timestamp(
    packet: &impl Packet,
    code: &str,
) -> ResolveResult<Option<DateTime<Utc>>> {
    let Some(value) = packet.field(code).map(str::trim) else {
        return Ok(None);
    };
    let ticks = value
        .parse::<f64>()
        .ok()
        .filter(|ticks| ticks.is_finite())
        .ok_or_else(|| FieldError::not_numeric(code, value))
        .at(Step::StageTimestamps)?;
    if ticks <= 1.0 {
        return Ok(None);
    }
    timestamp_from_ticks(ticks)
        .map(Some)
        .ok_or_else(|| FieldError::out_of_range(code, ticks))
        .at(Step::StageTimestamps)
}

fn count(packet: &impl Packet, code: &str) -> ResolveResult<i64> {
    Ok(packet.int_field(code).at(Step::Counters)?.unwrap_or(0))
}

/// Resolve the job's dimensions, insert its `gram5_jobs` row and build the
/// status row that references it.
pub fn build_job_status(
    ctx: &mut ResolveContext<'_>,
    packet: &impl Packet,
) -> ResolveResult<JobStatusRow> {
    let send_time = packet.send_time().at(Step::SendTime)?;

    let mut row = JobStatusRow {
        job_id: 0,
        send_time,
        unsubmitted_timestamp: stage_timestamp(packet, fields::UNSUBMITTED_TIMESTAMP)?,
        file_stage_in_timestamp: stage_timestamp(packet, fields::STAGE_IN_TIMESTAMP)?,
        pending_timestamp: stage_timestamp(packet, fields::PENDING_TIMESTAMP)?,
        active_timestamp: stage_timestamp(packet, fields::ACTIVE_TIMESTAMP)?,
        failed_timestamp: stage_timestamp(packet, fields::FAILED_TIMESTAMP)?,
        file_stage_out_timestamp: stage_timestamp(packet, fields::STAGE_OUT_TIMESTAMP)?,
        done_timestamp: stage_timestamp(packet, fields::DONE_TIMESTAMP)?,
        status_count: count(packet, fields::STATUS_COUNT)?,
        register_count: count(packet, fields::REGISTER_COUNT)?,
        unregister_count: count(packet, fields::UNREGISTER_COUNT)?,
        signal_count: count(packet, fields::SIGNAL_COUNT)?,
        refresh_count: count(packet, fields::REFRESH_COUNT)?,
        failure_code: count(packet, fields::FAILURE_CODE)?,
        restart_count: count(packet, fields::RESTART_COUNT)?,
        callback_count: count(packet, fields::CALLBACK_COUNT)?,
    };
    let job_count = count(packet, fields::COUNT)?;
    let host_count = count(packet, fields::HOST_COUNT)?;

    let job = JobRow {
        job_manager_id: ctx.job_manager_instance_id_by_uuid(packet)?,
        send_time,
        count: job_count,
        host_count,
        dryrun: packet.field(fields::DRY_RUN) == Some("1"),
        client_id: ctx.client_id(packet)?,
        executable_id: ctx.executable_id(packet)?,
        rsl_bitfield: ctx.rsl_bitfield(packet)?,
        jobtype: ctx.job_type_id(packet)?,
        gram5_job_file_info: ctx.file_info_id(packet)?,
    };
    row.job_id = job.insert(ctx.session).at(Step::Job)?;
    Ok(row)
}
