use crate::error::AppError;
use crate::model::{Customer, ParsedSchedule, Schedule, ScheduleStatus};
use crate::parser;
use crate::storage::json_store;
use log::{debug, info};
use std::path::Path;
use time::macros::format_description;
use time::{Date, OffsetDateTime, Time};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewSchedule {
    pub title: String,
    pub date: String,
    pub time: Option<String>,
    pub customer_id: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleFilter {
    pub customer_id: Option<String>,
    pub status: Option<ScheduleStatus>,
}

#[derive(Debug, Clone)]
pub struct AddedSchedule {
    pub schedule: Schedule,
    pub parsed: ParsedSchedule,
    pub customer: Option<Customer>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleStats {
    pub pending: usize,
    pub completed: usize,
}

/// First customer whose name or company contains `name`.
pub fn match_customer<'a>(customers: &'a [Customer], name: &str) -> Option<&'a Customer> {
    let needle = name.trim();
    if needle.is_empty() {
        return None;
    }
    customers.iter().find(|customer| customer.matches_name(needle))
}

pub fn add_schedule_from_text(text: &str) -> Result<AddedSchedule, AppError> {
    let path = json_store::store_path()?;
    add_schedule_from_text_with_path(&path, text, parser::local_today())
}

pub fn add_schedule(new_schedule: NewSchedule) -> Result<Schedule, AppError> {
    let path = json_store::store_path()?;
    add_schedule_with_path(&path, new_schedule)
}

pub fn list_schedules(filter: &ScheduleFilter) -> Result<Vec<Schedule>, AppError> {
    let path = json_store::store_path()?;
    list_schedules_with_path(&path, filter)
}

pub fn toggle_schedule(id: &str) -> Result<Schedule, AppError> {
    let path = json_store::store_path()?;
    toggle_schedule_with_path(&path, id)
}

pub fn delete_schedule(id: &str) -> Result<Schedule, AppError> {
    let path = json_store::store_path()?;
    delete_schedule_with_path(&path, id)
}

pub fn schedule_stats() -> Result<ScheduleStats, AppError> {
    let path = json_store::store_path()?;
    schedule_stats_with_path(&path)
}

fn next_id() -> String {
    format!("schedule-{}", OffsetDateTime::now_utc().unix_timestamp_nanos())
}

fn add_schedule_from_text_with_path(
    path: &Path,
    text: &str,
    today: Date,
) -> Result<AddedSchedule, AppError> {
    let parsed = parser::parse_schedule_on(text, today)
        .ok_or_else(|| AppError::invalid_input("nothing to schedule"))?;

    let mut state = json_store::load_state(path)?;
    let customer = parsed
        .customer_name
        .as_deref()
        .and_then(|name| match_customer(&state.customers, name))
        .cloned();
    if let (Some(name), None) = (parsed.customer_name.as_deref(), customer.as_ref()) {
        debug!("no stored customer matches '{name}'");
    }

    let schedule = Schedule {
        id: next_id(),
        customer_id: customer.as_ref().map(|customer| customer.id.clone()),
        title: parsed.title.clone(),
        date: parsed.date.clone(),
        time: parsed.time.clone(),
        description: Some(parsed.description.clone()),
        status: ScheduleStatus::Pending,
    };

    state.schedules.insert(0, schedule.clone());
    json_store::save_state(path, &state)?;
    info!("added schedule {} on {}", schedule.id, schedule.date);

    Ok(AddedSchedule {
        schedule,
        parsed,
        customer,
    })
}

fn add_schedule_with_path(path: &Path, new_schedule: NewSchedule) -> Result<Schedule, AppError> {
    let title = new_schedule.title.trim();
    if title.is_empty() {
        return Err(AppError::invalid_input("title is required"));
    }

    let date = validate_date(&new_schedule.date)?;
    let time = new_schedule
        .time
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(validate_time)
        .transpose()?;
    let description = new_schedule
        .description
        .filter(|value| !value.trim().is_empty());

    let mut state = json_store::load_state(path)?;
    let customer_id = match new_schedule.customer_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => {
            if !state.customers.iter().any(|customer| customer.id == id) {
                return Err(AppError::not_found("customer not found"));
            }
            Some(id.to_string())
        }
        _ => None,
    };

    let schedule = Schedule {
        id: next_id(),
        customer_id,
        title: title.to_string(),
        date,
        time,
        description,
        status: ScheduleStatus::Pending,
    };

    state.schedules.insert(0, schedule.clone());
    json_store::save_state(path, &state)?;
    info!("added schedule {} on {}", schedule.id, schedule.date);

    Ok(schedule)
}

fn validate_date(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::invalid_input("date is required"));
    }
    let date = Date::parse(trimmed, format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::invalid_input("date must be YYYY-MM-DD"))?;
    Ok(parser::format_date(date))
}

fn validate_time(raw: &str) -> Result<String, AppError> {
    let time = Time::parse(raw, format_description!("[hour]:[minute]"))
        .map_err(|_| AppError::invalid_input("time must be HH:MM"))?;
    Ok(format!("{:02}:{:02}", time.hour(), time.minute()))
}

fn list_schedules_with_path(path: &Path, filter: &ScheduleFilter) -> Result<Vec<Schedule>, AppError> {
    let state = json_store::load_state(path)?;
    let mut schedules: Vec<Schedule> = state
        .schedules
        .into_iter()
        .filter(|schedule| {
            filter
                .customer_id
                .as_deref()
                .is_none_or(|id| schedule.customer_id.as_deref() == Some(id))
        })
        .filter(|schedule| filter.status.is_none_or(|status| schedule.status == status))
        .collect();
    schedules.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    Ok(schedules)
}

fn find_index(schedules: &[Schedule], id: &str) -> Result<usize, AppError> {
    let trimmed_id = id.trim();
    if trimmed_id.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }
    schedules
        .iter()
        .position(|schedule| schedule.id == trimmed_id)
        .ok_or_else(|| AppError::not_found("schedule not found"))
}

fn toggle_schedule_with_path(path: &Path, id: &str) -> Result<Schedule, AppError> {
    let mut state = json_store::load_state(path)?;
    let index = find_index(&state.schedules, id)?;

    let schedule = &mut state.schedules[index];
    schedule.status = schedule.status.toggled();
    let updated = schedule.clone();

    json_store::save_state(path, &state)?;
    info!("schedule {} is now {}", updated.id, updated.status.label());

    Ok(updated)
}

fn delete_schedule_with_path(path: &Path, id: &str) -> Result<Schedule, AppError> {
    let mut state = json_store::load_state(path)?;
    let index = find_index(&state.schedules, id)?;
    let removed = state.schedules.remove(index);
    json_store::save_state(path, &state)?;
    info!("deleted schedule {}", removed.id);

    Ok(removed)
}

fn schedule_stats_with_path(path: &Path) -> Result<ScheduleStats, AppError> {
    let state = json_store::load_state(path)?;
    let mut stats = ScheduleStats::default();
    for schedule in &state.schedules {
        match schedule.status {
            ScheduleStatus::Pending => stats.pending += 1,
            ScheduleStatus::Completed => stats.completed += 1,
        }
    }
    Ok(stats)
}
