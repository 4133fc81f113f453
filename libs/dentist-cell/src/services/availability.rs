use chrono::{Duration, NaiveDate, NaiveTime};
use reqwest::Method;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::ClinicApiClient;

use crate::error::DentistError;
use crate::models::{AvailabilityQuery, BookedSlot, DayAvailability};
use crate::services::calculator::{AvailabilityCalculator, SlotState};
use crate::services::working_hours::WorkingHoursService;

pub struct AvailabilityService {
    client: ClinicApiClient,
    working_hours: WorkingHoursService,
    booking_window_days: i64,
    max_range_days: i64,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: ClinicApiClient::new(config),
            working_hours: WorkingHoursService::new(config),
            booking_window_days: config.booking_window_days,
            max_range_days: config.max_availability_range_days,
        }
    }

    /// Resolves the requested window and clips it to start no earlier than `today`.
    /// `None` means the whole window lies in the past.
    pub fn resolve_range(
        &self,
        query: &AvailabilityQuery,
        today: NaiveDate,
    ) -> Result<Option<(NaiveDate, NaiveDate)>, DentistError> {
        let start = query.start_date.unwrap_or(today);
        let end = match query.end_date {
            Some(end) => end,
            None => start
                .checked_add_signed(Duration::days(self.booking_window_days))
                .ok_or_else(|| DentistError::InvalidRange(format!("start_date {} is out of range", start)))?,
        };

        if start > end {
            return Err(DentistError::InvalidRange(format!(
                "start_date {} is after end_date {}", start, end
            )));
        }
        if (end - start).num_days() > self.max_range_days {
            return Err(DentistError::InvalidRange(format!(
                "range may span at most {} days", self.max_range_days
            )));
        }

        let start = start.max(today);
        if start > end {
            return Ok(None);
        }
        Ok(Some((start, end)))
    }

    /// Non-cancelled bookings of the dentist between `start` and `end` inclusive.
    pub async fn fetch_booked_slots(
        &self,
        dentist_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<Vec<BookedSlot>, DentistError> {
        let path = format!(
            "/rest/v1/appointments?dentist_id={}&date=gte.{}&date=lte.{}&status=neq.cancelled&select=dentist_id,date,time,status",
            ClinicApiClient::eq_filter(&dentist_id.to_string()),
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
        );
        let token = auth_token.unwrap_or(self.client.api_key());

        let slots: Vec<BookedSlot> = self.client
            .request(Method::GET, &path, Some(token), None)
            .await?;
        Ok(slots)
    }

    pub async fn get_availability(
        &self,
        dentist_id: Uuid,
        query: &AvailabilityQuery,
        today: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<Vec<DayAvailability>, DentistError> {
        let Some((start, end)) = self.resolve_range(query, today)? else {
            return Ok(Vec::new());
        };

        debug!("Computing availability for dentist {} from {} to {}", dentist_id, start, end);

        let hours = self.working_hours.get_working_hours(dentist_id, auth_token).await?;
        let booked = self.fetch_booked_slots(dentist_id, start, end, auth_token).await?;

        Ok(AvailabilityCalculator::new(dentist_id, &hours, &booked).calculate_range(start, end))
    }

    /// State of one slot as of now, from fresh working hours and bookings.
    pub async fn slot_state(
        &self,
        dentist_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        auth_token: Option<&str>,
    ) -> Result<SlotState, DentistError> {
        let hours = self.working_hours.get_working_hours(dentist_id, auth_token).await?;
        let booked = self.fetch_booked_slots(dentist_id, date, date, auth_token).await?;

        Ok(AvailabilityCalculator::new(dentist_id, &hours, &booked).slot_state(date, time))
    }
}
