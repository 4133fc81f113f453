use reqwest::Method;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::ClinicApiClient;

use crate::error::DentistError;
use crate::models::{WorkingHours, WorkingHoursRow};

pub struct WorkingHoursService {
    client: ClinicApiClient,
}

impl WorkingHoursService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: ClinicApiClient::new(config),
        }
    }

    /// Weekdays without a stored row stay absent from the result.
    pub async fn get_working_hours(
        &self,
        dentist_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<WorkingHours, DentistError> {
        debug!("Fetching working hours for dentist {}", dentist_id);

        let path = format!(
            "/rest/v1/dentist_working_hours?dentist_id={}&select=*",
            ClinicApiClient::eq_filter(&dentist_id.to_string())
        );
        let token = auth_token.unwrap_or(self.client.api_key());

        let rows: Vec<WorkingHoursRow> = self.client
            .request(Method::GET, &path, Some(token), None)
            .await?;

        Ok(WorkingHours::from_rows(rows))
    }

    pub async fn set_working_hours(
        &self,
        dentist_id: Uuid,
        hours: &WorkingHours,
        auth_token: &str,
    ) -> Result<WorkingHours, DentistError> {
        hours.validate()?;
        if hours.is_empty() {
            return Err(DentistError::InvalidWorkingHours("No days supplied".to_string()));
        }

        let rows = serde_json::to_value(hours.to_rows(dentist_id))
            .map_err(|e| DentistError::InvalidWorkingHours(e.to_string()))?;

        let saved: Vec<WorkingHoursRow> = self.client
            .request_with_headers::<Option<Vec<WorkingHoursRow>>>(
                Method::POST,
                "/rest/v1/dentist_working_hours?on_conflict=dentist_id,day_of_week",
                Some(auth_token),
                Some(rows),
                Some(ClinicApiClient::upsert_headers()),
            )
            .await?
            .unwrap_or_default();

        info!("Saved {} working-hours rows for dentist {}", saved.len(), dentist_id);

        // A backend configured to return minimal responses echoes nothing; fall back to the input.
        if saved.is_empty() {
            return Ok(hours.clone());
        }
        Ok(WorkingHours::from_rows(saved))
    }
}
