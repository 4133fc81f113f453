use reqwest::Method;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{ClinicApiClient, DatabaseError};

use crate::error::DentistError;
use crate::models::{AssignServiceRequest, BookableService, DentistService, Service, ServiceListQuery};

const ASSIGNMENT_SELECT: &str = "select=*,service:services(*)";

pub struct ServiceCatalog {
    client: ClinicApiClient,
}

impl ServiceCatalog {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: ClinicApiClient::new(config),
        }
    }

    async fn fetch_assignments(
        &self,
        filters: &str,
        auth_token: Option<&str>,
    ) -> Result<Vec<DentistService>, DentistError> {
        let path = format!("/rest/v1/dentist_services?{}&{}", filters, ASSIGNMENT_SELECT);
        let token = auth_token.unwrap_or(self.client.api_key());

        let rows: Vec<DentistService> = self.client
            .request(Method::GET, &path, Some(token), None)
            .await?;
        Ok(rows)
    }

    /// Services a patient can currently book with this dentist.
    pub async fn list_dentist_services(
        &self,
        dentist_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Vec<BookableService>, DentistError> {
        debug!("Listing services for dentist {}", dentist_id);

        let filters = format!("dentist_id={}", ClinicApiClient::eq_filter(&dentist_id.to_string()));
        let assignments = self.fetch_assignments(&filters, auth_token).await?;

        Ok(assignments
            .iter()
            .filter(|a| a.is_bookable())
            .filter_map(BookableService::from_assignment)
            .collect())
    }

    pub async fn resolve_booking_service(
        &self,
        dentist_id: Uuid,
        service_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<BookableService, DentistError> {
        let filters = format!(
            "dentist_id={}&service_id={}",
            ClinicApiClient::eq_filter(&dentist_id.to_string()),
            ClinicApiClient::eq_filter(&service_id.to_string()),
        );

        let assignments = self.fetch_assignments(&filters, auth_token).await?;

        assignments
            .iter()
            .find(|a| a.is_bookable())
            .and_then(BookableService::from_assignment)
            .ok_or_else(|| {
                warn!("Dentist {} does not offer service {}", dentist_id, service_id);
                DentistError::ServiceNotOffered { service_id }
            })
    }

    /// The clinic-wide catalog, sorted by name. Inactive services only on request.
    pub async fn list_services(
        &self,
        query: &ServiceListQuery,
        auth_token: &str,
    ) -> Result<Vec<Service>, DentistError> {
        let mut path = "/rest/v1/services?select=*&order=name.asc".to_string();
        if !query.include_inactive {
            path.push_str("&is_active=eq.true");
        }
        if let Some(category) = query.category_filter() {
            path.push_str(&format!("&category={}", ClinicApiClient::eq_filter(category)));
        }

        let services: Vec<Service> = self.client
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        debug!("Catalog lookup returned {} services", services.len());
        Ok(services)
    }

    async fn fetch_service(&self, service_id: Uuid, auth_token: &str) -> Result<Service, DentistError> {
        let path = format!(
            "/rest/v1/services?id={}&select=*",
            ClinicApiClient::eq_filter(&service_id.to_string())
        );
        let rows: Vec<Service> = self.client
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        rows.into_iter().next().ok_or(DentistError::ServiceNotFound(service_id))
    }

    /// Creates the dentist's assignment for a service, or updates its overrides if one exists.
    pub async fn assign_service(
        &self,
        dentist_id: Uuid,
        request: &AssignServiceRequest,
        auth_token: &str,
    ) -> Result<DentistService, DentistError> {
        request.validate()?;
        let service = self.fetch_service(request.service_id, auth_token).await?;

        let body = json!({
            "dentist_id": dentist_id,
            "service_id": request.service_id,
            "custom_price": request.custom_price,
            "custom_duration": request.custom_duration,
            "is_offered": request.is_offered,
            "notes": request.notes,
        });

        let saved: Vec<DentistService> = self.client
            .request_with_headers(
                Method::POST,
                "/rest/v1/dentist_services?on_conflict=dentist_id,service_id",
                Some(auth_token),
                Some(body),
                Some(ClinicApiClient::upsert_headers()),
            )
            .await?;

        let mut assignment = saved.into_iter().next().ok_or_else(|| {
            DentistError::Backend(DatabaseError::Decode("Assignment write returned no row".to_string()))
        })?;
        assignment.service.get_or_insert(service);

        info!("Service {} assigned to dentist {}", request.service_id, dentist_id);
        Ok(assignment)
    }

    pub async fn remove_service(
        &self,
        dentist_id: Uuid,
        service_id: Uuid,
        auth_token: &str,
    ) -> Result<(), DentistError> {
        let path = format!(
            "/rest/v1/dentist_services?dentist_id={}&service_id={}",
            ClinicApiClient::eq_filter(&dentist_id.to_string()),
            ClinicApiClient::eq_filter(&service_id.to_string()),
        );

        let removed: Vec<DentistService> = self.client
            .request_with_headers(
                Method::DELETE,
                &path,
                Some(auth_token),
                None,
                Some(ClinicApiClient::representation_headers()),
            )
            .await?;

        if removed.is_empty() {
            return Err(DentistError::AssignmentNotFound { dentist_id, service_id });
        }

        info!("Service {} removed from dentist {}", service_id, dentist_id);
        Ok(())
    }
}
