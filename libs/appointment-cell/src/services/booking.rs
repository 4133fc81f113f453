use chrono::{NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use dentist_cell::services::{AvailabilityService, ServiceCatalog, SlotState};
use shared_config::AppConfig;
use shared_database::{ClinicApiClient, DatabaseError};
use shared_models::auth::Role;

use crate::error::AppointmentError;
use crate::models::{
    Actor, Appointment, AppointmentFilter, AppointmentStatus, CreateAppointmentRequest,
    LifecycleAction, RescheduleRequest, UpdateStatusRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;

pub struct AppointmentBookingService {
    client: ClinicApiClient,
    availability: AvailabilityService,
    catalog: ServiceCatalog,
    lifecycle: AppointmentLifecycleService,
    config: AppConfig,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: ClinicApiClient::new(config),
            availability: AvailabilityService::new(config),
            catalog: ServiceCatalog::new(config),
            lifecycle: AppointmentLifecycleService::new(),
            config: config.clone(),
        }
    }

    fn ensure_future(&self, date: NaiveDate, time: NaiveTime) -> Result<(), AppointmentError> {
        let start = self.config.clinic_local(date.and_time(time));
        if start <= self.config.clinic_now() {
            return Err(AppointmentError::InPast);
        }
        Ok(())
    }

    async fn ensure_slot_free(
        &self,
        dentist_id: Uuid,
        date: NaiveDate,
        time: NaiveTime,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        match self.availability.slot_state(dentist_id, date, time, Some(auth_token)).await? {
            SlotState::Free => Ok(()),
            SlotState::Booked => {
                warn!("Slot {} {} for dentist {} is already booked", date, time, dentist_id);
                Err(AppointmentError::SlotAlreadyBooked)
            }
            SlotState::OutsideHours => Err(AppointmentError::OutsideWorkingHours),
        }
    }

    fn conflict_as_booked(err: DatabaseError) -> AppointmentError {
        match err {
            DatabaseError::Conflict(_) => AppointmentError::SlotAlreadyBooked,
            other => AppointmentError::from(other),
        }
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
        auth_token: &str,
    ) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!("/rest/v1/appointments?idempotency_key={}", ClinicApiClient::eq_filter(key));
        let rows: Vec<Appointment> = self.client
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Books a pending appointment. A 409 from the backend means someone else took
    /// the slot first and is reported as `SlotAlreadyBooked`.
    pub async fn create_appointment(
        &self,
        actor: &Actor,
        request: CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        info!("Booking appointment with dentist {} on {} at {}", request.dentist_id, request.date, request.time);

        let patient_id = match actor.role {
            Role::Patient => match request.patient_id {
                Some(id) if id != actor.id => {
                    return Err(AppointmentError::Forbidden(
                        "Patients can only book appointments for themselves".to_string(),
                    ));
                }
                _ => actor.id,
            },
            Role::Dentist if request.dentist_id != actor.id => {
                return Err(AppointmentError::Forbidden(
                    "Dentists can only book into their own schedule".to_string(),
                ));
            }
            Role::Dentist | Role::Admin => request.patient_id.ok_or_else(|| {
                AppointmentError::Validation("patient_id is required when booking on behalf of a patient".to_string())
            })?,
        };

        if let Some(key) = request.idempotency_key.as_deref() {
            if let Some(existing) = self.find_by_idempotency_key(key, auth_token).await? {
                let same_booking = actor.is_party_to(&existing)
                    && existing.patient_id == patient_id
                    && existing.dentist_id == request.dentist_id
                    && existing.date == request.date
                    && existing.time == request.time;
                if !same_booking {
                    warn!("Idempotency key {} belongs to appointment {} for another booking", key, existing.id);
                    return Err(AppointmentError::IdempotencyKeyReused);
                }
                info!("Create with key {} already applied as appointment {}", key, existing.id);
                return Ok(existing);
            }
        }

        self.ensure_future(request.date, request.time)?;

        let service = self.catalog
            .resolve_booking_service(request.dentist_id, request.service_id, Some(auth_token))
            .await?;

        self.ensure_slot_free(request.dentist_id, request.date, request.time, auth_token).await?;

        let body = json!({
            "patient_id": patient_id,
            "dentist_id": request.dentist_id,
            "service_id": request.service_id,
            "date": request.date.format("%Y-%m-%d").to_string(),
            "time": request.time.format("%H:%M:%S").to_string(),
            "duration_minutes": service.duration_minutes,
            "notes": request.notes,
            "status": AppointmentStatus::Pending,
            "idempotency_key": request.idempotency_key,
        });

        let created: Vec<Appointment> = self.client
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(body),
                Some(ClinicApiClient::representation_headers()),
            )
            .await
            .map_err(Self::conflict_as_booked)?;

        let appointment = created.into_iter().next().ok_or_else(|| {
            AppointmentError::Backend(DatabaseError::Decode("Create returned no appointment".to_string()))
        })?;

        info!("Appointment {} created as pending", appointment.id);
        Ok(appointment)
    }

    async fn fetch_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id={}", ClinicApiClient::eq_filter(&appointment_id.to_string()));
        let rows: Vec<Appointment> = self.client
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        rows.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    pub async fn get_appointment(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.fetch_appointment(appointment_id, auth_token).await?;
        if !actor.is_party_to(&appointment) {
            return Err(AppointmentError::Forbidden(
                "Not authorized to view this appointment".to_string(),
            ));
        }
        Ok(appointment)
    }

    /// Patients only ever see their own appointments and dentists their own schedule.
    pub async fn list_appointments(
        &self,
        actor: &Actor,
        mut filter: AppointmentFilter,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        match actor.role {
            Role::Patient => filter.patient_id = Some(actor.id),
            Role::Dentist => filter.dentist_id = Some(actor.id),
            Role::Admin => {}
        }

        let mut query_parts = Vec::new();
        if let Some(patient_id) = filter.patient_id {
            query_parts.push(format!("patient_id={}", ClinicApiClient::eq_filter(&patient_id.to_string())));
        }
        if let Some(dentist_id) = filter.dentist_id {
            query_parts.push(format!("dentist_id={}", ClinicApiClient::eq_filter(&dentist_id.to_string())));
        }
        if let Some(status) = filter.status {
            query_parts.push(format!("status={}", ClinicApiClient::eq_filter(status.as_str())));
        }
        if let Some(from_date) = filter.from_date {
            query_parts.push(format!("date=gte.{}", from_date.format("%Y-%m-%d")));
        }
        if let Some(to_date) = filter.to_date {
            query_parts.push(format!("date=lte.{}", to_date.format("%Y-%m-%d")));
        }
        query_parts.push("order=date.asc,time.asc".to_string());
        if let Some(limit) = filter.limit {
            query_parts.push(format!("limit={}", limit));
        }
        if let Some(offset) = filter.offset {
            query_parts.push(format!("offset={}", offset));
        }

        let path = format!("/rest/v1/appointments?{}", query_parts.join("&"));
        debug!("Listing appointments: {}", path);

        let appointments: Vec<Appointment> = self.client
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;
        Ok(appointments)
    }

    /// Writes `changes` only if the row still has the status it was read with.
    async fn patch_guarded(
        &self,
        appointment: &Appointment,
        mut changes: serde_json::Map<String, Value>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        changes.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!(
            "/rest/v1/appointments?id={}&status={}",
            ClinicApiClient::eq_filter(&appointment.id.to_string()),
            ClinicApiClient::eq_filter(appointment.status.as_str()),
        );

        let updated: Vec<Appointment> = self.client
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(changes)),
                Some(ClinicApiClient::representation_headers()),
            )
            .await
            .map_err(Self::conflict_as_booked)?;

        updated.into_iter().next().ok_or_else(|| {
            warn!("Appointment {} changed status before the update landed", appointment.id);
            AppointmentError::StaleState
        })
    }

    pub async fn apply_action(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        action: LifecycleAction,
        reason: Option<&str>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.fetch_appointment(appointment_id, auth_token).await?;
        let start = self.config.clinic_local(appointment.scheduled_start());
        let target = self.lifecycle.plan(action, actor, &appointment, start, self.config.clinic_now())?;

        let mut changes = serde_json::Map::new();
        changes.insert("status".to_string(), json!(target));

        let updated = self.patch_guarded(&appointment, changes, auth_token).await?;
        info!(
            "Appointment {} {} -> {} by {:?} {}{}",
            appointment_id,
            appointment.status,
            updated.status,
            actor.role,
            actor.id,
            reason.map(|r| format!(" ({})", r)).unwrap_or_default(),
        );
        Ok(updated)
    }

    pub async fn update_status(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        request: UpdateStatusRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.fetch_appointment(appointment_id, auth_token).await?;
        let action = self.lifecycle.action_for_status(current.status, request.status, actor)?;
        self.apply_action(actor, appointment_id, action, request.reason.as_deref(), auth_token).await
    }

    pub async fn cancel(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        reason: Option<&str>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.apply_action(actor, appointment_id, LifecycleAction::Cancel, reason, auth_token).await
    }

    /// Moves the appointment to a new date and time without changing its status.
    pub async fn reschedule_appointment(
        &self,
        actor: &Actor,
        appointment_id: Uuid,
        request: RescheduleRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Rescheduling appointment: {}", appointment_id);

        let appointment = self.fetch_appointment(appointment_id, auth_token).await?;
        let start = self.config.clinic_local(appointment.scheduled_start());
        self.lifecycle.plan(LifecycleAction::Reschedule, actor, &appointment, start, self.config.clinic_now())?;

        if appointment.date == request.date && appointment.time == request.time {
            return Err(AppointmentError::Validation(
                "New time is the same as the current one".to_string(),
            ));
        }

        self.ensure_future(request.date, request.time)?;
        self.ensure_slot_free(appointment.dentist_id, request.date, request.time, auth_token).await?;

        let mut changes = serde_json::Map::new();
        changes.insert("date".to_string(), json!(request.date.format("%Y-%m-%d").to_string()));
        changes.insert("time".to_string(), json!(request.time.format("%H:%M:%S").to_string()));

        let updated = self.patch_guarded(&appointment, changes, auth_token).await?;
        info!(
            "Appointment {} moved from {} {} to {} {}",
            appointment_id, appointment.date, appointment.time, updated.date, updated.time
        );
        Ok(updated)
    }
}
