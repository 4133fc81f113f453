use chrono::{DateTime, Duration, FixedOffset};
use tracing::{debug, warn};

use crate::error::AppointmentError;
use crate::models::{Actor, Appointment, AppointmentStatus, LifecycleAction};

/// Confirmed appointments can only be cancelled or moved while more than this remains.
pub const CHANGE_CUTOFF_HOURS: i64 = 24;

#[derive(Debug, Default, Clone, Copy)]
pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            // Terminal states - no transitions allowed
            AppointmentStatus::Completed
            | AppointmentStatus::Cancelled
            | AppointmentStatus::NoShow => vec![],
        }
    }

    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusChange {
                from: current_status,
                to: new_status,
            });
        }
        Ok(())
    }

    /// Maps a requested target status onto the action that produces it.
    /// Staff cancelling a pending request is a decline.
    pub fn action_for_status(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
        actor: &Actor,
    ) -> Result<LifecycleAction, AppointmentError> {
        self.validate_status_transition(current_status, new_status)?;

        match new_status {
            AppointmentStatus::Confirmed => Ok(LifecycleAction::Confirm),
            AppointmentStatus::Completed => Ok(LifecycleAction::Complete),
            AppointmentStatus::NoShow => Ok(LifecycleAction::MarkNoShow),
            AppointmentStatus::Cancelled if current_status == AppointmentStatus::Pending && actor.is_staff() => {
                Ok(LifecycleAction::Decline)
            }
            AppointmentStatus::Cancelled => Ok(LifecycleAction::Cancel),
            AppointmentStatus::Pending => Err(AppointmentError::InvalidStatusChange {
                from: current_status,
                to: new_status,
            }),
        }
    }

    fn allowed_from(&self, action: LifecycleAction) -> &'static [AppointmentStatus] {
        match action {
            LifecycleAction::Confirm | LifecycleAction::Decline => &[AppointmentStatus::Pending],
            LifecycleAction::Complete | LifecycleAction::MarkNoShow => &[AppointmentStatus::Confirmed],
            LifecycleAction::Cancel | LifecycleAction::Reschedule => {
                &[AppointmentStatus::Pending, AppointmentStatus::Confirmed]
            }
        }
    }

    fn staff_only(&self, action: LifecycleAction) -> bool {
        matches!(
            action,
            LifecycleAction::Confirm
                | LifecycleAction::Decline
                | LifecycleAction::Complete
                | LifecycleAction::MarkNoShow
        )
    }

    /// Strictly more than 24 hours between `now` and `start`.
    pub fn is_beyond_cutoff(&self, start: DateTime<FixedOffset>, now: DateTime<FixedOffset>) -> bool {
        start - now > Duration::hours(CHANGE_CUTOFF_HOURS)
    }

    /// Checks every guard for `action` and returns the status the appointment ends in.
    pub fn plan(
        &self,
        action: LifecycleAction,
        actor: &Actor,
        appointment: &Appointment,
        start: DateTime<FixedOffset>,
        now: DateTime<FixedOffset>,
    ) -> Result<AppointmentStatus, AppointmentError> {
        debug!("Planning {} on appointment {} ({})", action, appointment.id, appointment.status);

        if !actor.is_party_to(appointment) {
            return Err(AppointmentError::Forbidden(
                "You can only act on your own appointments".to_string(),
            ));
        }
        if self.staff_only(action) && !actor.is_staff() {
            return Err(AppointmentError::Forbidden(format!(
                "Only the dentist or an administrator can {} an appointment",
                action
            )));
        }

        let current = appointment.status;
        if !self.allowed_from(action).contains(&current) {
            warn!("Rejected {} on appointment {} in status {}", action, appointment.id, current);
            return Err(AppointmentError::InvalidTransition { action, from: current });
        }

        let needs_notice = matches!(action, LifecycleAction::Cancel | LifecycleAction::Reschedule);
        if needs_notice && current == AppointmentStatus::Confirmed && !self.is_beyond_cutoff(start, now) {
            warn!("Rejected {} on appointment {}: inside the {}h cutoff", action, appointment.id, CHANGE_CUTOFF_HOURS);
            return Err(AppointmentError::WithinCutoff);
        }

        Ok(match action {
            LifecycleAction::Confirm => AppointmentStatus::Confirmed,
            LifecycleAction::Decline | LifecycleAction::Cancel => AppointmentStatus::Cancelled,
            LifecycleAction::Complete => AppointmentStatus::Completed,
            LifecycleAction::MarkNoShow => AppointmentStatus::NoShow,
            LifecycleAction::Reschedule => current,
        })
    }
}
