use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use appointment_cell::{
    Actor, Appointment, AppointmentBookingService, AppointmentError, CreateAppointmentRequest,
};
use auth_cell::{AuthError, AuthService, AuthSession, LoginCredentials, RegisterProfile};
use shared_config::AppConfig;
use shared_models::auth::User;

use crate::error::{GuestBookingError, ScratchStoreError};
use crate::models::{AttemptRecord, BookingIntent, GuestBookingOutcome, GuestProfile, PendingBooking};
use crate::services::scratch::ScratchStore;

/// An attempt left behind by a request that never finished stops blocking the session after this.
pub const ATTEMPT_TTL: Duration = Duration::from_secs(120);

const MAX_SESSION_ID_LEN: usize = 128;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self, credentials: &LoginCredentials) -> Result<AuthSession, AuthError>;

    async fn register(&self, profile: &RegisterProfile) -> Result<AuthSession, AuthError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppointmentCreator: Send + Sync {
    async fn create(
        &self,
        actor: &Actor,
        request: CreateAppointmentRequest,
        access_token: &str,
    ) -> Result<Appointment, AppointmentError>;
}

#[async_trait]
impl Authenticator for AuthService {
    async fn login(&self, credentials: &LoginCredentials) -> Result<AuthSession, AuthError> {
        AuthService::login(self, credentials).await
    }

    async fn register(&self, profile: &RegisterProfile) -> Result<AuthSession, AuthError> {
        AuthService::register(self, profile).await
    }
}

#[async_trait]
impl AppointmentCreator for AppointmentBookingService {
    async fn create(
        &self,
        actor: &Actor,
        request: CreateAppointmentRequest,
        access_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.create_appointment(actor, request, access_token).await
    }
}

fn intent_key(session_id: &str) -> String {
    format!("guest_booking:{}:intent", session_id)
}

fn profile_key(session_id: &str) -> String {
    format!("guest_booking:{}:profile", session_id)
}

fn attempt_key(session_id: &str) -> String {
    format!("guest_booking:{}:attempt", session_id)
}

fn encode<T: serde::Serialize>(value: &T) -> Result<String, GuestBookingError> {
    Ok(serde_json::to_string(value).map_err(ScratchStoreError::from)?)
}

pub fn validate_session_id(session_id: &str) -> Result<(), GuestBookingError> {
    let well_formed = !session_id.is_empty()
        && session_id.len() <= MAX_SESSION_ID_LEN
        && session_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if well_formed {
        Ok(())
    } else {
        Err(GuestBookingError::InvalidSession(
            "use 1-128 letters, digits, '-' or '_'".to_string(),
        ))
    }
}

/// Books a guest's chosen slot once they have signed in or registered.
///
/// Create is issued at most once per intent. The attempt marker is written with `put_if_absent`
/// before the intent is read and only removed after Create has resolved, so a duplicated or
/// reloaded request either finds the marker or finds the intent already cleared.
pub struct GuestBookingFlow<A, C> {
    store: Arc<dyn ScratchStore>,
    authenticator: A,
    creator: C,
    intent_ttl: Duration,
}

impl GuestBookingFlow<AuthService, AppointmentBookingService> {
    pub fn from_config(config: &AppConfig, store: Arc<dyn ScratchStore>) -> Self {
        Self::new(
            store,
            AuthService::new(config),
            AppointmentBookingService::new(config),
            Duration::from_secs(config.guest_intent_ttl_secs),
        )
    }
}

impl<A: Authenticator, C: AppointmentCreator> GuestBookingFlow<A, C> {
    pub fn new(store: Arc<dyn ScratchStore>, authenticator: A, creator: C, intent_ttl: Duration) -> Self {
        Self {
            store,
            authenticator,
            creator,
            intent_ttl,
        }
    }

    pub async fn save_intent(
        &self,
        session_id: &str,
        intent: BookingIntent,
        profile: Option<GuestProfile>,
    ) -> Result<(), GuestBookingError> {
        validate_session_id(session_id)?;
        intent.validate()?;

        if self.attempt_in_progress(session_id).await? {
            return Err(GuestBookingError::AttemptInProgress);
        }

        self.store
            .put(&intent_key(session_id), encode(&intent)?, self.intent_ttl)
            .await?;

        match profile {
            Some(profile) => {
                self.store.put(&profile_key(session_id), encode(&profile)?, self.intent_ttl).await?;
            }
            None => self.store.remove(&profile_key(session_id)).await?,
        }

        debug!("Saved booking intent for guest session {}", session_id);
        Ok(())
    }

    pub async fn pending_intent(&self, session_id: &str) -> Result<Option<PendingBooking>, GuestBookingError> {
        validate_session_id(session_id)?;

        let Some(intent) = self.load::<BookingIntent>(&intent_key(session_id)).await? else {
            return Ok(None);
        };
        let profile = self.load::<GuestProfile>(&profile_key(session_id)).await?;

        Ok(Some(PendingBooking {
            intent,
            profile,
            attempt_in_progress: self.attempt_in_progress(session_id).await?,
        }))
    }

    pub async fn discard(&self, session_id: &str) -> Result<(), GuestBookingError> {
        validate_session_id(session_id)?;

        if self.attempt_in_progress(session_id).await? {
            return Err(GuestBookingError::AttemptInProgress);
        }

        self.store.remove(&intent_key(session_id)).await?;
        self.store.remove(&profile_key(session_id)).await?;
        debug!("Discarded booking intent for guest session {}", session_id);
        Ok(())
    }

    pub async fn complete_with_login(
        &self,
        session_id: &str,
        credentials: LoginCredentials,
    ) -> Result<GuestBookingOutcome, GuestBookingError> {
        let (intent, attempt) = self.begin(session_id).await?;

        let session = match self.authenticator.login(&credentials).await {
            Ok(session) => session,
            Err(e) => return Err(self.abandon(session_id, e).await),
        };

        self.book(session_id, intent, attempt, session, true).await
    }

    pub async fn complete_with_registration(
        &self,
        session_id: &str,
        profile: RegisterProfile,
    ) -> Result<GuestBookingOutcome, GuestBookingError> {
        let (intent, attempt) = self.begin(session_id).await?;

        let session = match self.authenticator.register(&profile).await {
            Ok(session) => session,
            Err(e) => return Err(self.abandon(session_id, e).await),
        };

        self.book(session_id, intent, attempt, session, true).await
    }

    /// For a guest who signed in but whose booking was interrupted, e.g. by a page reload.
    pub async fn resume(
        &self,
        session_id: &str,
        user: User,
        access_token: String,
    ) -> Result<GuestBookingOutcome, GuestBookingError> {
        let (intent, attempt) = self.begin(session_id).await?;

        let session = AuthSession {
            access_token,
            refresh_token: None,
            expires_in: None,
            user,
        };

        self.book(session_id, intent, attempt, session, false).await
    }

    /// Claims the attempt before reading the intent, so a request that arrives after another
    /// one finished finds the intent already cleared.
    async fn begin(&self, session_id: &str) -> Result<(BookingIntent, AttemptRecord), GuestBookingError> {
        validate_session_id(session_id)?;

        let attempt = AttemptRecord::start();
        if !self.store.put_if_absent(&attempt_key(session_id), encode(&attempt)?, ATTEMPT_TTL).await? {
            warn!("Guest session {} already has a booking attempt in flight", session_id);
            return Err(GuestBookingError::AttemptInProgress);
        }

        let intent = match self.load::<BookingIntent>(&intent_key(session_id)).await {
            Ok(Some(intent)) => intent,
            Ok(None) => {
                self.release_attempt(session_id).await;
                return Err(GuestBookingError::NoPendingBooking);
            }
            Err(e) => {
                self.release_attempt(session_id).await;
                return Err(e);
            }
        };

        debug!("Claimed attempt {} for guest session {}", attempt.attempt_id, session_id);
        Ok((intent, attempt))
    }

    async fn abandon(&self, session_id: &str, err: AuthError) -> GuestBookingError {
        warn!("Guest session {} failed to sign in: {}", session_id, err);
        self.release_attempt(session_id).await;
        GuestBookingError::Authentication(err)
    }

    async fn book(
        &self,
        session_id: &str,
        intent: BookingIntent,
        attempt: AttemptRecord,
        session: AuthSession,
        return_session: bool,
    ) -> Result<GuestBookingOutcome, GuestBookingError> {
        let result = match Actor::try_from(&session.user) {
            Ok(actor) => {
                let request = intent.to_create_request(attempt.attempt_id.to_string());
                self.creator.create(&actor, request, &session.access_token).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(appointment) => {
                // The appointment exists; a failed cleanup must not turn it into an error.
                for key in [intent_key(session_id), profile_key(session_id)] {
                    if let Err(e) = self.store.remove(&key).await {
                        warn!("Could not clear {} after booking {}: {}", key, appointment.id, e);
                    }
                }
                self.release_attempt(session_id).await;

                info!(
                    "Guest session {} booked appointment {} as user {}",
                    session_id, appointment.id, session.user.id
                );
                Ok(GuestBookingOutcome {
                    appointment,
                    session: return_session.then_some(session),
                })
            }
            Err(source) => {
                warn!(
                    "Guest session {} signed in as {} but booking failed: {}",
                    session_id, session.user.id, source
                );
                self.release_attempt(session_id).await;
                Err(GuestBookingError::BookingFailedAfterSignIn {
                    session: Box::new(session),
                    source,
                })
            }
        }
    }

    /// Best effort. A marker that cannot be removed still expires after `ATTEMPT_TTL`.
    async fn release_attempt(&self, session_id: &str) {
        if let Err(e) = self.store.remove(&attempt_key(session_id)).await {
            warn!("Could not release booking attempt for guest session {}: {}", session_id, e);
        }
    }

    async fn attempt_in_progress(&self, session_id: &str) -> Result<bool, GuestBookingError> {
        Ok(self.store.get(&attempt_key(session_id)).await?.is_some())
    }

    async fn load<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>, GuestBookingError> {
        match self.store.get(key).await? {
            Some(raw) => {
                let value = serde_json::from_str(&raw).map_err(ScratchStoreError::from)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}
