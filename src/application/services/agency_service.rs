use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::dtos::{LoginRequest, NewTenderRequest, SessionView, TenderDocument};
use crate::domain::{AgencyProfile, DashboardSummary, PortalError, Session, Tender, TenderStatus};
use crate::settings::SettingsManager;

/// Contract for the authenticated agency side of the remote API.
#[async_trait]
pub trait AgencyApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<String, PortalError>;

    async fn profile(&self, token: &str) -> Result<AgencyProfile, PortalError>;

    async fn dashboard(&self, session: &Session) -> Result<DashboardSummary, PortalError>;

    async fn update_tender_status(
        &self,
        session: &Session,
        tender_id: Uuid,
        status: TenderStatus,
    ) -> Result<Tender, PortalError>;

    async fn create_tender(
        &self,
        session: &Session,
        request: &NewTenderRequest,
        document: Option<TenderDocument>,
    ) -> Result<(), PortalError>;
}

/// Session lifecycle plus the dashboard and tender operations.
///
/// The session is an explicit object created at login and destroyed at
/// logout; every authenticated request receives it as an argument. Only the
/// bearer token is persisted, so a restart goes through `resume`.
pub struct AgencyService {
    api: Arc<dyn AgencyApi>,
    settings: Arc<SettingsManager>,
    session: RwLock<Option<Session>>,
}

impl AgencyService {
    pub fn new(api: Arc<dyn AgencyApi>, settings: Arc<SettingsManager>) -> Self {
        Self {
            api,
            settings,
            session: RwLock::new(None),
        }
    }

    /// Exchanges credentials for a bearer token, resolves the agency profile
    /// behind it, persists the token and installs the session.
    pub async fn login(&self, request: LoginRequest) -> Result<SessionView, PortalError> {
        let email = request.email.trim();
        if email.is_empty() {
            return Err(PortalError::validation("email is required"));
        }
        if request.password.is_empty() {
            return Err(PortalError::validation("password is required"));
        }

        let token = self.api.login(email, &request.password).await?;
        let profile = self.api.profile(&token).await?;

        self.settings.set_token(&token)?;
        let session = Session {
            token,
            agency_id: profile.id,
            company_name: profile.company_name,
        };
        let view = view_of(&session);
        *self.session.write() = Some(session);

        info!(agency = %view.agency_id, "agency signed in");
        Ok(view)
    }

    /// Rebuilds the session from a previously persisted token, if any.
    ///
    /// A rejected token is deleted so the next start goes straight to the
    /// login form; a transport failure keeps it for a later retry.
    pub async fn resume(&self) -> Result<Option<SessionView>, PortalError> {
        let Some(token) = self.settings.token() else {
            return Ok(None);
        };

        match self.api.profile(&token).await {
            Ok(profile) => {
                let session = Session {
                    token,
                    agency_id: profile.id,
                    company_name: profile.company_name,
                };
                let view = view_of(&session);
                *self.session.write() = Some(session);
                debug!(agency = %view.agency_id, "session resumed from stored token");
                Ok(Some(view))
            }
            Err(err) if err.is_auth() => {
                warn!("stored token rejected; clearing it");
                self.settings.clear_token()?;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Destroys the session and deletes the stored token.
    pub fn logout(&self) -> Result<(), PortalError> {
        *self.session.write() = None;
        self.settings.clear_token()
    }

    pub fn current(&self) -> Option<SessionView> {
        self.session.read().as_ref().map(view_of)
    }

    fn session(&self) -> Result<Session, PortalError> {
        self.session
            .read()
            .clone()
            .ok_or_else(|| PortalError::auth("not signed in"))
    }

    pub async fn dashboard(&self) -> Result<DashboardSummary, PortalError> {
        let session = self.session()?;
        self.api.dashboard(&session).await
    }

    /// Updates one tender's status; callers refetch the dashboard afterwards.
    pub async fn update_tender_status(
        &self,
        tender_id: Uuid,
        status: TenderStatus,
    ) -> Result<Tender, PortalError> {
        let session = self.session()?;
        let tender = self.api.update_tender_status(&session, tender_id, status).await?;
        info!(tender = %tender.id, status = status.as_str(), "tender status updated");
        Ok(tender)
    }

    /// Validates and submits the tender-creation form.
    pub async fn create_tender(&self, request: NewTenderRequest) -> Result<(), PortalError> {
        let session = self.session()?;
        validate_tender(&request)?;

        let document = request.document.as_ref().map(|payload| payload.decode()).transpose()?;
        self.api.create_tender(&session, &request, document).await?;
        info!(title = %request.title, "tender created");
        Ok(())
    }
}

fn view_of(session: &Session) -> SessionView {
    SessionView {
        agency_id: session.agency_id,
        company_name: session.company_name.clone(),
    }
}

fn validate_tender(request: &NewTenderRequest) -> Result<(), PortalError> {
    if request.title.trim().is_empty() {
        return Err(PortalError::validation("title is required"));
    }
    if request.description.trim().is_empty() {
        return Err(PortalError::validation("description is required"));
    }
    if request.location.trim().is_empty() {
        return Err(PortalError::validation("location is required"));
    }
    if request.contact_info.trim().is_empty() {
        return Err(PortalError::validation("contact info is required"));
    }
    if request.category_id <= 0 {
        return Err(PortalError::validation("a category must be selected"));
    }
    if request.closing_date <= Utc::now() {
        return Err(PortalError::validation("closing date must be in the future"));
    }
    Ok(())
}
