//! Google Calendar service with managed credentials.
//!
//! [`GoogleCalendar`] wraps [`GoogleCalendarClient`] with token persistence:
//! stored tokens are loaded on creation, expired access tokens are refreshed
//! before each call, and [`GoogleCalendar::authenticate`] runs the
//! interactive PKCE flow.

use icalsync_core::TargetEvent;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::service::{BoxFuture, CalendarInfo, CalendarService, EventPage, ListQuery};

use super::client::GoogleCalendarClient;
use super::config::GoogleConfig;
use super::oauth::OAuthClient;
use super::tokens::TokenStorage;

/// Google Calendar service.
pub struct GoogleCalendar {
    config: GoogleConfig,
    token_storage: TokenStorage,
    oauth_client: OAuthClient,
    api_client: RwLock<Option<GoogleCalendarClient>>,
}

impl std::fmt::Debug for GoogleCalendar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleCalendar")
            .field("token_path", &self.token_storage.path())
            .finish_non_exhaustive()
    }
}

impl GoogleCalendar {
    /// Creates a new service with the given configuration.
    ///
    /// This loads any existing tokens from storage but does not initiate
    /// authentication.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;

        let token_storage = TokenStorage::new(&config.token_path);
        token_storage.load()?;

        let oauth_client = OAuthClient::new(config.credentials.clone(), config.timeout)?;

        Ok(Self {
            config,
            token_storage,
            oauth_client,
            api_client: RwLock::new(None),
        })
    }

    /// Replaces the OAuth client (used by tests to point at a fake endpoint).
    pub fn with_oauth_client(mut self, oauth_client: OAuthClient) -> Self {
        self.oauth_client = oauth_client;
        self
    }

    /// Runs the interactive OAuth flow and stores the resulting tokens.
    pub async fn authenticate(&self) -> ProviderResult<()> {
        info!("starting Google authentication flow");

        let tokens = self
            .oauth_client
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await?;
        self.token_storage.set(tokens.clone())?;

        *self.api_client.write().await = Some(self.build_client(&tokens.access_token)?);

        info!(path = ?self.token_storage.path(), "authentication successful");
        Ok(())
    }

    /// Returns true if the stored tokens lack a required scope.
    pub fn needs_reauth(&self) -> bool {
        self.token_storage.needs_reauth(&self.config.scopes)
    }

    /// Returns true if usable tokens are stored.
    pub fn is_authenticated(&self) -> bool {
        self.token_storage
            .get()
            .is_some_and(|t| !t.is_expired() || t.refresh_token.is_some())
    }

    fn build_client(&self, access_token: &str) -> ProviderResult<GoogleCalendarClient> {
        Ok(GoogleCalendarClient::new(access_token, self.config.timeout)?
            .with_base_url(&self.config.api_base))
    }

    /// Returns an API client carrying a valid access token.
    async fn client(&self) -> ProviderResult<GoogleCalendarClient> {
        let tokens = self.token_storage.get().ok_or_else(|| {
            ProviderError::authentication("not authenticated - run 'icalsync auth'")
        })?;

        if !tokens.is_expired()
            && let Some(ref client) = *self.api_client.read().await
        {
            return Ok(client.clone());
        }

        let mut slot = self.api_client.write().await;

        let access_token = if tokens.is_expired() {
            let refresh_token = tokens.refresh_token.as_deref().ok_or_else(|| {
                ProviderError::authentication("no refresh token - re-authentication required")
            })?;

            debug!("refreshing expired access token");
            let (access_token, expires_in) =
                self.oauth_client.refresh_token(refresh_token).await?;
            self.token_storage
                .update_access_token(&access_token, expires_in)?;
            access_token
        } else {
            tokens.access_token
        };

        let client = match slot.as_mut() {
            Some(client) => {
                client.set_access_token(access_token);
                client.clone()
            }
            None => {
                let client = self.build_client(&access_token)?;
                *slot = Some(client.clone());
                client
            }
        };
        Ok(client)
    }
}

impl CalendarService for GoogleCalendar {
    fn name(&self) -> &str {
        "google"
    }

    fn get_calendar<'a>(
        &'a self,
        calendar_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<CalendarInfo>> {
        Box::pin(async move { self.client().await?.get_calendar(calendar_id).await })
    }

    fn list_events_page<'a>(
        &'a self,
        calendar_id: &'a str,
        query: &'a ListQuery,
    ) -> BoxFuture<'a, ProviderResult<EventPage>> {
        Box::pin(async move {
            self.client()
                .await?
                .list_events_page(calendar_id, query)
                .await
        })
    }

    fn insert_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event: &'a TargetEvent,
    ) -> BoxFuture<'a, ProviderResult<TargetEvent>> {
        Box::pin(async move { self.client().await?.insert_event(calendar_id, event).await })
    }

    fn update_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
        event: &'a TargetEvent,
    ) -> BoxFuture<'a, ProviderResult<TargetEvent>> {
        Box::pin(async move {
            self.client()
                .await?
                .update_event(calendar_id, event_id, event)
                .await
        })
    }

    fn delete_event<'a>(
        &'a self,
        calendar_id: &'a str,
        event_id: &'a str,
    ) -> BoxFuture<'a, ProviderResult<()>> {
        Box::pin(async move { self.client().await?.delete_event(calendar_id, event_id).await })
    }
}
