//! Supabase REST Client

use crate::config::SupabaseConfig;
use crate::error::{AppError, AppResult};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{error, info};

/// HTTP client bound to one project's PostgREST endpoint
#[derive(Debug)]
pub struct SupabaseClient {
    http: Client,
    rest_url: String,
    schema: String,
}

impl SupabaseClient {
    /// Build a client from settings; fails if the URL or key is missing
    pub fn from_config(config: &SupabaseConfig) -> AppResult<Self> {
        let url = config.url.as_deref().filter(|u| !u.is_empty());
        let (Some(url), Some(key)) = (url, config.effective_key()) else {
            return Err(AppError::Config(
                concat!(
                    "Supabase configuration missing: ensure SUPABASE_URL and ",
                    "SUPABASE_SERVICE_ROLE_KEY or SUPABASE_ANON_KEY are set"
                )
                .to_string(),
            ));
        };

        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(key)
            .map_err(|_| AppError::Config("Supabase key contains invalid characters".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", key))
            .map_err(|_| AppError::Config("Supabase key contains invalid characters".to_string()))?;
        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);

        let http = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                error!(error = %e, "Failed to create Supabase client");
                AppError::upstream("supabase_init_error", "Failed to initialize Supabase client")
            })?;

        Ok(Self {
            http,
            rest_url: format!("{}/rest/v1", url.trim_end_matches('/')),
            schema: config.schema.clone(),
        })
    }

    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Start a request against `table`, with the schema profile header set
    pub fn request(&self, method: Method, table: &str) -> RequestBuilder {
        let profile_header = if method == Method::GET || method == Method::HEAD {
            "Accept-Profile"
        } else {
            "Content-Profile"
        };

        self.http
            .request(method, format!("{}/{}", self.rest_url, table))
            .header(profile_header, self.schema.as_str())
    }
}

/// Lazily-initialized shared client.
///
/// The client is built on first use so the service can start (and serve
/// health and metrics) without database settings.
pub struct ClientHandle {
    config: SupabaseConfig,
    client: RwLock<Option<Arc<SupabaseClient>>>,
}

impl ClientHandle {
    pub fn new(config: SupabaseConfig) -> Self {
        Self {
            config,
            client: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    // Poisoned locks are recovered; the slot only ever holds a whole client or none.
    fn read_slot(&self) -> RwLockReadGuard<'_, Option<Arc<SupabaseClient>>> {
        self.client.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slot(&self) -> RwLockWriteGuard<'_, Option<Arc<SupabaseClient>>> {
        self.client.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the shared client, building it on first call
    pub fn get(&self) -> AppResult<Arc<SupabaseClient>> {
        if let Some(client) = self.read_slot().as_ref() {
            return Ok(client.clone());
        }

        let mut slot = self.write_slot();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        info!(schema = %self.config.schema, "Initializing Supabase client");
        let client = Arc::new(SupabaseClient::from_config(&self.config)?);
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Replace the shared client with a freshly built one
    pub fn reload(&self) -> AppResult<()> {
        let client = Arc::new(SupabaseClient::from_config(&self.config)?);
        info!("Reloading Supabase client");
        *self.write_slot() = Some(client);
        Ok(())
    }

    /// Drop the shared client; the next `get` builds a new one
    pub fn close(&self) {
        if self.write_slot().take().is_some() {
            info!("Closed Supabase client");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.read_slot().is_some()
    }
}
