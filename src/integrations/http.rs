//! Blocking HTTP plumbing shared by the live integrations.
//!
//! Every request goes through one `ureq` agent with a global timeout, so no
//! external call can stall a run. Non-2xx statuses are returned as responses
//! (not transport errors) and classified here.
use crate::error::IntegrationError;
use crate::util::truncate_string;
use serde::de::DeserializeOwned;
use std::time::Duration;
use ureq::http::Response;
use ureq::{Agent, Body};

const ERROR_BODY_MAX_BYTES: usize = 300;

#[derive(Clone)]
pub struct HttpClient {
    agent: Agent,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent, timeout }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Map a `ureq` failure onto the integration taxonomy.
    pub fn classify(&self, err: ureq::Error) -> IntegrationError {
        match err {
            ureq::Error::Timeout(_) => IntegrationError::Timeout(self.timeout),
            ureq::Error::Json(err) => IntegrationError::Protocol(err.to_string()),
            other => IntegrationError::Transport(other.to_string()),
        }
    }

    /// Pass 2xx responses through; turn everything else into an error.
    pub fn check(&self, mut response: Response<Body>) -> Result<Response<Body>, IntegrationError> {
        let status = response.status().as_u16();
        if response.status().is_success() {
            return Ok(response);
        }
        if status == 401 || status == 403 {
            return Err(IntegrationError::Auth { status });
        }
        let body = response
            .body_mut()
            .read_to_string()
            .unwrap_or_default();
        Err(IntegrationError::Status {
            status,
            body: truncate_string(body.trim(), ERROR_BODY_MAX_BYTES),
        })
    }

    pub fn read_json<T: DeserializeOwned>(
        &self,
        mut response: Response<Body>,
    ) -> Result<T, IntegrationError> {
        response
            .body_mut()
            .read_json::<T>()
            .map_err(|err| self.classify(err))
    }
}
