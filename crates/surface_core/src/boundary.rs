//! Command boundary between the control surface and the reader backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::SettingsRecord,
    error::BoundaryError,
    protocol::{CommandFailure, CommandName, NoArgs, RunVoiceReaderArgs, SaveSettingsArgs},
};
use tracing::{debug, warn};
use url::Url;

#[async_trait]
pub trait CommandBoundary: Send + Sync {
    async fn load_settings(&self) -> Result<SettingsRecord, BoundaryError>;
    async fn save_settings(&self, settings: &SettingsRecord) -> Result<(), BoundaryError>;
    async fn device_list(&self) -> Result<Vec<String>, BoundaryError>;
    async fn run_voice_reader(&self, device: &str) -> Result<(), BoundaryError>;
    async fn stop_voice_reader(&self) -> Result<(), BoundaryError>;
}

/// Boundary used when no backend address is configured.
pub struct MissingBackend;

impl MissingBackend {
    fn unavailable<T>(command: CommandName) -> Result<T, BoundaryError> {
        Err(BoundaryError::unreachable(
            command,
            "no backend address configured",
        ))
    }
}

#[async_trait]
impl CommandBoundary for MissingBackend {
    async fn load_settings(&self) -> Result<SettingsRecord, BoundaryError> {
        Self::unavailable(CommandName::LoadSettings)
    }

    async fn save_settings(&self, _settings: &SettingsRecord) -> Result<(), BoundaryError> {
        Self::unavailable(CommandName::SaveSettings)
    }

    async fn device_list(&self) -> Result<Vec<String>, BoundaryError> {
        Self::unavailable(CommandName::DeviceList)
    }

    async fn run_voice_reader(&self, _device: &str) -> Result<(), BoundaryError> {
        Self::unavailable(CommandName::RunVoiceReader)
    }

    async fn stop_voice_reader(&self) -> Result<(), BoundaryError> {
        Self::unavailable(CommandName::StopVoiceReader)
    }
}

/// Invokes backend commands as `POST {base}/commands/{name}` with a JSON body.
pub struct HttpCommandBoundary {
    http: Client,
    base_url: Url,
}

impl HttpCommandBoundary {
    pub fn new(base_url: Url, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http,
            base_url: with_trailing_slash(base_url),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn command_url(&self, command: CommandName) -> Result<Url, BoundaryError> {
        self.base_url
            .join(&format!("commands/{}", command.as_str()))
            .map_err(|err| BoundaryError::unreachable(command, format!("invalid command url: {err}")))
    }

    async fn invoke<A, R>(&self, command: CommandName, args: &A) -> Result<R, BoundaryError>
    where
        A: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.command_url(command)?;
        debug!(command = %command, %url, "dispatching backend command");

        let res = self
            .http
            .post(url)
            .json(args)
            .send()
            .await
            .map_err(|err| transport_failure(command, err))?;

        let status = res.status();
        let body = res
            .bytes()
            .await
            .map_err(|err| transport_failure(command, err))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<CommandFailure>(&body)
                .map(|failure| failure.message)
                .unwrap_or_default();
            let reason = if message.trim().is_empty() {
                format!("backend rejected command with status {status}")
            } else {
                format!("backend rejected command with status {status}: {message}")
            };
            warn!(command = %command, %status, "backend command rejected");
            return Err(BoundaryError::unreachable(command, reason));
        }

        let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &body
        };
        serde_json::from_slice(body).map_err(|err| {
            warn!(command = %command, "undecodable backend reply: {err}");
            BoundaryError::unreachable(command, format!("undecodable backend reply: {err}"))
        })
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn transport_failure(command: CommandName, err: reqwest::Error) -> BoundaryError {
    let reason = if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("failed to connect: {err}")
    } else {
        err.to_string()
    };
    warn!(command = %command, "backend command transport failure: {reason}");
    BoundaryError::unreachable(command, reason)
}

#[async_trait]
impl CommandBoundary for HttpCommandBoundary {
    async fn load_settings(&self) -> Result<SettingsRecord, BoundaryError> {
        self.invoke(CommandName::LoadSettings, &NoArgs::default())
            .await
    }

    async fn save_settings(&self, settings: &SettingsRecord) -> Result<(), BoundaryError> {
        let args = SaveSettingsArgs {
            settings: settings.clone(),
        };
        self.invoke(CommandName::SaveSettings, &args).await
    }

    async fn device_list(&self) -> Result<Vec<String>, BoundaryError> {
        self.invoke(CommandName::DeviceList, &NoArgs::default())
            .await
    }

    async fn run_voice_reader(&self, device: &str) -> Result<(), BoundaryError> {
        let args = RunVoiceReaderArgs {
            device: device.to_string(),
        };
        self.invoke(CommandName::RunVoiceReader, &args).await
    }

    async fn stop_voice_reader(&self) -> Result<(), BoundaryError> {
        self.invoke(CommandName::StopVoiceReader, &NoArgs::default())
            .await
    }
}

#[cfg(test)]
#[path = "tests/boundary_tests.rs"]
mod tests;
