use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::UnknownSettingsField;

/// Reader settings as the backend persists them.
///
/// Every field is always present once decoded: a key that is missing or `null`
/// on the wire becomes an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRecord {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub slack_token: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub thread_url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub voicevox_url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub speaker_style_id: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl SettingsRecord {
    pub fn get(&self, field: SettingsField) -> &str {
        match field {
            SettingsField::SlackToken => &self.slack_token,
            SettingsField::ThreadUrl => &self.thread_url,
            SettingsField::VoicevoxUrl => &self.voicevox_url,
            SettingsField::SpeakerStyleId => &self.speaker_style_id,
        }
    }

    pub fn set(&mut self, field: SettingsField, value: impl Into<String>) {
        let slot = match field {
            SettingsField::SlackToken => &mut self.slack_token,
            SettingsField::ThreadUrl => &mut self.thread_url,
            SettingsField::VoicevoxUrl => &mut self.voicevox_url,
            SettingsField::SpeakerStyleId => &mut self.speaker_style_id,
        };
        *slot = value.into();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsField {
    SlackToken,
    ThreadUrl,
    VoicevoxUrl,
    SpeakerStyleId,
}

impl SettingsField {
    pub const ALL: [SettingsField; 4] = [
        SettingsField::SlackToken,
        SettingsField::ThreadUrl,
        SettingsField::VoicevoxUrl,
        SettingsField::SpeakerStyleId,
    ];

    /// Wire key of the field.
    pub fn key(self) -> &'static str {
        match self {
            SettingsField::SlackToken => "slackToken",
            SettingsField::ThreadUrl => "threadUrl",
            SettingsField::VoicevoxUrl => "voicevoxUrl",
            SettingsField::SpeakerStyleId => "speakerStyleId",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SettingsField::SlackToken => "Slack Token",
            SettingsField::ThreadUrl => "Thread URL",
            SettingsField::VoicevoxUrl => "VoiceVox URL",
            SettingsField::SpeakerStyleId => "Speaker Style ID",
        }
    }
}

impl fmt::Display for SettingsField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SettingsField {
    type Err = UnknownSettingsField;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized: String = raw
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        SettingsField::ALL
            .into_iter()
            .find(|field| field.key().to_ascii_lowercase() == normalized)
            .ok_or_else(|| UnknownSettingsField(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Running,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => f.write_str("idle"),
            RunState::Running => f.write_str("running"),
        }
    }
}
