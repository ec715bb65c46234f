//! JSON request and response bodies for the rule API.
//!
//! Browser forms submit ports as strings, so port fields accept either a
//! JSON number or a numeric string.

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::rules::{RuleError, RuleKind, RulePatch, RuleRecord};

/// Wire form of one rule: `{type, startPort, endPort, destination, protocol?, ipVersion?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleBody {
    #[serde(rename = "type")]
    pub kind: RuleKind,

    #[serde(deserialize_with = "de_port")]
    pub start_port: u16,

    #[serde(default, deserialize_with = "de_opt_port")]
    pub end_port: Option<u16>,

    pub destination: String,

    #[serde(default, deserialize_with = "de_token", skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,

    #[serde(default, deserialize_with = "de_token", skip_serializing_if = "Option::is_none")]
    pub ip_version: Option<String>,
}

impl From<&RuleRecord> for RuleBody {
    fn from(rule: &RuleRecord) -> Self {
        Self {
            kind: rule.kind,
            start_port: rule.start_port,
            end_port: Some(rule.effective_end_port()),
            destination: rule.destination.clone(),
            protocol: rule.protocol.clone(),
            ip_version: rule.ip_version.clone(),
        }
    }
}

impl TryFrom<RuleBody> for RuleRecord {
    type Error = RuleError;

    fn try_from(body: RuleBody) -> Result<Self, Self::Error> {
        let destination = body.destination.trim().to_string();
        let rule = match body.kind {
            RuleKind::Single => RuleRecord::single(body.start_port, destination, body.protocol)?,
            RuleKind::Range => {
                let end = body.end_port.ok_or(RuleError::MissingEndPort)?;
                RuleRecord::range(body.start_port, end, destination, body.protocol)?
            }
        };
        rule.with_ip_version(body.ip_version)
    }
}

/// `POST /edit-rule`. Omitted fields keep their current value.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRuleRequest {
    pub index: i64,

    #[serde(default, rename = "type")]
    pub kind: Option<RuleKind>,

    #[serde(default, deserialize_with = "de_opt_port")]
    pub start_port: Option<u16>,

    #[serde(default, deserialize_with = "de_opt_port")]
    pub end_port: Option<u16>,

    #[serde(default)]
    pub destination: Option<String>,

    /// Absent keeps the protocol; `null` or `""` clears it.
    #[serde(default, deserialize_with = "de_token_patch")]
    pub protocol: Option<Option<String>>,

    #[serde(default, deserialize_with = "de_token_patch")]
    pub ip_version: Option<Option<String>>,
}

impl EditRuleRequest {
    pub fn patch(&self) -> RulePatch {
        RulePatch {
            kind: self.kind,
            start_port: self.start_port,
            end_port: self.end_port.map(Some),
            destination: self.destination.as_ref().map(|d| d.trim().to_string()),
            protocol: self.protocol.clone(),
            ip_version: self.ip_version.clone(),
        }
    }
}

/// `POST /delete-rule`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteRuleRequest {
    pub index: i64,
}

/// `POST /save-rules`.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveRulesRequest {
    pub rules: Vec<RuleBody>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PortInput {
    Number(u64),
    Text(String),
}

impl PortInput {
    /// `Ok(None)` for an empty string.
    fn into_port(self) -> Result<Option<u16>, String> {
        let value = match self {
            PortInput::Number(n) => n,
            PortInput::Text(s) if s.trim().is_empty() => return Ok(None),
            PortInput::Text(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("{s:?} is not a port number"))?,
        };
        match u16::try_from(value) {
            Ok(port) if port > 0 => Ok(Some(port)),
            _ => Err(format!("port {value} is outside 1-65535")),
        }
    }
}

fn de_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    PortInput::deserialize(deserializer)?
        .into_port()
        .map_err(de::Error::custom)?
        .ok_or_else(|| de::Error::custom("port is required"))
}

fn de_opt_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<PortInput>::deserialize(deserializer)? {
        Some(input) => input.into_port().map_err(de::Error::custom),
        None => Ok(None),
    }
}

fn normalize_token(value: Option<String>) -> Option<String> {
    value
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
}

fn de_token<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(normalize_token(Option::<String>::deserialize(deserializer)?))
}

fn de_token_patch<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(normalize_token(Option::<String>::deserialize(deserializer)?)))
}
