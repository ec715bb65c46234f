//! In-memory rule model.
//!
//! A [`RuleRecord`] is one port-forwarding directive. SINGLE rules keep
//! `end_port` empty and report `start_port` as their effective end; RANGE
//! rules always carry an explicit, non-inverted end port.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rule kind as written in the first field of a rule line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleKind {
    /// Forwards exactly one port.
    Single,
    /// Forwards an inclusive port interval.
    Range,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Single => "SINGLE",
            RuleKind::Range => "RANGE",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-sensitive: only `SINGLE` and `RANGE` are accepted.
impl FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SINGLE" => Ok(RuleKind::Single),
            "RANGE" => Ok(RuleKind::Range),
            other => Err(other.to_string()),
        }
    }
}

/// Invariant violations for a single rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("port {0} is outside 1-65535")]
    PortOutOfRange(u16),

    #[error("RANGE rule requires an end port")]
    MissingEndPort,

    #[error("end port {end} is lower than start port {start}")]
    InvertedRange { start: u16, end: u16 },

    #[error("destination must not be empty")]
    EmptyDestination,

    #[error("destination {0:?} cannot be written to the rule file")]
    InvalidDestination(String),

    #[error("protocol {0:?} cannot be written to the rule file")]
    InvalidProtocol(String),

    #[error("IP version {0:?} cannot be written to the rule file")]
    InvalidIpVersion(String),
}

/// One NAT port-forwarding rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleRecord {
    pub kind: RuleKind,
    pub start_port: u16,
    pub end_port: Option<u16>,
    pub destination: String,
    /// `None` applies the forward to all protocols.
    pub protocol: Option<String>,
    /// Address family token (`ipv4`, `ipv6`, `all`) read by the forwarding
    /// engine. `None` leaves the engine default in place.
    pub ip_version: Option<String>,
}

impl RuleRecord {
    /// Build a SINGLE rule. The end port is implied by `start_port`.
    pub fn single(
        start_port: u16,
        destination: impl Into<String>,
        protocol: Option<String>,
    ) -> Result<Self, RuleError> {
        let rule = Self {
            kind: RuleKind::Single,
            start_port,
            end_port: None,
            destination: destination.into(),
            protocol,
            ip_version: None,
        };
        rule.validate()?;
        Ok(rule)
    }

    /// Build a RANGE rule covering `start_port..=end_port`.
    pub fn range(
        start_port: u16,
        end_port: u16,
        destination: impl Into<String>,
        protocol: Option<String>,
    ) -> Result<Self, RuleError> {
        let rule = Self {
            kind: RuleKind::Range,
            start_port,
            end_port: Some(end_port),
            destination: destination.into(),
            protocol,
            ip_version: None,
        };
        rule.validate()?;
        Ok(rule)
    }

    /// Pin the address family the engine forwards on.
    pub fn with_ip_version(mut self, ip_version: Option<String>) -> Result<Self, RuleError> {
        self.ip_version = ip_version;
        self.validate()?;
        Ok(self)
    }

    /// The concrete end port: SINGLE echoes the start port.
    pub fn effective_end_port(&self) -> u16 {
        match self.kind {
            RuleKind::Single => self.start_port,
            RuleKind::Range => self.end_port.unwrap_or(self.start_port),
        }
    }

    /// Check every per-kind invariant.
    pub fn validate(&self) -> Result<(), RuleError> {
        check_port(self.start_port)?;

        match self.kind {
            RuleKind::Single => {
                // A stored companion port on SINGLE must still be a real port.
                if let Some(end) = self.end_port {
                    check_port(end)?;
                }
            }
            RuleKind::Range => {
                let end = self.end_port.ok_or(RuleError::MissingEndPort)?;
                check_port(end)?;
                if end < self.start_port {
                    return Err(RuleError::InvertedRange {
                        start: self.start_port,
                        end,
                    });
                }
            }
        }

        if self.destination.trim().is_empty() {
            return Err(RuleError::EmptyDestination);
        }
        if !fits_field(&self.destination) {
            return Err(RuleError::InvalidDestination(self.destination.clone()));
        }

        if let Some(protocol) = &self.protocol {
            if protocol.is_empty() || !fits_field(protocol) {
                return Err(RuleError::InvalidProtocol(protocol.clone()));
            }
        }

        if let Some(ip_version) = &self.ip_version {
            if ip_version.is_empty() || !fits_field(ip_version) {
                return Err(RuleError::InvalidIpVersion(ip_version.clone()));
            }
        }

        Ok(())
    }

    /// Merge `patch` over this record, producing a validated replacement.
    pub fn apply(&self, patch: &RulePatch) -> Result<RuleRecord, RuleError> {
        let kind = patch.kind.unwrap_or(self.kind);
        let mut end_port = match patch.end_port {
            Some(end) => end,
            None => self.end_port,
        };
        if kind == RuleKind::Single {
            end_port = None;
        }

        let merged = RuleRecord {
            kind,
            start_port: patch.start_port.unwrap_or(self.start_port),
            end_port,
            destination: patch
                .destination
                .clone()
                .unwrap_or_else(|| self.destination.clone()),
            protocol: match &patch.protocol {
                Some(protocol) => protocol.clone(),
                None => self.protocol.clone(),
            },
            ip_version: match &patch.ip_version {
                Some(ip_version) => ip_version.clone(),
                None => self.ip_version.clone(),
            },
        };
        merged.validate()?;
        Ok(merged)
    }
}

/// Partial update applied by `RuleStore::edit_at`.
///
/// Outer `None` keeps the current value. For the nullable fields an inner
/// `None` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RulePatch {
    pub kind: Option<RuleKind>,
    pub start_port: Option<u16>,
    pub end_port: Option<Option<u16>>,
    pub destination: Option<String>,
    pub protocol: Option<Option<String>>,
    pub ip_version: Option<Option<String>>,
}

fn check_port(port: u16) -> Result<(), RuleError> {
    if port == 0 {
        return Err(RuleError::PortOutOfRange(port));
    }
    Ok(())
}

/// Separators, comment markers and whitespace would not survive a decode.
fn fits_field(value: &str) -> bool {
    !value
        .chars()
        .any(|c| c == ',' || c == '#' || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse_is_case_sensitive() {
        assert_eq!("SINGLE".parse::<RuleKind>(), Ok(RuleKind::Single));
        assert_eq!("RANGE".parse::<RuleKind>(), Ok(RuleKind::Range));
        assert!("single".parse::<RuleKind>().is_err());
        assert!("Range".parse::<RuleKind>().is_err());
    }

    #[test]
    fn test_single_effective_end() {
        let rule = RuleRecord::single(22, "10.0.0.2", None).unwrap();
        assert_eq!(rule.end_port, None);
        assert_eq!(rule.effective_end_port(), 22);
    }

    #[test]
    fn test_range_invariants() {
        assert!(RuleRecord::range(9000, 9100, "10.0.0.3", None).is_ok());
        assert!(RuleRecord::range(9000, 9000, "10.0.0.3", None).is_ok());
        assert_eq!(
            RuleRecord::range(8000, 7000, "10.0.0.5", None),
            Err(RuleError::InvertedRange { start: 8000, end: 7000 })
        );
        assert_eq!(
            RuleRecord::range(0, 10, "10.0.0.5", None),
            Err(RuleError::PortOutOfRange(0))
        );
    }

    #[test]
    fn test_destination_required() {
        assert_eq!(
            RuleRecord::single(80, "  ", None),
            Err(RuleError::EmptyDestination)
        );
    }

    #[test]
    fn test_destination_must_fit_one_field() {
        assert_eq!(
            RuleRecord::single(80, "a.example,tcp", None),
            Err(RuleError::InvalidDestination("a.example,tcp".into()))
        );
    }

    #[test]
    fn test_protocol_must_fit_one_field() {
        assert!(RuleRecord::single(80, "a.example", Some("tcp".into())).is_ok());
        assert!(matches!(
            RuleRecord::single(80, "a.example", Some("tcp,udp".into())),
            Err(RuleError::InvalidProtocol(_))
        ));
        assert!(matches!(
            RuleRecord::single(80, "a.example", Some(String::new())),
            Err(RuleError::InvalidProtocol(_))
        ));
    }

    #[test]
    fn test_apply_keeps_unspecified_fields() {
        let rule = RuleRecord::range(100, 200, "example.com", Some("udp".into())).unwrap();
        let patch = RulePatch {
            destination: Some("10.1.1.1".into()),
            ..Default::default()
        };
        let merged = rule.apply(&patch).unwrap();
        assert_eq!(merged.kind, RuleKind::Range);
        assert_eq!(merged.start_port, 100);
        assert_eq!(merged.end_port, Some(200));
        assert_eq!(merged.destination, "10.1.1.1");
        assert_eq!(merged.protocol.as_deref(), Some("udp"));
    }

    #[test]
    fn test_apply_can_clear_protocol_and_switch_kind() {
        let rule = RuleRecord::range(100, 200, "example.com", Some("udp".into())).unwrap();
        let patch = RulePatch {
            kind: Some(RuleKind::Single),
            protocol: Some(None),
            ..Default::default()
        };
        let merged = rule.apply(&patch).unwrap();
        assert_eq!(merged.kind, RuleKind::Single);
        assert_eq!(merged.end_port, None);
        assert_eq!(merged.protocol, None);
    }

    #[test]
    fn test_ip_version_must_fit_one_field() {
        let rule = RuleRecord::single(80, "a.example", None).unwrap();
        let pinned = rule.clone().with_ip_version(Some("ipv6".into())).unwrap();
        assert_eq!(pinned.ip_version.as_deref(), Some("ipv6"));
        assert_eq!(
            rule.with_ip_version(Some("ipv 6".into())),
            Err(RuleError::InvalidIpVersion("ipv 6".into()))
        );
    }

    #[test]
    fn test_apply_keeps_ip_version_unless_patched() {
        let rule = RuleRecord::single(80, "a.example", None)
            .unwrap()
            .with_ip_version(Some("ipv6".into()))
            .unwrap();
        let moved = rule
            .apply(&RulePatch {
                start_port: Some(81),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(moved.ip_version.as_deref(), Some("ipv6"));

        let cleared = rule
            .apply(&RulePatch {
                ip_version: Some(None),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(cleared.ip_version, None);
    }

    #[test]
    fn test_apply_rejects_inverted_range() {
        let rule = RuleRecord::range(100, 200, "example.com", None).unwrap();
        let patch = RulePatch {
            start_port: Some(300),
            ..Default::default()
        };
        assert_eq!(
            rule.apply(&patch),
            Err(RuleError::InvertedRange { start: 300, end: 200 })
        );
    }
}
