//! Rule file codec.
//!
//! # Format
//! ```text
//! # comment
//! SINGLE,22,22,10.0.0.2
//! RANGE,9000,9100,10.0.0.3,tcp   # trailing comments are stripped
//! SINGLE,53,53,10.0.0.4,udp,ipv6
//! ```
//! Fields are `type,startPort,endPort,destination[,protocol[,ipVersion]]`.
//! A rule with an IP version but no protocol keeps an empty protocol field.
//!
//! # Design Decisions
//! - Decoding never fails as a whole; bad lines become [`ParseWarning`]s
//! - Encoding is lossless for rule semantics, lossy for comments and layout
//! - SINGLE rules always encode their start port as the end port

use std::fmt;

use thiserror::Error;

use crate::rules::model::{RuleError, RuleKind, RuleRecord};

/// Why a line was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseIssue {
    #[error("missing {0} field")]
    MissingField(&'static str),

    #[error("unknown rule type {0:?}")]
    UnknownKind(String),

    #[error("{field} {value:?} is not a port number")]
    InvalidPort { field: &'static str, value: String },

    #[error("end port {end} is lower than start port {start}")]
    InvertedRange { start: u16, end: u16 },

    #[error(transparent)]
    InvalidRule(RuleError),
}

/// Diagnostic for one rejected line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    /// 1-based line number in the decoded text.
    pub line: usize,
    /// The raw line, untrimmed comment included.
    pub content: String,
    pub issue: ParseIssue,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} ({:?})", self.line, self.issue, self.content)
    }
}

/// Result of a decode pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decoded {
    pub rules: Vec<RuleRecord>,
    pub warnings: Vec<ParseWarning>,
}

/// Parse rule text, keeping every valid line in file order.
pub fn decode(text: &str) -> Decoded {
    let mut decoded = Decoded::default();

    for (idx, raw) in text.lines().enumerate() {
        let content = strip_comment(raw.trim());
        if content.is_empty() {
            continue;
        }

        match parse_line(content) {
            Ok(rule) => decoded.rules.push(rule),
            Err(issue) => {
                let warning = ParseWarning {
                    line: idx + 1,
                    content: raw.to_string(),
                    issue,
                };
                tracing::warn!(
                    line = warning.line,
                    content = %warning.content,
                    issue = %warning.issue,
                    "Skipping invalid rule line"
                );
                decoded.warnings.push(warning);
            }
        }
    }

    decoded
}

/// Serialize rules, one `\n`-terminated line each.
pub fn encode(rules: &[RuleRecord]) -> String {
    let mut out = String::new();
    for rule in rules {
        out.push_str(&encode_line(rule));
        out.push('\n');
    }
    out
}

/// Serialize one rule without a line terminator.
pub fn encode_line(rule: &RuleRecord) -> String {
    let mut line = format!(
        "{},{},{},{}",
        rule.kind,
        rule.start_port,
        rule.effective_end_port(),
        rule.destination
    );
    if rule.protocol.is_some() || rule.ip_version.is_some() {
        line.push(',');
        line.push_str(rule.protocol.as_deref().unwrap_or(""));
    }
    if let Some(ip_version) = &rule.ip_version {
        line.push(',');
        line.push_str(ip_version);
    }
    line
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => line[..pos].trim(),
        None => line,
    }
}

fn parse_line(content: &str) -> Result<RuleRecord, ParseIssue> {
    let fields: Vec<&str> = content.split(',').map(str::trim).collect();

    let kind_field = non_empty(fields.first()).ok_or(ParseIssue::MissingField("type"))?;
    let start_field = non_empty(fields.get(1)).ok_or(ParseIssue::MissingField("startPort"))?;
    let end_field = non_empty(fields.get(2));
    let destination =
        non_empty(fields.get(3)).ok_or(ParseIssue::MissingField("destination"))?;
    let protocol = non_empty(fields.get(4)).map(str::to_string);
    let ip_version = non_empty(fields.get(5)).map(str::to_string);

    if fields.len() > 6 {
        tracing::debug!(
            extra = fields.len() - 6,
            line = content,
            "Ignoring trailing rule fields"
        );
    }

    let kind: RuleKind = kind_field.parse().map_err(ParseIssue::UnknownKind)?;
    let start_port = parse_port("startPort", start_field)?;

    let rule = match kind {
        // The end field on SINGLE lines is a placeholder.
        RuleKind::Single => RuleRecord::single(start_port, destination, protocol),
        RuleKind::Range => {
            let end_field = end_field.ok_or(ParseIssue::MissingField("endPort"))?;
            let end_port = parse_port("endPort", end_field)?;
            if end_port < start_port {
                return Err(ParseIssue::InvertedRange {
                    start: start_port,
                    end: end_port,
                });
            }
            RuleRecord::range(start_port, end_port, destination, protocol)
        }
    };

    rule.and_then(|rule| rule.with_ip_version(ip_version))
        .map_err(ParseIssue::InvalidRule)
}

fn non_empty<'a>(field: Option<&&'a str>) -> Option<&'a str> {
    field.copied().filter(|f| !f.is_empty())
}

fn parse_port(field: &'static str, value: &str) -> Result<u16, ParseIssue> {
    match value.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ParseIssue::InvalidPort {
            field,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_basic_file() {
        let text = "\
# forwarded services
SINGLE,80,80,baidu.com
SINGLE,99,99,baidu.com,tcp

RANGE,100,200,baidu.com
";
        let decoded = decode(text);
        assert!(decoded.warnings.is_empty());
        assert_eq!(decoded.rules.len(), 3);
        assert_eq!(decoded.rules[0].kind, RuleKind::Single);
        assert_eq!(decoded.rules[1].protocol.as_deref(), Some("tcp"));
        assert_eq!(decoded.rules[2].end_port, Some(200));
    }

    #[test]
    fn test_comment_stripping() {
        let decoded = decode("RANGE,9000,9100,10.0.0.3,tcp # web range");
        assert_eq!(
            decoded.rules,
            vec![RuleRecord {
                kind: RuleKind::Range,
                start_port: 9000,
                end_port: Some(9100),
                destination: "10.0.0.3".into(),
                protocol: Some("tcp".into()),
                ip_version: None,
            }]
        );
    }

    #[test]
    fn test_empty_and_comment_only_documents() {
        assert_eq!(decode(""), Decoded::default());
        assert_eq!(decode("# nothing\n\n   # here\n"), Decoded::default());
    }

    #[test]
    fn test_short_lines_are_skipped() {
        let decoded = decode("SINGLE,22,22\nSINGLE,22\nSINGLE\nSINGLE,23,23,10.0.0.9");
        assert_eq!(decoded.rules.len(), 1);
        assert_eq!(decoded.rules[0].start_port, 23);
        assert_eq!(decoded.warnings.len(), 3);
        assert_eq!(
            decoded.warnings[0].issue,
            ParseIssue::MissingField("destination")
        );
        assert_eq!(decoded.warnings[1].line, 2);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let decoded = decode("single,22,22,10.0.0.2\nREDIRECT,1,2,x");
        assert!(decoded.rules.is_empty());
        assert_eq!(
            decoded.warnings[0].issue,
            ParseIssue::UnknownKind("single".into())
        );
    }

    #[test]
    fn test_inverted_range_rejected() {
        let decoded = decode("RANGE,8000,7000,10.0.0.5");
        assert!(decoded.rules.is_empty());
        assert_eq!(
            decoded.warnings[0].issue,
            ParseIssue::InvertedRange { start: 8000, end: 7000 }
        );
    }

    #[test]
    fn test_range_requires_numeric_end() {
        let decoded = decode("RANGE,8000,,10.0.0.5\nRANGE,8000,abc,10.0.0.5");
        assert!(decoded.rules.is_empty());
        assert_eq!(decoded.warnings[0].issue, ParseIssue::MissingField("endPort"));
        assert!(matches!(
            decoded.warnings[1].issue,
            ParseIssue::InvalidPort { field: "endPort", .. }
        ));
    }

    #[test]
    fn test_single_end_is_placeholder() {
        let decoded = decode("SINGLE,22,whatever,10.0.0.2\nSINGLE,23,,10.0.0.2");
        assert!(decoded.warnings.is_empty());
        assert_eq!(decoded.rules[0].effective_end_port(), 22);
        assert_eq!(decoded.rules[1].effective_end_port(), 23);
    }

    #[test]
    fn test_bad_ports_rejected() {
        let decoded = decode("SINGLE,abc,1,x\nSINGLE,0,0,x\nSINGLE,70000,1,x");
        assert!(decoded.rules.is_empty());
        assert_eq!(decoded.warnings.len(), 3);
    }

    #[test]
    fn test_malformed_lines_do_not_stop_decoding() {
        let text = "garbage\nSINGLE,22,22,10.0.0.2\n,,,\nRANGE,1,2,host,udp";
        let decoded = decode(text);
        assert_eq!(decoded.rules.len(), 2);
        assert_eq!(decoded.warnings.len(), 2);
    }

    #[test]
    fn test_empty_protocol_is_absent() {
        let decoded = decode("SINGLE,22,22,10.0.0.2,");
        assert_eq!(decoded.rules[0].protocol, None);
    }

    #[test]
    fn test_ip_version_field_survives_encode() {
        let text = "\
SINGLE,22,22,10.0.0.2,tcp,ipv6
RANGE,100,200,baidu.com,all,all
SINGLE,53,53,10.0.0.4,,ipv4
";
        let decoded = decode(text);
        assert!(decoded.warnings.is_empty());
        assert_eq!(decoded.rules[0].ip_version.as_deref(), Some("ipv6"));
        assert_eq!(decoded.rules[2].protocol, None);
        assert_eq!(decoded.rules[2].ip_version.as_deref(), Some("ipv4"));
        assert_eq!(encode(&decoded.rules), text);
    }

    #[test]
    fn test_fields_past_ip_version_are_ignored() {
        let decoded = decode("SINGLE,22,22,10.0.0.2,tcp,ipv6,extra");
        assert!(decoded.warnings.is_empty());
        assert_eq!(encode_line(&decoded.rules[0]), "SINGLE,22,22,10.0.0.2,tcp,ipv6");
    }

    #[test]
    fn test_encode_single_fills_end_port() {
        let rule = RuleRecord::single(22, "10.0.0.2", None).unwrap();
        assert_eq!(encode_line(&rule), "SINGLE,22,22,10.0.0.2");
    }

    #[test]
    fn test_encode_protocol_only_when_present() {
        let rules = vec![
            RuleRecord::range(100, 200, "baidu.com", None).unwrap(),
            RuleRecord::single(99, "baidu.com", Some("udp".into())).unwrap(),
        ];
        assert_eq!(
            encode(&rules),
            "RANGE,100,200,baidu.com\nSINGLE,99,99,baidu.com,udp\n"
        );
        assert_eq!(encode(&[]), "");
    }

    #[test]
    fn test_decode_encode_preserves_rules() {
        let rules = vec![
            RuleRecord::single(22, "10.0.0.2", None).unwrap(),
            RuleRecord::range(9000, 9100, "10.0.0.3", Some("tcp".into())).unwrap(),
            RuleRecord::single(22, "10.0.0.2", None).unwrap(),
            RuleRecord::single(443, "host.example:8443", Some("udp".into())).unwrap(),
            RuleRecord::range(7000, 7010, "10.0.0.8", None)
                .unwrap()
                .with_ip_version(Some("ipv6".into()))
                .unwrap(),
        ];
        let decoded = decode(&encode(&rules));
        assert!(decoded.warnings.is_empty());
        assert_eq!(decoded.rules, rules);
    }
}
