//! Decoding of gate response bodies.
//!
//! A body looks like `"<TOKEN>#<URL>"`. Anything that cannot be split into
//! a non-empty token and remainder is inconclusive (`None`); everything that
//! can is terminal, and only the expected token with a usable URL yields a
//! web session.

use crate::domain::GateDecision;
use url::Url;

pub const SEPARATOR: char = '#';

/// Interprets gate response bodies against one expected token.
#[derive(Debug, Clone)]
pub struct DecisionParser {
    expected_token: String,
}

impl DecisionParser {
    pub fn new(expected_token: impl Into<String>) -> Self {
        Self {
            expected_token: expected_token.into(),
        }
    }

    pub fn parse(&self, raw: &str) -> Option<GateDecision> {
        let (token, remainder) = split_token(raw)?;
        if token == self.expected_token && is_web_destination(remainder) {
            Some(GateDecision::WebSession {
                destination_url: remainder.to_string(),
            })
        } else {
            Some(GateDecision::NativeApp)
        }
    }
}

/// Splits at the first separator. The remainder may contain more separators.
pub fn split_token(raw: &str) -> Option<(&str, &str)> {
    let (token, remainder) = raw.split_once(SEPARATOR)?;
    if token.is_empty() || remainder.is_empty() {
        return None;
    }
    Some((token, remainder))
}

/// An absolute `http`/`https` URL with a host.
pub fn is_web_destination(candidate: &str) -> bool {
    let Ok(url) = Url::parse(candidate) else {
        return false;
    };
    matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "GJDFHDFHFDJGSDAGKGHK";

    fn parser() -> DecisionParser {
        DecisionParser::new(TOKEN)
    }

    #[test]
    fn test_matching_token_gives_web_session() {
        assert_eq!(
            parser().parse("GJDFHDFHFDJGSDAGKGHK#https://example.com/x"),
            Some(GateDecision::WebSession {
                destination_url: "https://example.com/x".into()
            })
        );
    }

    #[test]
    fn test_wrong_token_gives_native() {
        assert_eq!(
            parser().parse("WRONG#https://example.com/x"),
            Some(GateDecision::NativeApp)
        );
        // Token comparison is exact.
        assert_eq!(
            parser().parse("gjdfhdfhfdjgsdagkghk#https://example.com/x"),
            Some(GateDecision::NativeApp)
        );
    }

    #[test]
    fn test_malformed_url_gives_native() {
        for remainder in ["not a url", "/relative/path", "mailto:a@example.com", "https://"] {
            let raw = format!("{TOKEN}#{remainder}");
            assert_eq!(
                parser().parse(&raw),
                Some(GateDecision::NativeApp),
                "remainder {remainder:?}"
            );
        }
    }

    #[test]
    fn test_unsplittable_is_inconclusive() {
        for raw in ["noseparatorhere", "", "#", "#https://example.com", "TOKEN#"] {
            assert_eq!(parser().parse(raw), None, "raw {raw:?}");
        }
    }

    #[test]
    fn test_remainder_keeps_fragment() {
        assert_eq!(
            parser().parse("GJDFHDFHFDJGSDAGKGHK#https://example.com/app#/home"),
            Some(GateDecision::WebSession {
                destination_url: "https://example.com/app#/home".into()
            })
        );
    }
}
