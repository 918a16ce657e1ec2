//! Share-URL rendering for minted capability tokens.
//!
//! Link shape: `{base}/s/{subject}/{token}/album/{entitlement}/`, with each
//! variable part percent-encoded as a single path segment. Tokens use the
//! standard base64 alphabet, so the `/`, `+` and `=` they may contain must
//! not leak into path structure. A global token (empty entitlement) renders
//! as `{base}/s/{subject}/{token}/album/` with no entitlement segment.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::token::{TokenData, TokenGenerator};

/// A capability link ready to hand to a recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    /// Public base URL of the gated site, without trailing slash.
    pub base_url: String,
    /// Identity the token was minted for.
    pub subject: String,
    /// The capability token itself.
    pub token: String,
    /// Resource scope; empty for a global link.
    pub entitlement: String,
}

impl ShareLink {
    /// Mint a token for `(subject, entitlement)` at `now` and wrap it in a link.
    pub fn mint(
        generator: &TokenGenerator,
        base_url: &str,
        subject: &str,
        entitlement: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let token = generator.generate(&TokenData {
            timestamp: now,
            subject: subject.to_string(),
            entitlement: entitlement.to_string(),
        });
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            subject: subject.to_string(),
            token,
            entitlement: entitlement.to_string(),
        }
    }

    /// Render the link as a URL.
    pub fn to_url(&self) -> String {
        let subject = urlencoding::encode(&self.subject);
        let token = urlencoding::encode(&self.token);
        if self.entitlement.is_empty() {
            format!("{}/s/{}/{}/album/", self.base_url, subject, token)
        } else {
            format!(
                "{}/s/{}/{}/album/{}/",
                self.base_url,
                subject,
                token,
                urlencoding::encode(&self.entitlement)
            )
        }
    }
}

impl fmt::Display for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn generator() -> TokenGenerator {
        TokenGenerator::new(b"0123456789abcdef0123456789abcdef")
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1588703522, 0).unwrap()
    }

    #[test]
    fn scoped_link_has_entitlement_segment() {
        let link = ShareLink::mint(&generator(), "https://photos.example.net", "nmasse", "2020-05", now());
        let url = link.to_url();
        assert!(url.starts_with("https://photos.example.net/s/nmasse/"));
        assert!(url.ends_with("/album/2020-05/"));
    }

    #[test]
    fn global_link_ends_at_album() {
        let link = ShareLink::mint(&generator(), "https://photos.example.net", "nmasse", "", now());
        assert!(link.to_url().ends_with("/album/"));
        assert!(!link.to_url().contains("//album"));
    }

    #[test]
    fn token_segment_is_percent_encoded() {
        let link = ShareLink {
            base_url: "https://photos.example.net".to_string(),
            subject: "nmasse".to_string(),
            token: "Ab/C+d=".to_string(),
            entitlement: "2020-05".to_string(),
        };
        assert_eq!(
            link.to_url(),
            "https://photos.example.net/s/nmasse/Ab%2FC%2Bd%3D/album/2020-05/"
        );
    }

    #[test]
    fn trailing_slash_on_base_is_dropped() {
        let link = ShareLink::mint(&generator(), "https://photos.example.net/", "nmasse", "x", now());
        assert!(link.to_url().starts_with("https://photos.example.net/s/"));
    }

    #[test]
    fn display_matches_to_url() {
        let link = ShareLink::mint(&generator(), "https://photos.example.net", "nmasse", "x", now());
        assert_eq!(link.to_string(), link.to_url());
    }

    #[test]
    fn minted_token_round_trips_through_the_generator() {
        let generator = generator();
        let link = ShareLink::mint(&generator, "https://photos.example.net", "nmasse", "2020-05", now());
        let data = TokenData {
            timestamp: now(),
            subject: "nmasse".to_string(),
            entitlement: "2020-05".to_string(),
        };
        assert!(generator.validate(&data, &link.token, 1).unwrap());
    }
}
