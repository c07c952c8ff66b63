//! Spoofed browser header profiles.
//!
//! Each profile is one coherent browser identity: the user-agent plus the
//! client-hint headers that browser family actually sends. Mixing a
//! Firefox UA with Chrome's `Sec-Ch-Ua` headers is itself a bot signal.

use rand::Rng;
use reqwest::RequestBuilder;

/// Chromium client-hint headers; Firefox and Safari send none.
pub struct ClientHints {
    pub sec_ch_ua: &'static str,
    /// Must agree with the OS named in the user-agent.
    pub platform: &'static str,
}

pub struct BrowserProfile {
    pub user_agent: &'static str,
    pub client_hints: Option<ClientHints>,
}

pub static PROFILES: [BrowserProfile; 4] = [
    BrowserProfile {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
        client_hints: Some(ClientHints {
            sec_ch_ua: r#""Not A(Brand";v="99", "Google Chrome";v="121", "Chromium";v="121""#,
            platform: r#""Windows""#,
        }),
    },
    BrowserProfile {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
        client_hints: Some(ClientHints {
            sec_ch_ua: r#""Not A(Brand";v="99", "Google Chrome";v="121", "Chromium";v="121""#,
            platform: r#""macOS""#,
        }),
    },
    BrowserProfile {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0",
        client_hints: None,
    },
    BrowserProfile {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
        client_hints: None,
    },
];

pub fn random_profile<R: Rng + ?Sized>(rng: &mut R) -> &'static BrowserProfile {
    &PROFILES[rng.random_range(0..PROFILES.len())]
}

/// Attach the profile's full header set to a request.
///
/// `Accept-Encoding` is deliberately left to reqwest: setting it by hand
/// would advertise encodings the client then refuses to decompress.
pub fn apply(profile: &BrowserProfile, request: RequestBuilder) -> RequestBuilder {
    let mut request = request
        .header("User-Agent", profile.user_agent)
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
        )
        .header("Accept-Language", "en-US,en;q=0.9")
        .header("Cache-Control", "no-cache")
        .header("Pragma", "no-cache")
        .header("Sec-Fetch-Dest", "document")
        .header("Sec-Fetch-Mode", "navigate")
        .header("Sec-Fetch-Site", "none")
        .header("Sec-Fetch-User", "?1")
        .header("Upgrade-Insecure-Requests", "1");

    if let Some(hints) = &profile.client_hints {
        request = request
            .header("Sec-Ch-Ua", hints.sec_ch_ua)
            .header("Sec-Ch-Ua-Mobile", "?0")
            .header("Sec-Ch-Ua-Platform", hints.platform);
    }

    request
}
