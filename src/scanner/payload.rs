// SPDX-License-Identifier: GPL-3.0-only

//! Classification of decoded payloads
//!
//! Barcodes carry plain strings; QR codes in particular often carry a URI or
//! one of the common structured formats. The kind drives the status label and
//! the "open" action.

/// What a payload string appears to be
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadKind {
    /// http(s) link, or a bare domain promoted to https
    Url(String),
    /// `WIFI:` network credentials
    Wifi { ssid: String },
    /// `tel:` number
    Phone(String),
    /// `mailto:` address, query stripped
    Email(String),
    /// `sms:`/`smsto:` number
    Sms(String),
    /// `geo:` coordinates
    Location { latitude: f64, longitude: f64 },
    /// vCard
    Contact,
    /// iCalendar event
    Event,
    Text,
}

impl PayloadKind {
    /// Classify a payload; anything unrecognised is `Text`
    pub fn classify(payload: &str) -> Self {
        let trimmed = payload.trim();

        if let Some(rest) = trimmed.strip_prefix("WIFI:") {
            return Self::Wifi {
                ssid: wifi_ssid(rest),
            };
        }

        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Self::Url(trimmed.to_string());
        }

        if let Some(number) = trimmed.strip_prefix("tel:") {
            return Self::Phone(number.to_string());
        }

        if let Some(rest) = trimmed.strip_prefix("mailto:") {
            let address = rest.split_once('?').map_or(rest, |(address, _)| address);
            return Self::Email(address.to_string());
        }

        if let Some(rest) = trimmed
            .strip_prefix("sms:")
            .or_else(|| trimmed.strip_prefix("smsto:"))
        {
            let number = rest
                .split(['?', ':'])
                .next()
                .unwrap_or_default()
                .to_string();
            return Self::Sms(number);
        }

        if let Some(rest) = trimmed.strip_prefix("geo:")
            && let Some(location) = parse_geo(rest)
        {
            return location;
        }

        if trimmed.starts_with("BEGIN:VCARD") {
            return Self::Contact;
        }

        if trimmed.starts_with("BEGIN:VCALENDAR") || trimmed.starts_with("BEGIN:VEVENT") {
            return Self::Event;
        }

        if looks_like_domain(trimmed) {
            return Self::Url(format!("https://{}", trimmed));
        }

        Self::Text
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Url(_) => "URL",
            Self::Wifi { .. } => "Wi-Fi",
            Self::Phone(_) => "Phone",
            Self::Email(_) => "Email",
            Self::Sms(_) => "SMS",
            Self::Location { .. } => "Location",
            Self::Contact => "Contact",
            Self::Event => "Event",
            Self::Text => "Text",
        }
    }

    /// URI the desktop can hand to a default application
    pub fn open_target(&self) -> Option<String> {
        match self {
            Self::Url(url) => Some(url.clone()),
            Self::Phone(number) => Some(format!("tel:{}", number)),
            Self::Email(address) => Some(format!("mailto:{}", address)),
            Self::Sms(number) => Some(format!("sms:{}", number)),
            Self::Location {
                latitude,
                longitude,
            } => Some(format!("geo:{},{}", latitude, longitude)),
            Self::Wifi { .. } | Self::Contact | Self::Event | Self::Text => None,
        }
    }
}

fn wifi_ssid(fields: &str) -> String {
    fields
        .trim_end_matches(';')
        .split(';')
        .find_map(|field| field.strip_prefix("S:"))
        .map(|ssid| ssid.replace("\\;", ";").replace("\\:", ":").replace("\\\\", "\\"))
        .unwrap_or_default()
}

fn parse_geo(rest: &str) -> Option<PayloadKind> {
    let coords = rest.split_once('?').map_or(rest, |(coords, _)| coords);
    let mut parts = coords.split(',');
    let latitude = parts.next()?.trim().parse::<f64>().ok()?;
    let longitude = parts.next()?.trim().parse::<f64>().ok()?;
    Some(PayloadKind::Location {
        latitude,
        longitude,
    })
}

fn looks_like_domain(text: &str) -> bool {
    if text.len() >= 256 || text.contains(char::is_whitespace) || !text.contains('.') {
        return false;
    }
    text.starts_with("www.")
        || [".com", ".org", ".net", ".io"]
            .iter()
            .any(|tld| text.ends_with(tld))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_links() {
        assert_eq!(
            PayloadKind::classify("https://example.com/a?b=c"),
            PayloadKind::Url("https://example.com/a?b=c".to_string())
        );
        assert_eq!(
            PayloadKind::classify("www.example.org"),
            PayloadKind::Url("https://www.example.org".to_string())
        );
    }

    #[test]
    fn test_classify_wifi() {
        assert_eq!(
            PayloadKind::classify("WIFI:T:WPA;S:Home\\;Net;P:secret;;"),
            PayloadKind::Wifi {
                ssid: "Home;Net".to_string()
            }
        );
    }

    #[test]
    fn test_classify_uris() {
        assert_eq!(
            PayloadKind::classify("mailto:a@b.c?subject=x"),
            PayloadKind::Email("a@b.c".to_string())
        );
        assert_eq!(
            PayloadKind::classify("SMSTO:123").label(),
            "Text",
            "scheme match is case-sensitive"
        );
        assert_eq!(
            PayloadKind::classify("smsto:123:hello"),
            PayloadKind::Sms("123".to_string())
        );
        assert_eq!(
            PayloadKind::classify("geo:52.5,13.4?q=Berlin"),
            PayloadKind::Location {
                latitude: 52.5,
                longitude: 13.4
            }
        );
        assert_eq!(PayloadKind::classify("geo:north"), PayloadKind::Text);
    }

    #[test]
    fn test_barcode_digits_are_text() {
        assert_eq!(PayloadKind::classify("4006381333931"), PayloadKind::Text);
        assert_eq!(PayloadKind::classify("ABC123"), PayloadKind::Text);
        assert_eq!(PayloadKind::classify("3.14"), PayloadKind::Text);
    }

    #[test]
    fn test_open_targets() {
        assert_eq!(
            PayloadKind::classify("tel:+15551234").open_target().as_deref(),
            Some("tel:+15551234")
        );
        assert_eq!(PayloadKind::classify("BEGIN:VCARD\nEND:VCARD").open_target(), None);
        assert_eq!(PayloadKind::Text.open_target(), None);
    }
}
