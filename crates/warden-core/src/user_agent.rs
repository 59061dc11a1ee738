//! User-agent classification.
//!
//! Pure substring matching against ordered token tables. Several agents
//! carry more than one product token (every Chromium browser also says
//! `Safari`, Edge also says `Chrome`), so the first match in table order
//! wins.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const UNKNOWN: &str = "Unknown";

const BROWSERS: &[(&str, &[&str])] = &[
    ("Firefox", &["Firefox", "FxiOS"]),
    ("Samsung Internet", &["SamsungBrowser"]),
    ("Opera", &["OPR/", "Opera"]),
    ("Internet Explorer", &["Trident", "MSIE"]),
    ("Edge", &["Edg"]),
    ("Chrome", &["Chrome", "CriOS"]),
    ("Safari", &["Safari"]),
];

// Android agents contain `Linux` and iOS agents contain `Mac OS X`.
const OPERATING_SYSTEMS: &[(&str, &[&str])] = &[
    ("Windows", &["Windows"]),
    ("Android", &["Android"]),
    ("iOS", &["iPhone", "iPad", "iPod"]),
    ("MacOS", &["Mac OS X", "Macintosh"]),
    ("Linux", &["Linux"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
    Unknown,
}

impl DeviceType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mobile => "Mobile",
            Self::Tablet => "Tablet",
            Self::Desktop => "Desktop",
            Self::Unknown => UNKNOWN,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Mobile" => Ok(Self::Mobile),
            "Tablet" => Ok(Self::Tablet),
            "Desktop" => Ok(Self::Desktop),
            UNKNOWN => Ok(Self::Unknown),
            other => Err(format!("unknown device type: {other}")),
        }
    }
}

/// Parsed user-agent fields stored on a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub browser: String,
    pub os: String,
    pub device_type: DeviceType,
}

impl ClientInfo {
    pub fn unknown() -> Self {
        Self {
            browser: UNKNOWN.into(),
            os: UNKNOWN.into(),
            device_type: DeviceType::Unknown,
        }
    }
}

fn first_match(ua: &str, table: &[(&'static str, &[&str])]) -> Option<&'static str> {
    table
        .iter()
        .find(|(_, tokens)| tokens.iter().any(|t| ua.contains(t)))
        .map(|(name, _)| *name)
}

fn device_type(ua: &str) -> Option<DeviceType> {
    let android = ua.contains("Android");
    if ua.contains("iPad") || ua.contains("Tablet") || (android && !ua.contains("Mobile")) {
        Some(DeviceType::Tablet)
    } else if ua.contains("Mobile") || android {
        Some(DeviceType::Mobile)
    } else {
        None
    }
}

/// Classify a raw `User-Agent` header.
///
/// Empty or absent input is all-`Unknown`. Input that matches no browser,
/// OS or device token is all-`Unknown` as well; anything recognisable
/// without a mobile or tablet marker is a desktop.
pub fn classify(raw: Option<&str>) -> ClientInfo {
    let ua = match raw.map(str::trim) {
        Some(ua) if !ua.is_empty() => ua,
        _ => return ClientInfo::unknown(),
    };

    let browser = first_match(ua, BROWSERS);
    let os = first_match(ua, OPERATING_SYSTEMS);
    let device = device_type(ua);

    if browser.is_none() && os.is_none() && device.is_none() {
        return ClientInfo::unknown();
    }

    ClientInfo {
        browser: browser.unwrap_or(UNKNOWN).into(),
        os: os.unwrap_or(UNKNOWN).into(),
        device_type: device.unwrap_or(DeviceType::Desktop),
    }
}
