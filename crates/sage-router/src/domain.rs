use serde::{Deserialize, Serialize};

/// The target domain a turn routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Payment,
    Medical,
    Planning,
    Chat,
}

impl Domain {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "payment" => Some(Self::Payment),
            "medical" => Some(Self::Medical),
            "planning" => Some(Self::Planning),
            "chat" => Some(Self::Chat),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Medical => "medical",
            Self::Planning => "planning",
            Self::Chat => "chat",
        }
    }
}

/// The two languages the router distinguishes; anything else collapses to
/// English for response generation purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Ko,
    En,
}

impl Lang {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ko" | "kor" | "korean" => Some(Self::Ko),
            "en" | "eng" | "english" => Some(Self::En),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ko => "ko",
            Self::En => "en",
        }
    }

    /// Heuristic guess from the text itself: any Hangul syllable block
    /// present means Korean.
    pub fn detect(text: &str) -> Self {
        if text.chars().any(|c| ('\u{AC00}'..='\u{D7A3}').contains(&c)) {
            Self::Ko
        } else {
            Self::En
        }
    }
}

/// The outcome of a routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteResult {
    pub domain: Domain,
    pub lang: Lang,
}
