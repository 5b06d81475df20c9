//! Intent routing: pick a handling mode, and within multi-agent mode a sub-handler.
//!
//! Classification is a first-match scan over ordered rule tables. Each rule pairs a cue
//! (keyword containment over the lower-cased message, optionally combined with whether
//! an image is attached) with the target it selects. The last rule of each table always
//! matches.

use std::fmt;
use std::str::FromStr;

/// Handling mode requested by the caller or chosen by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Auto,
    MedicalChat,
    Prescription,
    MultiAgent,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Auto => "auto",
            Mode::MedicalChat => "medical-chat",
            Mode::Prescription => "prescription",
            Mode::MultiAgent => "multi-agent",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mode: {0}")]
pub struct UnknownMode(pub String);

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "auto" => Ok(Mode::Auto),
            "medical-chat" => Ok(Mode::MedicalChat),
            "prescription" => Ok(Mode::Prescription),
            "multi-agent" => Ok(Mode::MultiAgent),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

/// Strategy used inside multi-agent mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubHandler {
    ImageAnalysis,
    WebSearch,
    KnowledgeLookup,
}

/// What a rule looks at.
#[derive(Debug, Clone, Copy)]
enum Cue {
    /// Message contains any keyword.
    Keywords(&'static [&'static str]),
    /// Message contains any keyword and an image is attached.
    KeywordsWithImage(&'static [&'static str]),
    /// An image is attached or the message contains any keyword.
    ImageOrKeywords(&'static [&'static str]),
    Always,
}

impl Cue {
    fn matches(self, message_lower: &str, has_image: bool) -> bool {
        let any = |words: &[&str]| words.iter().any(|w| message_lower.contains(w));
        match self {
            Cue::Keywords(words) => any(words),
            Cue::KeywordsWithImage(words) => has_image && any(words),
            Cue::ImageOrKeywords(words) => has_image || any(words),
            Cue::Always => true,
        }
    }
}

struct Rule<T> {
    cue: Cue,
    target: T,
}

const PRESCRIPTION_KEYWORDS: &[&str] = &["prescription", "medication list", "parse prescription"];
const ADVANCED_KEYWORDS: &[&str] = &["research", "latest", "study", "analyze image", "x-ray", "scan"];
const IMAGING_KEYWORDS: &[&str] = &[
    "analyze image",
    "x-ray",
    "scan",
    "mri",
    "ct scan",
    "tumor",
    "lesion",
];
const RECENCY_KEYWORDS: &[&str] = &[
    "latest", "recent", "news", "research", "study", "2024", "2025", "current",
];

const MODE_RULES: &[Rule<Mode>] = &[
    Rule {
        cue: Cue::KeywordsWithImage(PRESCRIPTION_KEYWORDS),
        target: Mode::Prescription,
    },
    Rule {
        cue: Cue::Keywords(ADVANCED_KEYWORDS),
        target: Mode::MultiAgent,
    },
    Rule {
        cue: Cue::Always,
        target: Mode::MedicalChat,
    },
];

const SUB_HANDLER_RULES: &[Rule<SubHandler>] = &[
    Rule {
        cue: Cue::ImageOrKeywords(IMAGING_KEYWORDS),
        target: SubHandler::ImageAnalysis,
    },
    Rule {
        cue: Cue::Keywords(RECENCY_KEYWORDS),
        target: SubHandler::WebSearch,
    },
    Rule {
        cue: Cue::Always,
        target: SubHandler::KnowledgeLookup,
    },
];

fn first_match<T: Copy>(rules: &[Rule<T>], fallback: T, message: &str, has_image: bool) -> T {
    let lower = message.to_lowercase();
    rules
        .iter()
        .find(|r| r.cue.matches(&lower, has_image))
        .map(|r| r.target)
        .unwrap_or(fallback)
}

/// Keyword classification for auto mode. Never returns `Mode::Auto`.
pub fn classify(message: &str, has_image: bool) -> Mode {
    first_match(MODE_RULES, Mode::MedicalChat, message, has_image)
}

/// An explicit mode is used as-is; `Auto` is resolved by `classify`.
pub fn resolve_mode(requested: Mode, message: &str, has_image: bool) -> Mode {
    match requested {
        Mode::Auto => classify(message, has_image),
        explicit => explicit,
    }
}

/// Sub-handler selection inside multi-agent mode.
pub fn classify_sub_handler(message: &str, has_image: bool) -> SubHandler {
    first_match(
        SUB_HANDLER_RULES,
        SubHandler::KnowledgeLookup,
        message,
        has_image,
    )
}
