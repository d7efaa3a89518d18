//! Identity attributes used to key the registry and detect duplicates.
//!
//! RULE: Full identifiers never appear in logs or flag details.
//! Anything human-facing goes through `mask()`.

use crate::applicant::ApplicantProfile;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentifierKind {
    Pan,
    Aadhaar,
    Phone,
    Email,
}

impl IdentifierKind {
    /// Registry lookup priority. Earlier kinds win.
    pub const PRIORITY: [IdentifierKind; 4] = [Self::Pan, Self::Aadhaar, Self::Phone, Self::Email];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pan => "PAN",
            Self::Aadhaar => "Aadhaar",
            Self::Phone => "phone",
            Self::Email => "email",
        }
    }

    /// Canonical form used for comparison and lookup. Blank input yields None.
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let value = match self {
            Self::Pan => raw.trim().to_ascii_uppercase(),
            Self::Aadhaar => digits_only(raw),
            Self::Phone => {
                let digits = digits_only(raw);
                // Drop a country prefix such as +91.
                if digits.len() > 10 {
                    digits[digits.len() - 10..].to_string()
                } else {
                    digits
                }
            }
            Self::Email => raw.trim().to_lowercase(),
        };
        if value.is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Up to four identity attributes, normalized on construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifiers {
    pub pan: Option<String>,
    pub aadhaar: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl Identifiers {
    pub fn new(
        pan: Option<&str>,
        aadhaar: Option<&str>,
        phone: Option<&str>,
        email: Option<&str>,
    ) -> Self {
        Self {
            pan: pan.and_then(|v| IdentifierKind::Pan.normalize(v)),
            aadhaar: aadhaar.and_then(|v| IdentifierKind::Aadhaar.normalize(v)),
            phone: phone.and_then(|v| IdentifierKind::Phone.normalize(v)),
            email: email.and_then(|v| IdentifierKind::Email.normalize(v)),
        }
    }

    pub fn from_profile(profile: &ApplicantProfile) -> Self {
        Self::new(
            profile.pan_number.as_deref(),
            profile.aadhaar_number.as_deref(),
            profile.phone.as_deref(),
            profile.email.as_deref(),
        )
    }

    pub fn get(&self, kind: IdentifierKind) -> Option<&str> {
        match kind {
            IdentifierKind::Pan => self.pan.as_deref(),
            IdentifierKind::Aadhaar => self.aadhaar.as_deref(),
            IdentifierKind::Phone => self.phone.as_deref(),
            IdentifierKind::Email => self.email.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        IdentifierKind::PRIORITY.iter().all(|k| self.get(*k).is_none())
    }

    /// Masked summary for log lines, e.g. `PAN=****234F phone=****3210`.
    pub fn masked(&self) -> String {
        let parts: Vec<String> = IdentifierKind::PRIORITY
            .iter()
            .filter_map(|k| self.get(*k).map(|v| format!("{}={}", k.label(), mask(v))))
            .collect();
        if parts.is_empty() {
            "<none>".to_string()
        } else {
            parts.join(" ")
        }
    }
}

/// `****` followed by the last four characters.
pub fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

// ── Format checks ────────────────────────────────────────────────────────────

static PAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{5}[0-9]{4}[A-Z]$").expect("invalid PAN pattern"));

static AADHAAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{12}$").expect("invalid Aadhaar pattern"));

static IFSC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{4}0[A-Z0-9]{6}$").expect("invalid IFSC pattern"));

/// Five letters, four digits, one letter.
pub fn is_valid_pan(pan: &str) -> bool {
    PAN_RE.is_match(pan)
}

/// Twelve digits with a valid Verhoeff check digit.
pub fn is_valid_aadhaar(aadhaar: &str) -> bool {
    AADHAAR_RE.is_match(aadhaar) && verhoeff_is_valid(aadhaar)
}

pub fn is_valid_ifsc(ifsc: &str) -> bool {
    IFSC_RE.is_match(ifsc)
}

// ── Verhoeff checksum ────────────────────────────────────────────────────────

const VERHOEFF_D: [[u8; 10]; 10] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
    [1, 2, 3, 4, 0, 6, 7, 8, 9, 5],
    [2, 3, 4, 0, 1, 7, 8, 9, 5, 6],
    [3, 4, 0, 1, 2, 8, 9, 5, 6, 7],
    [4, 0, 1, 2, 3, 9, 5, 6, 7, 8],
    [5, 9, 8, 7, 6, 0, 4, 3, 2, 1],
    [6, 5, 9, 8, 7, 1, 0, 4, 3, 2],
    [7, 6, 5, 9, 8, 2, 1, 0, 4, 3],
    [8, 7, 6, 5, 9, 3, 2, 1, 0, 4],
    [9, 8, 7, 6, 5, 4, 3, 2, 1, 0],
];

const VERHOEFF_P: [[u8; 10]; 8] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
    [1, 5, 7, 6, 2, 8, 3, 0, 9, 4],
    [5, 8, 0, 3, 7, 9, 6, 1, 4, 2],
    [8, 9, 1, 6, 0, 4, 3, 5, 2, 7],
    [9, 4, 5, 3, 1, 2, 8, 7, 6, 0],
    [4, 2, 8, 6, 5, 7, 3, 9, 0, 1],
    [2, 7, 9, 3, 8, 0, 6, 4, 1, 5],
    [7, 0, 4, 6, 9, 1, 3, 2, 5, 8],
];

const VERHOEFF_INV: [u8; 10] = [0, 4, 3, 2, 1, 5, 6, 7, 8, 9];

fn verhoeff_fold(digits: &str, offset: usize) -> u8 {
    digits
        .bytes()
        .rev()
        .enumerate()
        .fold(0u8, |c, (i, b)| {
            let digit = (b - b'0') as usize;
            VERHOEFF_D[c as usize][VERHOEFF_P[(i + offset) % 8][digit] as usize]
        })
}

/// Validate a digit string whose last digit is a Verhoeff check digit.
/// Non-digit input is rejected.
pub fn verhoeff_is_valid(digits: &str) -> bool {
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) && verhoeff_fold(digits, 0) == 0
}

/// Check digit to append to `digits`. Returns None for non-digit input.
pub fn verhoeff_check_digit(digits: &str) -> Option<char> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let c = verhoeff_fold(digits, 1);
    char::from_digit(VERHOEFF_INV[c as usize] as u32, 10)
}

/// Complete an 11-digit prefix into a checksummed Aadhaar number.
pub fn aadhaar_with_check_digit(prefix: &str) -> Option<String> {
    if prefix.len() != 11 {
        return None;
    }
    verhoeff_check_digit(prefix).map(|d| format!("{prefix}{d}"))
}
