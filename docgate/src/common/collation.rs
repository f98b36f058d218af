use crate::common::DEFAULT_COLLATION_LOCALE;
use crate::errors::{ErrorKind, GatewayError, GatewayResult};
use icu_collator::options::{CaseLevel, CollatorOptions, Strength};
use icu_collator::{Collator, CollatorBorrowed, CollatorPreferences};
use icu_locale_core::Locale;
use std::fmt::{Display, Formatter};

/// Comparison strength of a [Collation], from least to most discriminating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CollationStrength {
    /// Base letters only: ignores case and accents.
    Primary,
    /// Base letters and accents.
    Secondary,
    /// Base letters, accents and case.
    Tertiary,
    Quaternary,
    Identical,
}

impl CollationStrength {
    /// Numeric ICU level (1 for primary through 5 for identical).
    pub fn level(&self) -> u8 {
        match self {
            CollationStrength::Primary => 1,
            CollationStrength::Secondary => 2,
            CollationStrength::Tertiary => 3,
            CollationStrength::Quaternary => 4,
            CollationStrength::Identical => 5,
        }
    }
}

/// String-comparison rules a store applies while matching a filter.
///
/// Delete operations use [Collation::case_insensitive], so a filter
/// `{name: "Bob"}` matches a stored `"bob"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Collation {
    locale: String,
    strength: CollationStrength,
    case_level: bool,
}

impl Collation {
    pub fn new(locale: &str, strength: CollationStrength, case_level: bool) -> Self {
        Collation {
            locale: locale.to_string(),
            strength,
            case_level,
        }
    }

    /// `en_US`, primary strength, no case level.
    pub fn case_insensitive() -> Self {
        Collation::new(DEFAULT_COLLATION_LOCALE, CollationStrength::Primary, false)
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn strength(&self) -> CollationStrength {
        self.strength
    }

    pub fn case_level(&self) -> bool {
        self.case_level
    }

    /// Builds an ICU collator honouring this collation.
    pub fn collator(&self) -> GatewayResult<CollatorBorrowed<'static>> {
        // ICU expects BCP-47 separators
        let tag = self.locale.replace('_', "-");
        let locale = tag.parse::<Locale>().map_err(|err| {
            log::error!("Invalid collation locale {}: {}", self.locale, err);
            GatewayError::new(
                &format!("invalid collation locale '{}': {}", self.locale, err),
                ErrorKind::InvalidOperation,
            )
        })?;

        let mut options = CollatorOptions::default();
        options.strength = Some(match self.strength {
            CollationStrength::Primary => Strength::Primary,
            CollationStrength::Secondary => Strength::Secondary,
            CollationStrength::Tertiary => Strength::Tertiary,
            CollationStrength::Quaternary => Strength::Quaternary,
            CollationStrength::Identical => Strength::Identical,
        });
        options.case_level = Some(if self.case_level {
            CaseLevel::On
        } else {
            CaseLevel::Off
        });

        Collator::try_new(CollatorPreferences::from(locale), options).map_err(|err| {
            GatewayError::new(
                &format!("failed to create collator for '{}': {}", self.locale, err),
                ErrorKind::BackendError,
            )
        })
    }
}

impl Default for Collation {
    fn default() -> Self {
        Collation::case_insensitive()
    }
}

impl Display for Collation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{locale: {}, strength: {}, caseLevel: {}}}",
            self.locale,
            self.strength.level(),
            self.case_level
        )
    }
}
