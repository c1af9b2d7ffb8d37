//! Request locales and locale-specific resource names.
//!
//! # Responsibilities
//! - Model a `language_COUNTRY_VARIANT` locale
//! - Pick the preferred locale from an `Accept-Language` header
//! - Expand a resource URL into its localized candidates
//!
//! # Design Decisions
//! - Candidate order is `_l_c_v`, `_l_c`, `_l`, then the unsuffixed URL
//! - The last `.` is the extension separator, unless a `/` follows it
//! - Candidates needing an empty locale component are skipped

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Error returned when a locale tag cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid locale tag: {0:?}")]
pub struct InvalidLocale(pub String);

/// A language, country and variant triple. Empty components are absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct Locale {
    language: String,
    country: String,
    variant: String,
}

impl Locale {
    pub fn new(language: &str, country: &str, variant: &str) -> Self {
        Self {
            language: language.to_ascii_lowercase(),
            country: country.to_ascii_uppercase(),
            variant: variant.to_string(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn variant(&self) -> &str {
        &self.variant
    }

    /// Preferred locale of an `Accept-Language` value.
    ///
    /// The highest `q` wins, ties keep header order. `*` and `q=0` ranges are
    /// skipped, as are unparseable ones.
    pub fn from_accept_language(header: &str) -> Option<Self> {
        let mut best: Option<(u16, Locale)> = None;
        for range in header.split(',') {
            let mut params = range.split(';');
            let tag = params.next().unwrap_or("").trim();
            if tag.is_empty() || tag == "*" {
                continue;
            }
            let quality = params
                .find_map(|p| p.trim().strip_prefix("q="))
                .map_or(Some(1000), parse_quality);
            let Some(quality) = quality.filter(|q| *q > 0) else {
                continue;
            };
            let Ok(locale) = tag.parse::<Locale>() else {
                continue;
            };
            if best.as_ref().is_none_or(|(q, _)| quality > *q) {
                best = Some((quality, locale));
            }
        }
        best.map(|(_, locale)| locale)
    }
}

/// `q` value scaled to thousandths.
fn parse_quality(value: &str) -> Option<u16> {
    let q: f32 = value.trim().parse().ok()?;
    if !(0.0..=1.0).contains(&q) {
        return None;
    }
    Some((q * 1000.0).round() as u16)
}

impl FromStr for Locale {
    type Err = InvalidLocale;

    /// Accepts `ll`, `ll-CC`, `ll_CC_variant` and mixes of `-`/`_`.
    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let mut parts = tag.trim().splitn(3, ['-', '_']);
        let language = parts.next().unwrap_or("");
        let country = parts.next().unwrap_or("");
        let variant = parts.next().unwrap_or("");

        let valid_language = (2..=8).contains(&language.len())
            && language.chars().all(|c| c.is_ascii_alphabetic());
        let valid_rest = [country, variant]
            .iter()
            .all(|p| p.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
        if !valid_language || !valid_rest {
            return Err(InvalidLocale(tag.to_string()));
        }
        Ok(Self::new(language, country, variant))
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.language)?;
        if !self.country.is_empty() || !self.variant.is_empty() {
            write!(f, "_{}", self.country)?;
        }
        if !self.variant.is_empty() {
            write!(f, "_{}", self.variant)?;
        }
        Ok(())
    }
}

/// Localized candidates for `url`, most specific first, `url` itself last.
pub fn localized_candidates(url: &str, locale: &Locale) -> Vec<String> {
    let Some(idx) = url.rfind('.') else {
        // no file extension, so no locale switch available
        return vec![url.to_string()];
    };
    let (base, ext) = url.split_at(idx);
    if ext.contains('/') {
        // the '.' belongs to a directory name
        return vec![url.to_string()];
    }

    let (l, c, v) = (locale.language(), locale.country(), locale.variant());
    let mut candidates = Vec::with_capacity(4);
    if !l.is_empty() && !c.is_empty() && !v.is_empty() {
        candidates.push(format!("{base}_{l}_{c}_{v}{ext}"));
    }
    if !l.is_empty() && !c.is_empty() {
        candidates.push(format!("{base}_{l}_{c}{ext}"));
    }
    if !l.is_empty() {
        candidates.push(format!("{base}_{l}{ext}"));
    }
    candidates.push(url.to_string());
    candidates
}
