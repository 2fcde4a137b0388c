//! Configuration access port trait.
//!
//! Implementors only supply raw string lookup. The typed getters parse on
//! top of it and reject values that do not parse instead of falling back to
//! the default, so a typo never silently becomes a default setting.

use crate::domain::error::SpytraderError;
use chrono::NaiveDate;
use std::str::FromStr;

fn parse_or<T: FromStr>(
    raw: Option<String>,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, SpytraderError> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| {
            SpytraderError::invalid(section, key, format!("cannot parse '{}'", raw.trim()))
        }),
        _ => Ok(default),
    }
}

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Keys present in `section`, sorted; empty when the section is absent.
    fn keys(&self, section: &str) -> Vec<String>;

    fn get_double(&self, section: &str, key: &str, default: f64) -> Result<f64, SpytraderError> {
        parse_or(self.get_string(section, key), section, key, default)
    }

    fn get_usize(&self, section: &str, key: &str, default: usize) -> Result<usize, SpytraderError> {
        parse_or(self.get_string(section, key), section, key, default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> Result<bool, SpytraderError> {
        let Some(raw) = self.get_string(section, key) else {
            return Ok(default);
        };
        match raw.trim().to_lowercase().as_str() {
            "" => Ok(default),
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            other => Err(SpytraderError::invalid(
                section,
                key,
                format!("expected a boolean, got '{}'", other),
            )),
        }
    }

    /// Optional `YYYY-MM-DD` date.
    fn get_date(&self, section: &str, key: &str) -> Result<Option<NaiveDate>, SpytraderError> {
        match self.get_string(section, key) {
            Some(raw) if !raw.trim().is_empty() => {
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                    .map(Some)
                    .map_err(|_| {
                        SpytraderError::invalid(
                            section,
                            key,
                            "invalid date format (expected YYYY-MM-DD)",
                        )
                    })
            }
            _ => Ok(None),
        }
    }
}
