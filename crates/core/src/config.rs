//! Environment-driven configuration helpers shared by all crates.
//!
//! Values come from process variables, optionally hydrated from a `.env` file.
//! Every value is trimmed and an empty value is treated as absent, so a blank
//! `WATT_REGION_ID=` behaves exactly like an unset one.

use std::{env, str::FromStr};

use thiserror::Error;

/// Set this variable to skip `.env` hydration (tests, containers).
pub const SKIP_DOTENV_VAR: &str = "WATT_SKIP_DOTENV";

pub fn get_required_var(key: &'static str) -> Result<String, ConfigError> {
    get_optional_var(key).ok_or(ConfigError::MissingVar { key })
}

pub fn get_optional_var(key: &'static str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Reads an optional unsigned integer, rejecting malformed values instead of
/// silently falling back to a default.
pub fn get_optional_u64(key: &'static str) -> Result<Option<u64>, ConfigError> {
    get_optional_var(key)
        .map(|value| {
            value
                .parse()
                .map_err(|source| ConfigError::InvalidNumber { key, source })
        })
        .transpose()
}

/// Accepts `1/0`, `true/false`, `yes/no`, `on/off` in any case.
pub fn get_optional_bool(key: &'static str) -> Result<Option<bool>, ConfigError> {
    let Some(value) = get_optional_var(key) else {
        return Ok(None);
    };
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidValue { key, value }),
    }
}

/// Parses an optional value through its `FromStr` implementation.
pub fn get_optional_parsed<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    get_optional_var(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key, value })
        })
        .transpose()
}

pub fn hydrate_env_file() -> Result<(), ConfigError> {
    if env::var_os(SKIP_DOTENV_VAR).is_some() {
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(ConfigError::Dotenv { source: err }),
    }

    Ok(())
}

/// Errors emitted when `.env` hydration or environment parsing fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable `{key}`")]
    MissingVar { key: &'static str },
    #[error("`{key}` is set but `{companion}` is missing")]
    MissingCompanion {
        key: &'static str,
        companion: &'static str,
    },
    #[error("invalid integer in `{key}`: {source}")]
    InvalidNumber {
        key: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("invalid value `{value}` in `{key}`")]
    InvalidValue { key: &'static str, value: String },
    #[error("failed to load .env file: {source}")]
    Dotenv {
        #[from]
        source: dotenvy::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_GUARD: Mutex<()> = Mutex::new(());

    const KEY: &str = "WATT_CORE_CONFIG_TEST";

    #[test]
    fn required_env_vars_are_trimmed() {
        let _guard = ENV_GUARD.lock().unwrap();
        std::env::set_var(KEY, "  cn-hangzhou  ");

        assert_eq!(get_required_var(KEY).unwrap(), "cn-hangzhou");

        std::env::remove_var(KEY);
    }

    #[test]
    fn empty_required_env_var_is_treated_as_missing() {
        let _guard = ENV_GUARD.lock().unwrap();
        std::env::set_var(KEY, "   ");

        let err = get_required_var(KEY).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingVar {
                key: "WATT_CORE_CONFIG_TEST"
            }
        ));
        assert_eq!(get_optional_var(KEY), None);

        std::env::remove_var(KEY);
    }

    #[test]
    fn integers_are_parsed_or_rejected() {
        let _guard = ENV_GUARD.lock().unwrap();
        std::env::remove_var(KEY);
        assert_eq!(get_optional_u64(KEY).unwrap(), None);

        std::env::set_var(KEY, "2500");
        assert_eq!(get_optional_u64(KEY).unwrap(), Some(2500));

        std::env::set_var(KEY, "soon");
        assert!(matches!(
            get_optional_u64(KEY),
            Err(ConfigError::InvalidNumber { .. })
        ));

        std::env::remove_var(KEY);
    }

    #[test]
    fn booleans_accept_common_spellings() {
        let _guard = ENV_GUARD.lock().unwrap();
        for (raw, expected) in [("1", true), ("TRUE", true), ("off", false), ("No", false)] {
            std::env::set_var(KEY, raw);
            assert_eq!(get_optional_bool(KEY).unwrap(), Some(expected), "{raw}");
        }

        std::env::set_var(KEY, "maybe");
        let err = get_optional_bool(KEY).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { value, .. } if value == "maybe"));

        std::env::remove_var(KEY);
    }

    #[test]
    fn hydration_is_skipped_when_requested() {
        let _guard = ENV_GUARD.lock().unwrap();
        std::env::set_var(SKIP_DOTENV_VAR, "1");
        assert!(hydrate_env_file().is_ok());
    }
}
