//! Environment-sourced pipeline settings.
//!
//! All configuration is read once at startup. The output bucket is the only
//! required setting; everything else carries a default so a bare environment
//! still resolves to a runnable pipeline.

use snafu::prelude::*;
use std::env;

use crate::error::{ConfigError, InvalidIntegerSnafu, MissingVariableSnafu};

const DEFAULT_PROVIDER_URI: &str = "https://mainnet.infura.io/";
const DEFAULT_MAX_WORKERS: usize = 5;
const DEFAULT_BATCH_SIZE: usize = 10;

/// Per-step enable flags. Unset variables default to enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepToggles {
    pub blocks_and_transactions: bool,
    pub receipts_and_logs: bool,
    pub contracts: bool,
    pub tokens: bool,
    pub token_transfers: bool,
    pub traces: bool,
}

impl StepToggles {
    /// All steps set to the same flag.
    pub fn all(enabled: bool) -> Self {
        Self {
            blocks_and_transactions: enabled,
            receipts_and_logs: enabled,
            contracts: enabled,
            tokens: enabled,
            token_transfers: enabled,
            traces: enabled,
        }
    }
}

impl Default for StepToggles {
    fn default() -> Self {
        Self::all(true)
    }
}

/// Pipeline settings resolved from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Object-store URL receiving the export partitions.
    pub output_bucket: String,
    /// Primary upstream endpoint.
    pub provider_uri: String,
    /// Archival endpoint, used by the traces step. Defaults to the primary.
    pub provider_uri_archival: String,
    /// Worker parallelism handed to extraction calls.
    pub max_workers: usize,
    /// Batch size handed to extraction calls.
    pub batch_size: usize,
    /// Include synthetic genesis traces.
    pub genesis_traces: bool,
    /// Include synthetic DAO-fork traces.
    pub daofork_traces: bool,
    /// Per-step enable flags.
    pub toggles: StepToggles,
    /// Failure notification recipients.
    pub notification_emails: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_bucket: String::new(),
            provider_uri: DEFAULT_PROVIDER_URI.to_string(),
            provider_uri_archival: DEFAULT_PROVIDER_URI.to_string(),
            max_workers: DEFAULT_MAX_WORKERS,
            batch_size: DEFAULT_BATCH_SIZE,
            genesis_traces: true,
            daofork_traces: true,
            toggles: StepToggles::default(),
            notification_emails: Vec::new(),
        }
    }
}

impl Settings {
    /// Read settings from the environment.
    ///
    /// Fails fast with [`ConfigError::MissingVariable`] when `OUTPUT_BUCKET`
    /// is absent, before any graph is built.
    pub fn from_env() -> Result<Self, ConfigError> {
        let output_bucket = required_var("OUTPUT_BUCKET")?;
        let provider_uri = var_or("WEB3_PROVIDER_URI", DEFAULT_PROVIDER_URI);
        let provider_uri_archival =
            non_empty_var("WEB3_PROVIDER_URI_ARCHIVAL").unwrap_or_else(|| provider_uri.clone());

        Ok(Self {
            output_bucket,
            provider_uri,
            provider_uri_archival,
            max_workers: usize_var("EXPORT_MAX_WORKERS", DEFAULT_MAX_WORKERS)?,
            batch_size: usize_var("EXPORT_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            genesis_traces: bool_var("EXPORT_GENESIS_TRACES_OPTION", true),
            daofork_traces: bool_var("EXPORT_DAOFORK_TRACES_OPTION", true),
            toggles: StepToggles {
                blocks_and_transactions: bool_var("EXPORT_BLOCKS_AND_TRANSACTIONS", true),
                receipts_and_logs: bool_var("EXPORT_RECEIPTS_AND_LOGS", true),
                contracts: bool_var("EXPORT_CONTRACTS", true),
                tokens: bool_var("EXPORT_TOKENS", true),
                token_transfers: bool_var("EXTRACT_TOKEN_TRANSFERS", true),
                traces: bool_var("EXPORT_TRACES", true),
            },
            notification_emails: recipient_list("NOTIFICATION_EMAILS"),
        })
    }
}

/// Read a variable, treating unset and empty identically.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

fn required_var(name: &str) -> Result<String, ConfigError> {
    non_empty_var(name).context(MissingVariableSnafu { name })
}

fn var_or(name: &str, default: &str) -> String {
    non_empty_var(name).unwrap_or_else(|| default.to_string())
}

/// Boolean variables accept `true`/`yes` in any case; anything else is false.
fn bool_var(name: &str, default: bool) -> bool {
    match non_empty_var(name) {
        Some(raw) => matches!(raw.to_lowercase().as_str(), "true" | "yes"),
        None => default,
    }
}

fn usize_var(name: &str, default: usize) -> Result<usize, ConfigError> {
    match non_empty_var(name) {
        Some(raw) => raw.parse().context(InvalidIntegerSnafu { name }),
        None => Ok(default),
    }
}

/// Parse a comma-separated recipient list, trimming whitespace.
fn recipient_list(name: &str) -> Vec<String> {
    non_empty_var(name)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|email| !email.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard};

    // Environment mutation is process-global; serialize the tests that do it.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_env_vars<F, R>(vars: &[(&str, Option<&str>)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard: MutexGuard<'_, ()> = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        // Save original values
        let originals: Vec<_> = vars.iter().map(|(k, _)| (*k, env::var(k).ok())).collect();

        // SAFETY: mutations are serialized by ENV_LOCK and restored below
        for (key, value) in vars {
            match value {
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }

        let result = f();

        // SAFETY: restoring original environment state under the same lock
        for (key, original) in originals {
            match original {
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }

        result
    }

    #[test]
    fn missing_bucket_fails_fast() {
        with_env_vars(&[("OUTPUT_BUCKET", None)], || {
            let err = Settings::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::MissingVariable { ref name } if name == "OUTPUT_BUCKET"));
        });
    }

    #[test]
    fn defaults_apply_when_unset() {
        with_env_vars(
            &[
                ("OUTPUT_BUCKET", Some("gs://exports")),
                ("WEB3_PROVIDER_URI", None),
                ("WEB3_PROVIDER_URI_ARCHIVAL", None),
                ("EXPORT_MAX_WORKERS", None),
                ("EXPORT_BATCH_SIZE", None),
                ("EXPORT_TRACES", None),
                ("NOTIFICATION_EMAILS", None),
            ],
            || {
                let settings = Settings::from_env().unwrap();
                assert_eq!(settings.output_bucket, "gs://exports");
                assert_eq!(settings.provider_uri, DEFAULT_PROVIDER_URI);
                assert_eq!(settings.provider_uri_archival, DEFAULT_PROVIDER_URI);
                assert_eq!(settings.max_workers, 5);
                assert_eq!(settings.batch_size, 10);
                assert_eq!(settings.toggles, StepToggles::all(true));
                assert!(settings.notification_emails.is_empty());
            },
        );
    }

    #[test]
    fn archival_uri_falls_back_to_primary() {
        with_env_vars(
            &[
                ("OUTPUT_BUCKET", Some("gs://exports")),
                ("WEB3_PROVIDER_URI", Some("https://node.example/")),
                ("WEB3_PROVIDER_URI_ARCHIVAL", None),
            ],
            || {
                let settings = Settings::from_env().unwrap();
                assert_eq!(settings.provider_uri_archival, "https://node.example/");
            },
        );
    }

    #[test]
    fn boolean_parsing_accepts_true_and_yes() {
        with_env_vars(
            &[
                ("OUTPUT_BUCKET", Some("gs://exports")),
                ("EXPORT_CONTRACTS", Some("YES")),
                ("EXPORT_TOKENS", Some("no")),
                ("EXPORT_TRACES", Some("false")),
            ],
            || {
                let settings = Settings::from_env().unwrap();
                assert!(settings.toggles.contracts);
                assert!(!settings.toggles.tokens);
                assert!(!settings.toggles.traces);
            },
        );
    }

    #[test]
    fn invalid_integer_is_rejected() {
        with_env_vars(
            &[
                ("OUTPUT_BUCKET", Some("gs://exports")),
                ("EXPORT_BATCH_SIZE", Some("ten")),
            ],
            || {
                let err = Settings::from_env().unwrap_err();
                assert!(matches!(err, ConfigError::InvalidInteger { ref name, .. } if name == "EXPORT_BATCH_SIZE"));
            },
        );
    }

    #[test]
    fn recipient_list_is_split_and_trimmed() {
        with_env_vars(
            &[
                ("OUTPUT_BUCKET", Some("gs://exports")),
                ("NOTIFICATION_EMAILS", Some("ops@example.com, data@example.com ,")),
            ],
            || {
                let settings = Settings::from_env().unwrap();
                assert_eq!(
                    settings.notification_emails,
                    vec!["ops@example.com", "data@example.com"]
                );
            },
        );
    }
}
