use std::collections::BTreeSet;

use tracklog_core::{AppError, AppResult};

/// Environment variable enabling diff computation on updates.
pub const COMPUTE_DIFF_ENV: &str = "TRACKLOG_COMPUTE_DIFF";

/// Environment variable enabling lazy-update suppression.
pub const LAZY_UPDATE_ENV: &str = "TRACKLOG_LAZY_UPDATE";

/// Environment variable listing watched fields, comma-separated.
pub const LAZY_UPDATE_FIELDS_ENV: &str = "TRACKLOG_LAZY_UPDATE_FIELDS";

/// Change tracking options chosen by the embedding application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditOptions {
    compute_diff: bool,
    lazy_update: bool,
    lazy_update_fields: Vec<String>,
}

impl AuditOptions {
    /// Enables computing and storing field diffs on updates.
    #[must_use]
    pub fn with_compute_diff(mut self) -> Self {
        self.compute_diff = true;
        self
    }

    /// Enables update suppression against the watched fields.
    ///
    /// An empty field set watches every loggable field.
    #[must_use]
    pub fn with_lazy_update<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lazy_update = true;
        self.lazy_update_fields = normalize_fields(fields.into_iter().map(Into::<String>::into));
        self
    }

    /// Returns whether updates embed a field diff.
    #[must_use]
    pub fn compute_diff(&self) -> bool {
        self.compute_diff
    }

    /// Returns whether no-op updates are suppressed.
    #[must_use]
    pub fn lazy_update(&self) -> bool {
        self.lazy_update
    }

    /// Returns the watched fields, empty meaning all loggable fields.
    #[must_use]
    pub fn lazy_update_fields(&self) -> &[String] {
        self.lazy_update_fields.as_slice()
    }

    /// Loads options from process environment variables.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads options from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let compute_diff = parse_flag(COMPUTE_DIFF_ENV, lookup(COMPUTE_DIFF_ENV))?;
        let lazy_update = parse_flag(LAZY_UPDATE_ENV, lookup(LAZY_UPDATE_ENV))?;
        let lazy_update_fields = lookup(LAZY_UPDATE_FIELDS_ENV)
            .map(|value| {
                normalize_fields(value.split(',').map(|field| field.trim().to_owned()))
            })
            .unwrap_or_default();

        Ok(Self {
            compute_diff,
            lazy_update,
            lazy_update_fields,
        })
    }
}

fn parse_flag(name: &str, value: Option<String>) -> AppResult<bool> {
    let Some(value) = value else {
        return Ok(false);
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "0" => Ok(false),
        "true" | "1" => Ok(true),
        other => Err(AppError::Validation(format!(
            "{name} must be 'true' or 'false', got '{other}'"
        ))),
    }
}

fn normalize_fields(fields: impl Iterator<Item = String>) -> Vec<String> {
    fields
        .filter(|field| !field.trim().is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{AuditOptions, COMPUTE_DIFF_ENV, LAZY_UPDATE_ENV, LAZY_UPDATE_FIELDS_ENV};

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| ((*name).to_owned(), (*value).to_owned()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn defaults_disable_everything() {
        let options = AuditOptions::from_lookup(lookup(&[]));
        assert_eq!(options.unwrap_or_default(), AuditOptions::default());
    }

    #[test]
    fn reads_flags_and_watched_fields() {
        let options = AuditOptions::from_lookup(lookup(&[
            (COMPUTE_DIFF_ENV, "TRUE"),
            (LAZY_UPDATE_ENV, "true"),
            (LAZY_UPDATE_FIELDS_ENV, "Name, Email,,Name"),
        ]))
        .unwrap_or_default();

        assert!(options.compute_diff());
        assert!(options.lazy_update());
        assert_eq!(
            options.lazy_update_fields(),
            &["Email".to_owned(), "Name".to_owned()]
        );
    }

    #[test]
    fn invalid_flag_is_rejected() {
        let options = AuditOptions::from_lookup(lookup(&[(LAZY_UPDATE_ENV, "sometimes")]));
        assert!(options.is_err());
    }

    #[test]
    fn builder_matches_env_configuration() {
        let built = AuditOptions::default()
            .with_compute_diff()
            .with_lazy_update(["Name"]);

        assert!(built.compute_diff());
        assert!(built.lazy_update());
        assert_eq!(built.lazy_update_fields(), &["Name".to_owned()]);
    }
}
