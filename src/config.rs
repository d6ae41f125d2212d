//! Ingestion configuration

use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::credentials::SecretCipher;
use crate::types::*;

/// Default upload limit, 10 MiB
pub const DEFAULT_MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;

/// Default tracing filter directive
pub const DEFAULT_LOG_FILTER: &str = "statement_import=info";

/// A password that applies to documents whose filename matches a glob.
///
/// The glob is compiled once, when the rule is built or deserialized.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "FilenameRuleEntry")]
pub struct FilenameRule {
    name_rule: String,
    bank: String,
    password: SecretValue,
    pattern: Regex,
}

#[derive(Deserialize)]
struct FilenameRuleEntry {
    /// Glob over the bare filename, `*` and `?` are wildcards
    name_rule: String,
    #[serde(default)]
    bank: String,
    password: SecretValue,
}

impl TryFrom<FilenameRuleEntry> for FilenameRule {
    type Error = ImportError;

    fn try_from(entry: FilenameRuleEntry) -> ImportResult<Self> {
        let pattern = glob_pattern(&entry.name_rule)?;
        Ok(Self {
            name_rule: entry.name_rule,
            bank: entry.bank,
            password: entry.password,
            pattern,
        })
    }
}

/// Anchored regex equivalent of a filename glob
fn glob_pattern(name_rule: &str) -> ImportResult<Regex> {
    let escaped = regex::escape(name_rule)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");
    Regex::new(&format!("^{}$", escaped)).map_err(|e| {
        ImportError::Validation(format!("invalid filename rule '{}': {}", name_rule, e))
    })
}

impl FilenameRule {
    pub fn new(
        name_rule: impl Into<String>,
        bank: impl Into<String>,
        password: impl Into<String>,
    ) -> ImportResult<Self> {
        Self::try_from(FilenameRuleEntry {
            name_rule: name_rule.into(),
            bank: bank.into(),
            password: SecretValue::new(password),
        })
    }

    pub fn name_rule(&self) -> &str {
        &self.name_rule
    }

    /// Bank the rule was written for
    pub fn bank(&self) -> &str {
        &self.bank
    }

    pub fn matches(&self, filename: &str) -> bool {
        self.pattern.is_match(filename)
    }
}

/// Settings for the ingestion pipeline
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Largest accepted document, in bytes
    pub max_document_bytes: u64,
    /// MIME types accepted at intake
    pub accepted_mime_types: Vec<String>,
    /// Extra passwords keyed by filename, tried after the user's credentials
    pub filename_rules: Vec<FilenameRule>,
    /// `EnvFilter` directive used by [`crate::utils::init_tracing`]
    pub log_filter: String,
    /// Passphrase the credential encryption key is derived from
    pub credential_key: SecretValue,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            accepted_mime_types: vec!["application/pdf".to_string()],
            filename_rules: Vec::new(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            credential_key: SecretValue::default(),
        }
    }
}

impl IngestionConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> ImportResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ImportError::Validation(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file, falling back to defaults when it does not exist
    pub fn from_json_file(path: impl AsRef<Path>) -> ImportResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::default());
        }

        let data = fs::read_to_string(path).map_err(|e| {
            ImportError::Validation(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&data)
    }

    pub fn validate(&self) -> ImportResult<()> {
        if self.max_document_bytes == 0 {
            return Err(ImportError::Validation(
                "max_document_bytes must be greater than zero".to_string(),
            ));
        }

        if self.accepted_mime_types.is_empty() {
            return Err(ImportError::Validation(
                "at least one accepted MIME type is required".to_string(),
            ));
        }

        Ok(())
    }

    /// Install the global tracing subscriber using `log_filter`
    pub fn init_tracing(&self) {
        crate::utils::init_tracing(&self.log_filter);
    }

    /// Cipher for stored credentials.
    ///
    /// Without a `credential_key` the key is random and stored credentials
    /// become unreadable once the process exits.
    pub fn secret_cipher(&self) -> SecretCipher {
        if self.credential_key.is_empty() {
            tracing::warn!("no credential_key configured, using an ephemeral key");
            return SecretCipher::ephemeral();
        }
        SecretCipher::from_passphrase(self.credential_key.expose())
    }

    /// Passwords from every rule matching the filename, in rule order
    pub fn passwords_for_file(&self, filename: &str) -> Vec<OrderedSecret> {
        self.filename_rules
            .iter()
            .filter(|rule| rule.matches(filename))
            .map(|rule| OrderedSecret::new(SecretSource::FilenameRule, rule.password.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_glob_rules() {
        let rule = FilenameRule::new("Cathay_*.pdf", "cathay", "A123").unwrap();
        assert!(rule.matches("Cathay_202401.pdf"));
        assert!(!rule.matches("xCathay_202401.pdf"));
        assert!(!rule.matches("Cathay_202401.pdf.bak"));

        let rule = FilenameRule::new("stmt-??.pdf", "fubon", "B456").unwrap();
        assert!(rule.matches("stmt-01.pdf"));
        assert!(!rule.matches("stmt-001.pdf"));

        // Regex metacharacters are literal
        let rule = FilenameRule::new("a+b(1).pdf", "taishin", "C789").unwrap();
        assert!(rule.matches("a+b(1).pdf"));
        assert!(!rule.matches("aab1.pdf"));
    }

    #[test]
    fn test_passwords_for_file_keeps_rule_order() {
        let config = IngestionConfig {
            filename_rules: vec![
                FilenameRule::new("*.pdf", "any", "first").unwrap(),
                FilenameRule::new("none_*", "other", "skipped").unwrap(),
                FilenameRule::new("card_*", "card", "second").unwrap(),
            ],
            ..IngestionConfig::default()
        };

        let passwords: Vec<String> = config
            .passwords_for_file("card_01.pdf")
            .iter()
            .map(|p| p.value.expose().to_string())
            .collect();
        assert_eq!(passwords, vec!["first", "second"]);
    }

    #[test]
    fn test_from_json_str() {
        let config = IngestionConfig::from_json_str(
            r#"{
                "max_document_bytes": 2048,
                "filename_rules": [
                    { "name_rule": "Fubon*.pdf", "bank": "fubon", "password": "secret" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.max_document_bytes, 2048);
        assert_eq!(config.accepted_mime_types, vec!["application/pdf"]);
        assert_eq!(config.filename_rules.len(), 1);
        assert_eq!(config.filename_rules[0].bank(), "fubon");
        assert!(config.filename_rules[0].matches("Fubon_2024.pdf"));
        assert!(!config.filename_rules[0].matches("Cathay.pdf"));
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);

        let invalid = IngestionConfig::from_json_str(r#"{ "max_document_bytes": 0 }"#);
        assert!(matches!(invalid, Err(ImportError::Validation(_))));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();

        let missing = IngestionConfig::from_json_file(dir.path().join("missing.json")).unwrap();
        assert_eq!(missing.max_document_bytes, DEFAULT_MAX_DOCUMENT_BYTES);

        let path = dir.path().join("ingest.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, r#"{{ "accepted_mime_types": ["application/pdf", "application/x-pdf"] }}"#)
            .unwrap();

        let loaded = IngestionConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded.accepted_mime_types.len(), 2);
    }

    #[test]
    fn test_secret_cipher_uses_configured_key() {
        let config = IngestionConfig::from_json_str(r#"{ "credential_key": "k1" }"#).unwrap();
        let sealed = config.secret_cipher().seal(&SecretValue::new("pw")).unwrap();

        assert_eq!(config.secret_cipher().open(&sealed).unwrap().expose(), "pw");
        assert!(IngestionConfig::default().secret_cipher().open(&sealed).is_err());
        assert!(!format!("{:?}", config).contains("k1"));
    }

    #[test]
    fn test_init_tracing_installs_global_subscriber() {
        let config = IngestionConfig {
            log_filter: "statement_import=debug".to_string(),
            ..IngestionConfig::default()
        };

        config.init_tracing();
        config.init_tracing();

        // A second global subscriber is refused once one is installed
        assert!(tracing_subscriber::fmt().try_init().is_err());
    }
}
