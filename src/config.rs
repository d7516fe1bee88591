//! Process configuration read from the environment

use crate::catalog::Catalog;
use crate::format::Locale;
use crate::ledger::loan::{LoanOffsets, DEFAULT_DISBURSEMENT_ACCOUNT};
use crate::ledger::sheets::{
    SheetsConfig, DEFAULT_API_BASE, DEFAULT_METADATA_TOKEN_URL, DEFAULT_OAUTH_TOKEN_URL,
};
use chrono_tz::Tz;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub api_base: String,
    /// Expected `X-Telegram-Bot-Api-Secret-Token` on webhook calls
    pub webhook_secret: Option<String>,
}

/// Bearer token settings for the Sheets API
#[derive(Clone)]
pub enum SheetsAuth {
    /// Service-account email and private key, exchanged at `token_url`
    ServiceAccount {
        email: String,
        private_key: String,
        token_url: String,
    },
    Static(String),
    Metadata(String),
}

impl std::fmt::Debug for SheetsAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetsAuth::ServiceAccount {
                email, token_url, ..
            } => f
                .debug_struct("ServiceAccount")
                .field("email", email)
                .field("token_url", token_url)
                .finish_non_exhaustive(),
            SheetsAuth::Static(_) => f.write_str("Static(..)"),
            SheetsAuth::Metadata(url) => f.debug_tuple("Metadata").field(url).finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub port: u16,
    pub telegram: TelegramConfig,
    pub sheets: SheetsConfig,
    pub sheets_auth: SheetsAuth,
    pub locale: Locale,
    pub catalog: Catalog,
    pub loan_offsets: LoanOffsets,
    /// Account loan proceeds are moved into
    pub disbursement_account: String,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let port = match get("LEDGER_BOT_PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                var: "LEDGER_BOT_PORT",
                reason: format!("{e}"),
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let timeout = match get("LEDGER_REQUEST_TIMEOUT_SECS") {
            Some(value) => match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "LEDGER_REQUEST_TIMEOUT_SECS",
                        value,
                        reason: "expected a positive number of seconds".to_string(),
                    })
                }
            },
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        let mut locale = Locale::default();
        if let Some(value) = get("LEDGER_TIMEZONE") {
            locale.timezone = value.trim().parse::<Tz>().map_err(|e| ConfigError::Invalid {
                var: "LEDGER_TIMEZONE",
                reason: e.to_string(),
                value: value.clone(),
            })?;
        }
        if let Some(value) = get("LEDGER_CURRENCY_SYMBOL") {
            locale.currency_symbol = value;
        }
        if let Some(value) = get("LEDGER_TIMESTAMP_FORMAT") {
            locale.timestamp_format = value;
        }

        let mut catalog = Catalog::default();
        if let Some(value) = get("LEDGER_ACCOUNTS") {
            catalog = catalog.with_accounts(split_list(&value));
        }
        if let Some(value) = get("LEDGER_INCOME_CATEGORIES") {
            catalog.income_categories = split_list(&value);
        }
        if let Some(value) = get("LEDGER_EXPENSE_CATEGORIES") {
            catalog.expense_categories = split_list(&value);
        }

        let sheets_auth = match (
            get("GOOGLE_SERVICE_ACCOUNT_EMAIL"),
            get("GOOGLE_PRIVATE_KEY"),
            get("GOOGLE_ACCESS_TOKEN"),
        ) {
            (Some(email), Some(private_key), _) => SheetsAuth::ServiceAccount {
                email,
                private_key,
                token_url: get("GOOGLE_OAUTH_TOKEN_URL")
                    .unwrap_or_else(|| DEFAULT_OAUTH_TOKEN_URL.to_string()),
            },
            (Some(_), None, _) => return Err(ConfigError::Missing("GOOGLE_PRIVATE_KEY")),
            (None, Some(_), _) => return Err(ConfigError::Missing("GOOGLE_SERVICE_ACCOUNT_EMAIL")),
            (None, None, Some(token)) => SheetsAuth::Static(token),
            (None, None, None) => SheetsAuth::Metadata(
                get("GOOGLE_METADATA_TOKEN_URL")
                    .unwrap_or_else(|| DEFAULT_METADATA_TOKEN_URL.to_string()),
            ),
        };

        Ok(Self {
            port,
            telegram: TelegramConfig {
                bot_token: required("TELEGRAM_BOT_TOKEN")?,
                api_base: get("TELEGRAM_API_BASE")
                    .unwrap_or_else(|| DEFAULT_TELEGRAM_API_BASE.to_string()),
                webhook_secret: get("TELEGRAM_WEBHOOK_SECRET"),
            },
            sheets: SheetsConfig {
                api_base: get("GOOGLE_SHEETS_API_BASE")
                    .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
                spreadsheet_id: required("GOOGLE_SHEET_ID")?,
                tab: get("GOOGLE_SHEET_TAB").unwrap_or_else(|| "Transactions".to_string()),
                timeout,
            },
            sheets_auth,
            locale,
            catalog,
            loan_offsets: get("LEDGER_LOAN_OFFSETS")
                .map(|v| LoanOffsets::parse(&v))
                .unwrap_or_default(),
            disbursement_account: get("LEDGER_LOAN_DISBURSEMENT_ACCOUNT")
                .unwrap_or_else(|| DEFAULT_DISBURSEMENT_ACCOUNT.to_string()),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        self.sheets.timeout
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<BotConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        BotConfig::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [("TELEGRAM_BOT_TOKEN", "t"), ("GOOGLE_SHEET_ID", "s")];

    #[test]
    fn defaults_apply() {
        let config = load(&REQUIRED).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.telegram.api_base, DEFAULT_TELEGRAM_API_BASE);
        assert!(config.telegram.webhook_secret.is_none());
        assert_eq!(config.sheets.tab, "Transactions");
        assert_eq!(config.request_timeout(), DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.locale, Locale::default());
        assert_eq!(config.catalog, Catalog::default());
        assert_eq!(config.loan_offsets, LoanOffsets::default());
        assert_eq!(config.disbursement_account, "Maribank");
        assert!(matches!(config.sheets_auth, SheetsAuth::Metadata(ref url) if url == DEFAULT_METADATA_TOKEN_URL));
    }

    #[test]
    fn required_values_are_reported() {
        assert_eq!(
            load(&[("GOOGLE_SHEET_ID", "s")]).unwrap_err(),
            ConfigError::Missing("TELEGRAM_BOT_TOKEN")
        );
        assert_eq!(
            load(&[("TELEGRAM_BOT_TOKEN", "t"), ("GOOGLE_SHEET_ID", "  ")]).unwrap_err(),
            ConfigError::Missing("GOOGLE_SHEET_ID")
        );
    }

    #[test]
    fn overrides_are_read() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("LEDGER_BOT_PORT", "9090"),
            ("LEDGER_TIMEZONE", "Europe/Berlin"),
            ("LEDGER_CURRENCY_SYMBOL", "€"),
            ("LEDGER_ACCOUNTS", "Bank, Wallet"),
            ("LEDGER_LOAN_OFFSETS", "Bank=4"),
            ("LEDGER_REQUEST_TIMEOUT_SECS", "5"),
            ("GOOGLE_ACCESS_TOKEN", "abc"),
            ("TELEGRAM_WEBHOOK_SECRET", "hush"),
        ]);
        let config = load(&vars).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.locale.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(config.locale.currency_symbol, "€");
        assert_eq!(
            config.catalog.accounts,
            vec!["Bank", "Wallet", "Receivable", "Loan - clearing"]
        );
        assert_eq!(config.loan_offsets.start_for("Bank"), 4);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert!(matches!(config.sheets_auth, SheetsAuth::Static(ref t) if t == "abc"));
        assert_eq!(config.telegram.webhook_secret.as_deref(), Some("hush"));
    }

    #[test]
    fn service_account_takes_precedence() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("GOOGLE_SERVICE_ACCOUNT_EMAIL", "bot@proj.iam.gserviceaccount.com"),
            ("GOOGLE_PRIVATE_KEY", "a2V5"),
            ("GOOGLE_ACCESS_TOKEN", "abc"),
        ]);
        let config = load(&vars).unwrap();
        let SheetsAuth::ServiceAccount {
            email,
            private_key,
            token_url,
        } = &config.sheets_auth
        else {
            panic!("expected service account auth, got {:?}", config.sheets_auth);
        };
        assert_eq!(email, "bot@proj.iam.gserviceaccount.com");
        assert_eq!(private_key, "a2V5");
        assert_eq!(token_url, DEFAULT_OAUTH_TOKEN_URL);
        assert!(!format!("{:?}", config.sheets_auth).contains("a2V5"));
    }

    #[test]
    fn half_a_service_account_is_reported() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("GOOGLE_SERVICE_ACCOUNT_EMAIL", "bot@proj.iam.gserviceaccount.com"));
        assert_eq!(load(&vars).unwrap_err(), ConfigError::Missing("GOOGLE_PRIVATE_KEY"));
    }

    #[test]
    fn malformed_values_are_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("LEDGER_BOT_PORT", "eighty"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { var: "LEDGER_BOT_PORT", .. })
        ));

        let mut vars = REQUIRED.to_vec();
        vars.push(("LEDGER_TIMEZONE", "Mars/Olympus"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { var: "LEDGER_TIMEZONE", .. })
        ));

        let mut vars = REQUIRED.to_vec();
        vars.push(("LEDGER_REQUEST_TIMEOUT_SECS", "0"));
        assert!(load(&vars).is_err());
    }
}
