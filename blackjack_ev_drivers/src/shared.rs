use std::fs;
use std::path::{Path, PathBuf};

use blackjack_ev::{DoublePolicy, Rules};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_CONFIG_FILE_NAME: &str = ".blackjack_ev.yml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rule: ConfigRule,
    #[serde(default)]
    pub report: ConfigReport,
    #[serde(default)]
    pub logging: ConfigLogging,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigRule {
    pub number_of_decks: u8,
    pub cut_card_offset: u16,
    pub dealer_hit_on_soft17: bool,
    pub allow_das: bool,
    pub double_policy: String,
    pub payout_blackjack: f64,
}

impl Default for ConfigRule {
    fn default() -> Self {
        let rules = Rules::default();
        ConfigRule {
            number_of_decks: rules.number_of_decks,
            cut_card_offset: rules.cut_card_offset,
            dealer_hit_on_soft17: rules.dealer_hit_on_soft17,
            allow_das: rules.allow_das,
            double_policy: rules.double_policy.to_string(),
            payout_blackjack: rules.payout_blackjack,
        }
    }
}

impl TryFrom<ConfigRule> for Rules {
    type Error = ConfigError;

    fn try_from(config_rule: ConfigRule) -> Result<Rules, Self::Error> {
        let double_policy = config_rule
            .double_policy
            .parse::<DoublePolicy>()
            .map_err(|source| ConfigError::Policy {
                value: config_rule.double_policy.clone(),
                source,
            })?;
        let rules = Rules {
            number_of_decks: config_rule.number_of_decks,
            cut_card_offset: config_rule.cut_card_offset,
            dealer_hit_on_soft17: config_rule.dealer_hit_on_soft17,
            allow_das: config_rule.allow_das,
            double_policy,
            payout_blackjack: config_rule.payout_blackjack,
        };
        rules.validate()?;

        Ok(rules)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigReport {
    /// 0 means one worker per available core.
    pub number_of_threads: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigLogging {
    pub level: String,
}

impl Default for ConfigLogging {
    fn default() -> Self {
        ConfigLogging {
            level: String::from("warn"),
        }
    }
}

impl ConfigLogging {
    pub fn level(&self) -> Option<Level> {
        match self.level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("unknown double_policy '{value}': {source}")]
    Policy {
        value: String,
        #[source]
        source: serde::de::value::Error,
    },
    #[error("invalid rule: {0}")]
    Invalid(#[from] blackjack_ev::Error),
}

/// Reads the content of a given config file and parses it to a Config.
pub fn parse_config_from_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let file_content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        source,
        path: path.to_path_buf(),
    })?;
    serde_yaml::from_str(&file_content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}

/// `~/.blackjack_ev.yml`, if a home directory can be found.
pub fn default_config_path() -> Option<PathBuf> {
    home::home_dir().map(|home_dir| home_dir.join(DEFAULT_CONFIG_FILE_NAME))
}

/// Loads `path` when given. Otherwise loads the default config file, falling
/// back to the built-in rules when there is none.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = path {
        return parse_config_from_file(path);
    }
    match default_config_path() {
        Some(path) if path.is_file() => parse_config_from_file(path),
        _ => Ok(Config::default()),
    }
}

/// Logs to stderr. `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(logging: &ConfigLogging) {
    let level = logging.level().unwrap_or(Level::WARN);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    // Ignore error if a global subscriber is already set
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn get_typical_config_rule() -> ConfigRule {
        ConfigRule {
            number_of_decks: 6,
            cut_card_offset: 78,
            dealer_hit_on_soft17: false,
            allow_das: false,
            double_policy: String::from("AnyTwo"),
            payout_blackjack: 1.2,
        }
    }

    #[test]
    fn can_convert_rule() {
        let config_rule = get_typical_config_rule();
        let converted_rule: Rules = config_rule.try_into().unwrap();
        assert_eq!(converted_rule.number_of_decks, 6);
        assert_eq!(converted_rule.cut_card_offset, 78);
        assert!(!converted_rule.dealer_hit_on_soft17);
        assert_eq!(converted_rule.double_policy, DoublePolicy::AnyTwo);
        assert_eq!(converted_rule.payout_blackjack, 1.2);
    }

    #[test]
    fn should_return_error_when_converting_rule() {
        let mut config_rule = get_typical_config_rule();
        config_rule.double_policy = String::from("Not a policy");
        let convert_result: Result<Rules, ConfigError> = config_rule.try_into();
        assert!(matches!(convert_result, Err(ConfigError::Policy { .. })));

        let mut config_rule = get_typical_config_rule();
        config_rule.cut_card_offset = 312;
        let convert_result: Result<Rules, ConfigError> = config_rule.try_into();
        assert!(matches!(
            convert_result,
            Err(ConfigError::Invalid(blackjack_ev::Error::CutCardTooDeep { .. }))
        ));
    }

    #[test]
    fn default_config_is_the_standard_game() {
        let rules: Rules = Config::default().rule.try_into().unwrap();
        assert_eq!(rules, Rules::default());
    }

    #[test]
    fn parses_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "rule:\n  number_of_decks: 2\n  double_policy: TenElevenOnly\nreport:\n  number_of_threads: 4\nlogging:\n  level: debug\n"
        )
        .unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.rule.number_of_decks, 2);
        assert_eq!(config.rule.cut_card_offset, 0);
        assert_eq!(config.report.number_of_threads, 4);
        assert_eq!(config.logging.level(), Some(Level::DEBUG));

        let rules: Rules = config.rule.try_into().unwrap();
        assert_eq!(rules.double_policy, DoublePolicy::TenElevenOnly);
        assert!(rules.dealer_hit_on_soft17);
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config: Config = serde_yaml::from_str("report:\n  number_of_threads: 2\n").unwrap();
        assert_eq!(config.rule, ConfigRule::default());
        assert_eq!(config.logging, ConfigLogging::default());
    }

    #[test]
    fn reports_read_and_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yml");
        assert!(matches!(
            parse_config_from_file(&missing),
            Err(ConfigError::Read { .. })
        ));

        let broken = dir.path().join("broken.yml");
        fs::write(&broken, "rule: [not, a, map").unwrap();
        assert!(matches!(
            parse_config_from_file(&broken),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn unknown_log_level() {
        let logging = ConfigLogging {
            level: String::from("loud"),
        };
        assert_eq!(logging.level(), None);
    }
}
