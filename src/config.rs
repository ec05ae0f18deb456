//! # Configuration Loader & Credential Gate
//!
//! Reads `config.json`, overlays environment variables, and refuses to hand out
//! credentials until every required key is present and both credential files
//! exist on disk. The resulting [`Credentials`] value is built once at startup
//! and passed explicitly to whatever needs it.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, info};
use serde_json::Value;

use crate::config_errors::{ConfigError, MissingCredential, MissingReason};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_VISION_CREDENTIALS_FILE: &str = "vision-api-credentials.json";
pub const DEFAULT_FIREBASE_CREDENTIALS_FILE: &str = "firebase_credentials.json";

/// The recognized configuration keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    TelegramBotToken,
    NutritionixAppId,
    NutritionixApiKey,
    VisionCredentialsFile,
    FirebaseCredentialsFile,
}

impl CredentialKey {
    /// All keys, in the order validation reports them
    pub const ALL: [CredentialKey; 5] = [
        CredentialKey::TelegramBotToken,
        CredentialKey::NutritionixAppId,
        CredentialKey::NutritionixApiKey,
        CredentialKey::VisionCredentialsFile,
        CredentialKey::FirebaseCredentialsFile,
    ];

    /// Name of the key inside `config.json`
    pub fn name(self) -> &'static str {
        match self {
            CredentialKey::TelegramBotToken => "telegram_bot_token",
            CredentialKey::NutritionixAppId => "nutritionix_app_id",
            CredentialKey::NutritionixApiKey => "nutritionix_api_key",
            CredentialKey::VisionCredentialsFile => "vision_credentials_file",
            CredentialKey::FirebaseCredentialsFile => "firebase_credentials_file",
        }
    }

    /// Environment variable that overrides the file value
    pub fn env_var(self) -> &'static str {
        match self {
            CredentialKey::TelegramBotToken => "TELEGRAM_BOT_TOKEN",
            CredentialKey::NutritionixAppId => "NUTRITIONIX_APP_ID",
            CredentialKey::NutritionixApiKey => "NUTRITIONIX_API_KEY",
            CredentialKey::VisionCredentialsFile => "GOOGLE_APPLICATION_CREDENTIALS",
            CredentialKey::FirebaseCredentialsFile => "FIREBASE_CREDENTIALS",
        }
    }

    /// Whether the value is a path to a credentials document rather than a secret
    pub fn is_file(self) -> bool {
        matches!(
            self,
            CredentialKey::VisionCredentialsFile | CredentialKey::FirebaseCredentialsFile
        )
    }

    fn default_value(self) -> Option<&'static str> {
        match self {
            CredentialKey::VisionCredentialsFile => Some(DEFAULT_VISION_CREDENTIALS_FILE),
            CredentialKey::FirebaseCredentialsFile => Some(DEFAULT_FIREBASE_CREDENTIALS_FILE),
            _ => None,
        }
    }

    fn from_env_var(var: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.env_var() == var)
    }
}

impl fmt::Display for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CredentialKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.name() == s)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

/// Where a value came from; decides how relative file paths resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    File,
    Env,
}

#[derive(Clone)]
struct Entry {
    value: String,
    origin: Origin,
}

/// Raw configuration as loaded from disk (plus any overrides)
#[derive(Clone)]
pub struct Config {
    values: HashMap<CredentialKey, Entry>,
    base_dir: PathBuf,
}

impl Config {
    /// Load the configuration document at `path`
    ///
    /// # Errors
    ///
    /// - `ConfigNotFound` if nothing exists at `path`, including when a parent
    ///   component is a regular file
    /// - `ConfigMalformed` if the content is not a JSON object of string values
    /// - `Unreadable` for any other I/O failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Reading configuration document: {}", path.display());

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
                ) =>
            {
                return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(ConfigError::ConfigMalformed {
                    path: path.to_path_buf(),
                    reason: "file is not valid UTF-8".to_string(),
                });
            }
            Err(source) => {
                return Err(ConfigError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Self::parse(&content, base_dir).map_err(|reason| ConfigError::ConfigMalformed {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse a configuration document; relative file paths resolve against `base_dir`
    pub fn parse(content: &str, base_dir: PathBuf) -> Result<Self, String> {
        let document: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
        let Value::Object(map) = document else {
            return Err("expected a JSON object at the top level".to_string());
        };

        let mut values = HashMap::new();
        for key in CredentialKey::ALL {
            match map.get(key.name()) {
                None | Some(Value::Null) => {}
                Some(Value::String(value)) => {
                    values.insert(
                        key,
                        Entry {
                            value: value.trim().to_string(),
                            origin: Origin::File,
                        },
                    );
                }
                Some(other) => {
                    return Err(format!(
                        "`{}` must be a string, found {}",
                        key.name(),
                        json_type_name(other)
                    ));
                }
            }
        }

        let ignored = map
            .keys()
            .filter(|name| name.parse::<CredentialKey>().is_err())
            .count();
        if ignored > 0 {
            debug!("Ignoring {ignored} unrecognized configuration keys");
        }

        for key in CredentialKey::ALL {
            if let Some(default) = key.default_value() {
                values.entry(key).or_insert_with(|| Entry {
                    value: default.to_string(),
                    origin: Origin::File,
                });
            }
        }

        Ok(Self { values, base_dir })
    }

    /// Overlay recognized environment variables; empty values are ignored
    pub fn with_overrides<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (var, value) in vars {
            let Some(key) = CredentialKey::from_env_var(var.as_ref()) else {
                continue;
            };
            let value = value.as_ref().trim();
            if value.is_empty() {
                continue;
            }
            debug!("Configuration key {key} overridden by {}", key.env_var());
            self.values.insert(
                key,
                Entry {
                    value: value.to_string(),
                    origin: Origin::Env,
                },
            );
        }
        self
    }

    /// Overlay the process environment
    pub fn apply_env(self) -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
        self.with_overrides(vars)
    }

    /// Check every required key, collecting all failures before reporting
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();

        for key in CredentialKey::ALL {
            let reason = match self.values.get(&key) {
                None => Some(MissingReason::Absent),
                Some(entry) if entry.value.is_empty() => Some(MissingReason::Empty),
                Some(entry) if key.is_file() => {
                    let path = self.resolve(entry);
                    (!path.is_file()).then_some(MissingReason::FileNotFound(path))
                }
                Some(_) => None,
            };

            if let Some(reason) = reason {
                missing.push(MissingCredential { key, reason });
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingCredential(missing))
        }
    }

    /// Value stored for a recognized key name
    ///
    /// Names outside the recognized set fail with `UnknownKey` even if the
    /// document contains them.
    pub fn get(&self, name: &str) -> Result<&str, ConfigError> {
        let key: CredentialKey = name.parse()?;
        self.values
            .get(&key)
            .map(|entry| entry.value.as_str())
            .ok_or_else(|| {
                ConfigError::MissingCredential(vec![MissingCredential {
                    key,
                    reason: MissingReason::Absent,
                }])
            })
    }

    /// Resolved on-disk location for a file key
    pub fn credential_path(&self, key: CredentialKey) -> Option<PathBuf> {
        if !key.is_file() {
            return None;
        }
        self.values.get(&key).map(|entry| self.resolve(entry))
    }

    /// Validate and convert into the typed credential set
    pub fn into_credentials(self) -> Result<Credentials, ConfigError> {
        self.validate()?;

        Ok(Credentials {
            telegram_bot_token: self.required(CredentialKey::TelegramBotToken)?,
            nutritionix: NutritionixCredentials {
                app_id: self.required(CredentialKey::NutritionixAppId)?,
                api_key: self.required(CredentialKey::NutritionixApiKey)?,
            },
            vision_credentials_file: self.required_path(CredentialKey::VisionCredentialsFile)?,
            firebase_credentials_file: self.required_path(CredentialKey::FirebaseCredentialsFile)?,
        })
    }

    fn required(&self, key: CredentialKey) -> Result<String, ConfigError> {
        self.get(key.name()).map(str::to_string)
    }

    fn required_path(&self, key: CredentialKey) -> Result<PathBuf, ConfigError> {
        self.credential_path(key).ok_or_else(|| {
            ConfigError::MissingCredential(vec![MissingCredential {
                key,
                reason: MissingReason::Absent,
            }])
        })
    }

    fn resolve(&self, entry: &Entry) -> PathBuf {
        let path = Path::new(&entry.value);
        match entry.origin {
            Origin::File if path.is_relative() => self.base_dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for key in CredentialKey::ALL {
            if let Some(entry) = self.values.get(&key) {
                if key.is_file() {
                    map.entry(&key.name(), &entry.value);
                } else {
                    map.entry(&key.name(), &"<redacted>");
                }
            }
        }
        map.finish()
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Nutritionix application credentials
#[derive(Clone, PartialEq, Eq)]
pub struct NutritionixCredentials {
    pub app_id: String,
    pub api_key: String,
}

impl fmt::Debug for NutritionixCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NutritionixCredentials")
            .field("app_id", &self.app_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Validated credentials; only obtainable through the gate
#[derive(Clone)]
pub struct Credentials {
    telegram_bot_token: String,
    nutritionix: NutritionixCredentials,
    vision_credentials_file: PathBuf,
    firebase_credentials_file: PathBuf,
}

impl Credentials {
    pub fn telegram_bot_token(&self) -> &str {
        &self.telegram_bot_token
    }

    pub fn nutritionix(&self) -> &NutritionixCredentials {
        &self.nutritionix
    }

    pub fn vision_credentials_file(&self) -> &Path {
        &self.vision_credentials_file
    }

    pub fn firebase_credentials_file(&self) -> &Path {
        &self.firebase_credentials_file
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("telegram_bot_token", &"<redacted>")
            .field("nutritionix", &self.nutritionix)
            .field("vision_credentials_file", &self.vision_credentials_file)
            .field("firebase_credentials_file", &self.firebase_credentials_file)
            .finish()
    }
}

/// Run the startup gate: load, overlay the environment, validate
pub fn credential_gate<P: AsRef<Path>>(path: P) -> Result<Credentials, ConfigError> {
    let path = path.as_ref();
    info!("Loading configuration from: {}", path.display());

    let credentials = Config::load(path)?.apply_env().into_credentials()?;

    info!(
        "Credential gate passed (vision credentials: {}, firebase credentials: {})",
        credentials.vision_credentials_file().display(),
        credentials.firebase_credentials_file().display()
    );
    Ok(credentials)
}
