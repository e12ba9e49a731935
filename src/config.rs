use serde::{Deserialize, Serialize};
use std::env;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::ConfigurationError;
use crate::util;

fn default_mongodb_uri() -> String {
    env::var("MONGODB_URI").unwrap_or("mongodb://localhost:27017".to_string())
}

fn default_mongodb_db() -> String {
    env::var("MONGODB_DB_NAME").unwrap_or("classroom".to_string())
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from(env::var("UPLOADS_DIR").unwrap_or("./uploads".to_string()))
}

fn default_public_base_url() -> String {
    env::var("PUBLIC_BASE_URL").unwrap_or("http://localhost:8000".to_string())
}

fn default_avatar_url() -> String {
    env::var("DEFAULT_AVATAR_URL").unwrap_or("/assets/default-avatar.png".to_string())
}

/// Credentials used to create the first administrator account when the
/// `admins` collection is empty. Never persisted to the settings file.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    file_path: PathBuf,

    #[serde(default = "default_mongodb_uri")]
    pub mongodb_uri: String,
    #[serde(default = "default_mongodb_db")]
    pub mongodb_db: String,

    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    #[serde(default = "default_avatar_url")]
    pub default_avatar_url: String,

    // Secrets are environment-only; the settings file never contains them.
    #[serde(skip)]
    pub jwt_secret: String,
    #[serde(skip)]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            file_path: config_dir().join("settings.yml"),
            mongodb_uri: default_mongodb_uri(),
            mongodb_db: default_mongodb_db(),
            uploads_dir: default_uploads_dir(),
            public_base_url: default_public_base_url(),
            default_avatar_url: default_avatar_url(),
            jwt_secret: String::new(),
            bootstrap_admin: None,
        }
    }
}

#[inline]
fn config_dir() -> PathBuf {
    PathBuf::from(env::var("CONFIG_DIR").unwrap_or("./config".to_string()))
}

impl Config {
    pub fn load() -> Result<Config, ConfigurationError> {
        let config_file = util::find_first_subpath(
            config_dir(),
            &["settings.yml", "settings.yaml"],
            Path::exists,
        )
        .ok_or_else(|| ConfigurationError::NotFound(config_dir()))?;

        let file = File::open(config_file)?;
        let config = serde_yaml::from_reader(BufReader::new(file))?;

        Ok(config)
    }

    /// Fills environment-only secrets. The token signing secret has no
    /// fallback; a missing `JWT_SECRET` is a startup failure.
    pub fn load_secrets(&mut self) -> Result<(), ConfigurationError> {
        self.jwt_secret =
            env::var("JWT_SECRET").map_err(|_| ConfigurationError::MissingSecret("JWT_SECRET"))?;

        self.bootstrap_admin = match (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(BootstrapAdmin { email, password }),
            _ => None,
        };

        Ok(())
    }

    pub fn save(&self) -> Result<(), ConfigurationError> {
        let file = File::create(&self.file_path)?;
        let mut out = BufWriter::new(file);
        serde_yaml::to_writer(&mut out, self)?;
        out.flush()?;
        Ok(())
    }
}
