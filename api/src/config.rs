#[derive(Clone, Debug, PartialEq)]
pub enum Env {
    Dev,
    Staging,
    Production,
}

pub struct ServerConfig {
    pub env: Env,

    /// Postgres connection string, e.g.
    /// postgres://postgres@localhost:5432/addon-radar
    pub database_url: String,

    /// API key for the CurseForge catalog (x-api-key header).
    pub curseforge_api_key: String,

    pub listen_port: u16,

    /// Which game's catalog to track. Defaults to World of Warcraft.
    pub game_id: i32,

    /// Game version type the harvest is filtered to (retail WoW).
    pub game_version_type_id: i32,

    /// Disable to run the read API without the hourly sync pipeline,
    /// e.g. against a database another instance keeps fresh.
    pub sync_enabled: bool,
}

fn var(key: &str) -> Result<Option<String>, String> {
    match std::env::var(key) {
        Ok(env) => Ok(Some(env)),
        Err(e) => {
            tracing::warn!("Mising environment variable `{key}`");
            match e {
                std::env::VarError::NotPresent => Ok(None),
                std::env::VarError::NotUnicode(_) => Err(format!(
                    "Could not get the environment variable `{key}` due to unicode error"
                )),
            }
        }
    }
}

fn required_var(key: &str) -> String {
    let val = var(key);
    match val {
        Ok(val) => match val {
            Some(val) => val,
            None => {
                tracing::error!("Environment variable `{key}` is required");
                std::process::exit(1)
            }
        },
        Err(e) => {
            tracing::error!(
                "Environment variable `{key}` is required, but could not retrieve: {e}"
            );
            std::process::exit(1)
        }
    }
}

fn parsed_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    match var(key) {
        Ok(Some(raw)) => match raw.parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::error!("Environment variable `{key}` has an unparseable value `{raw}`");
                std::process::exit(1)
            }
        },
        _ => default,
    }
}

impl ServerConfig {
    pub fn new_from_env() -> Self {
        let env = match var("ENVIRONMENT") {
            Ok(Some(env)) => match env.as_str() {
                "dev" => Env::Dev,
                "staging" => Env::Staging,
                "production" => Env::Production,
                _ => Env::Dev,
            },
            _ => Env::Dev,
        };

        ServerConfig {
            env,
            database_url: required_var("DATABASE_URL"),
            curseforge_api_key: required_var("CURSEFORGE_API_KEY"),
            listen_port: parsed_var("PORT", 3000),
            game_id: parsed_var("CURSEFORGE_GAME_ID", 1),
            game_version_type_id: parsed_var("CURSEFORGE_GAME_VERSION_TYPE_ID", 517),
            sync_enabled: parsed_var("SYNC_ENABLED", true),
        }
    }
}
