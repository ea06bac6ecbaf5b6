use ini::Ini;

use crate::error::NyxError;

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub db: String,
}

impl PostgresConfig {
    pub fn url(&self) -> String {
        format!(
            "postgresql://{}:{}@{}:{}/{}",
            self.user, self.pass, self.host, self.port, self.db
        )
    }
}

#[derive(Debug, Clone)]
pub struct MqConfig {
    pub host: String,
    pub port: u16,
    pub worker_queue: String,
    pub processor_queue: String,
}

impl MqConfig {
    pub fn amqp_url(&self) -> String {
        format!("amqp://{}:{}/%2f", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct GeneralConfig {
    /// Required, no implicit default: how many days old `date_accessed` must be
    /// before a page is due for re-crawl.
    pub access_day_difference: i64,
    pub tor_proxy: String,
    pub data_dir: String,
    pub model_dir: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub postgres: PostgresConfig,
    pub mq: MqConfig,
    pub general: GeneralConfig,
}

impl AppConfig {
    /// Picks `config.conf` when running inside a container, else `config_local.conf`.
    pub fn default_path() -> String {
        if running_in_docker() {
            "config.conf".to_string()
        } else {
            "config_local.conf".to_string()
        }
    }

    pub fn load(path: &str) -> Result<Self, NyxError> {
        let ini = Ini::load_from_file(path)
            .map_err(|e| NyxError::Config(format!("cannot read {path}: {e}")))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, NyxError> {
        let postgres_section = section(ini, "POSTGRES")?;
        let mq_section = section(ini, "MQ")?;
        let general_section = ini.section(Some("GENERAL"));

        let postgres = PostgresConfig {
            host: get(postgres_section, "POSTGRES", "postgresql_host")?,
            port: get_parsed(postgres_section, "POSTGRES", "postgresql_port")?,
            user: get(postgres_section, "POSTGRES", "postgresql_user")?,
            pass: get(postgres_section, "POSTGRES", "postgresql_pass")?,
            db: get(postgres_section, "POSTGRES", "postgresql_db")?,
        };

        let mq = MqConfig {
            host: get(mq_section, "MQ", "mq_host")?,
            port: get_parsed(mq_section, "MQ", "mq_port")?,
            worker_queue: get(mq_section, "MQ", "mq_worker_queue")?,
            processor_queue: get(mq_section, "MQ", "mq_processor_queue")?,
        };

        let general = GeneralConfig {
            access_day_difference: general_section
                .and_then(|s| s.get("access_day_difference"))
                .ok_or_else(|| {
                    NyxError::Config(
                        "GENERAL.access_day_difference is required and has no default".into(),
                    )
                })?
                .parse()
                .map_err(|e| NyxError::Config(format!("access_day_difference: {e}")))?,
            tor_proxy: general_section
                .and_then(|s| s.get("tor_proxy"))
                .unwrap_or("127.0.0.1:9050")
                .to_string(),
            data_dir: general_section
                .and_then(|s| s.get("data_dir"))
                .unwrap_or(".")
                .to_string(),
            model_dir: general_section
                .and_then(|s| s.get("model_dir"))
                .unwrap_or("TopicModel")
                .to_string(),
        };

        Ok(AppConfig {
            postgres,
            mq,
            general,
        })
    }
}

fn section<'a>(
    ini: &'a Ini,
    name: &str,
) -> Result<&'a ini::Properties, NyxError> {
    ini.section(Some(name))
        .ok_or_else(|| NyxError::Config(format!("missing [{name}] section")))
}

fn get(props: &ini::Properties, section: &str, key: &str) -> Result<String, NyxError> {
    props
        .get(key)
        .map(str::to_string)
        .ok_or_else(|| NyxError::Config(format!("missing {section}.{key}")))
}

fn get_parsed<T: std::str::FromStr>(
    props: &ini::Properties,
    section: &str,
    key: &str,
) -> Result<T, NyxError> {
    let raw = get(props, section, key)?;
    raw.parse()
        .map_err(|_| NyxError::Config(format!("invalid {section}.{key}: {raw}")))
}

pub fn running_in_docker() -> bool {
    std::env::var("AM_I_IN_A_DOCKER_CONTAINER")
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}
