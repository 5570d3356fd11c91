use dotenvy::dotenv;
use std::env;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub ec_api_base_url: String,
    pub ec_webshop_id: String,
    pub ec_api_password: String,
    pub ct_api_url: String,
    pub ct_project_key: String,
    pub ct_auth_token: String,
    /// Public base URL of this connector. When set, it is registered as a
    /// custom object at startup so checkout payloads can be built from it.
    pub connector_base_url: Option<String>,
    pub widget_enabled: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        let config = Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            ec_api_base_url: require_url("EC_API_BASE_URL")?,
            ec_webshop_id: env::var("EC_WEBSHOP_ID")?,
            ec_api_password: env::var("EC_API_PASSWORD")?,
            ct_api_url: require_url("CT_API_URL")?,
            ct_project_key: env::var("CT_PROJECT_KEY")?,
            ct_auth_token: env::var("CT_AUTH_TOKEN")?,
            connector_base_url: match env::var("CONNECTOR_BASE_URL").ok() {
                Some(raw) => Some(parse_url("CONNECTOR_BASE_URL", &raw)?),
                None => None,
            },
            widget_enabled: env::var("WIDGET_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()?,
        };

        Ok(config)
    }
}

fn require_url(name: &str) -> anyhow::Result<String> {
    parse_url(name, &env::var(name)?)
}

fn parse_url(name: &str, raw: &str) -> anyhow::Result<String> {
    Url::parse(raw).map_err(|e| anyhow::anyhow!("{name} is not a valid URL: {e}"))?;
    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_values_are_validated_and_normalized() {
        let url = parse_url("X", "https://ratenkauf.easycredit.de/").unwrap();
        assert_eq!(url, "https://ratenkauf.easycredit.de");

        assert!(parse_url("X", "not a url").is_err());
    }
}
