//! TOML and `.praxis/config.toml` loading, sandboxed with `figment::Jail`.

use figment::{
    Figment, Jail,
    providers::{Format, Serialized, Toml},
};
use praxis_config::PraxisConfig;

#[test]
fn loads_mail_and_auth_sections_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[mail]
api_url = "https://mail.example/send"
api_key = "mk_123"
from_address = "no-reply@praxis.example"
from_name = "Praxis"

[auth]
session_ttl_hours = 24
cookie_secure = true
"#,
        )?;

        let config: PraxisConfig = Figment::from(Serialized::defaults(PraxisConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert!(config.mail.is_configured());
        assert_eq!(config.mail.api_key, "mk_123");
        assert_eq!(config.auth.session_ttl_hours, 24);
        assert!(config.auth.cookie_secure);
        assert_eq!(config.auth.cookie_name, "praxis_session");
        Ok(())
    });
}

#[test]
fn project_file_is_picked_up_by_load() {
    Jail::expect_with(|jail| {
        jail.create_dir(".praxis")?;
        jail.create_file(
            ".praxis/config.toml",
            r#"
[server]
public_url = "https://praxis.example"

[calendar]
client_id = "cid"
client_secret = "csecret"
"#,
        )?;

        let config = PraxisConfig::load().map_err(|e| e.to_string())?;
        assert_eq!(config.server.public_url, "https://praxis.example");
        assert!(config.calendar.is_configured());
        assert_eq!(
            config.calendar_redirect_url(),
            "https://praxis.example/api/calendar/callback"
        );
        Ok(())
    });
}

#[test]
fn load_from_reads_explicit_file() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "custom.toml",
            r#"
[database]
path = "/var/lib/praxis/praxis.db"

[tracking]
enabled = false
"#,
        )?;

        let config = PraxisConfig::load_from(std::path::Path::new("custom.toml"))
            .map_err(|e| e.to_string())?;
        assert_eq!(config.database.path, "/var/lib/praxis/praxis.db");
        assert!(!config.tracking.enabled);
        Ok(())
    });
}

#[test]
fn invalid_values_are_rejected_on_load() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "bad.toml",
            r#"
[general]
default_limit = 500
max_limit = 100
"#,
        )?;

        let result = PraxisConfig::load_from(std::path::Path::new("bad.toml"));
        assert!(result.is_err());
        Ok(())
    });
}
