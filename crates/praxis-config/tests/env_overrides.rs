use figment::Jail;
use praxis_config::PraxisConfig;

#[test]
fn env_vars_map_to_nested_keys() {
    Jail::expect_with(|jail| {
        jail.set_env("PRAXIS_MAIL__API_KEY", "mk_env");
        jail.set_env("PRAXIS_SERVER__BIND", "0.0.0.0:8080");
        jail.set_env("PRAXIS_PAYMENTS__WEBHOOK_SECRET", "whsec_env");

        let config = PraxisConfig::load().map_err(|e| e.to_string())?;
        assert_eq!(config.mail.api_key, "mk_env");
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert!(config.payments.is_configured());
        Ok(())
    });
}

#[test]
fn env_beats_explicit_file() {
    Jail::expect_with(|jail| {
        jail.create_file("custom.toml", "[llm]\nmodel = \"from-file\"\n")?;
        jail.set_env("PRAXIS_LLM__MODEL", "from-env");

        let config = PraxisConfig::load_from(std::path::Path::new("custom.toml"))
            .map_err(|e| e.to_string())?;
        assert_eq!(config.llm.model, "from-env");
        Ok(())
    });
}
