use super::Config;

/// Sanity checks run once at startup, before the reactor is brought up.
/// Mirrors the teacher's `config::validate` returning a list of errors
/// rather than failing on the first one, so an operator fixes the config
/// in a single pass.
pub fn validate(config: &Config) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if config.server.hub_name.trim().is_empty() {
        errors.push("server.hub_name must not be empty".to_string());
    }
    if config.nick.min_len == 0 {
        errors.push("nick.min_len must be at least 1".to_string());
    }
    if config.nick.min_len > config.nick.max_len {
        errors.push("nick.min_len must not exceed nick.max_len".to_string());
    }
    if config.limits.max_unblock_size >= config.limits.max_outfill_size {
        errors.push("limits.max_unblock_size must be less than max_outfill_size".to_string());
    }
    if config.limits.max_outfill_size >= config.limits.max_outbuf_size {
        errors.push("limits.max_outfill_size must be less than max_outbuf_size".to_string());
    }
    if config.limits.min_share_size > config.limits.max_share_size {
        errors.push("limits.min_share_size must not exceed max_share_size".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn empty_hub_name_is_rejected() {
        let mut cfg = Config::default();
        cfg.server.hub_name = "".to_string();
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn backpressure_thresholds_must_be_ordered() {
        let mut cfg = Config::default();
        cfg.limits.max_unblock_size = cfg.limits.max_outfill_size;
        assert!(validate(&cfg).is_err());
    }
}
