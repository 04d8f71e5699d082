//! Engine-level configuration: load `SystemConfig` from an optional TOML
//! file, overlay environment variable overrides, validate bounds, and
//! assemble runtime `Credentials`. Load, then validate, then refuse to
//! start on failure.

use std::path::Path;

use eatc_common::config::{Credentials, SystemConfig};
use eatc_common::error::EatcError;

/// Everything the engine needs at startup: the validated system config and
/// the credentials read from the environment.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub system: SystemConfig,
    pub credentials: Credentials,
}

/// Load configuration from `path` if it exists (TOML, deserialized over
/// [`SystemConfig::defaults`]), else fall back to built-in defaults; then
/// apply environment overrides and validate. Fails fast on any problem —
/// the engine refuses to start rather than run with an invalid config.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, EatcError> {
    let mut system = match path {
        Some(p) if p.exists() => {
            let content = std::fs::read_to_string(p).map_err(|e| EatcError::Config(format!("reading {}: {e}", p.display())))?;
            toml::from_str(&content).map_err(|e| EatcError::Config(format!("parsing {}: {e}", p.display())))?
        }
        _ => SystemConfig::defaults(),
    };
    system.apply_env_overrides();
    validate(&system)?;

    let credentials = Credentials::from_env();
    Ok(EngineConfig { system, credentials })
}

/// Accumulate every validation failure rather than stopping at the first.
fn validate(config: &SystemConfig) -> Result<(), EatcError> {
    let mut errors: Vec<String> = Vec::new();

    if config.http.pdf.max_mb <= 0.0 {
        errors.push("http.pdf.max_mb must be > 0".into());
    }
    if config.http.pdf.max_pages == 0 {
        errors.push("http.pdf.max_pages must be > 0".into());
    }
    if config.http.circuit_breaker_failures == 0 {
        errors.push("http.circuit_breaker_failures must be > 0".into());
    }
    if config.http.circuit_breaker_cooldown_seconds == 0 {
        errors.push("http.circuit_breaker_cooldown_seconds must be > 0".into());
    }
    if config.http.cache_max_ttl_seconds == 0 || config.http.cache_max_ttl_seconds > 1800 {
        errors.push("http.cache_max_ttl_seconds must be in (0, 1800], capped at 30 min".into());
    }
    if config.http.default_min_interval_secs < 0.0 {
        errors.push("http.default_min_interval_secs must be >= 0".into());
    }
    if config.concurrency.fanout_pool_size == 0 {
        errors.push("concurrency.fanout_pool_size must be > 0".into());
    }
    let t = &config.triangulation;
    if !(0.0..=1.0).contains(&t.paraphrase_threshold_min) || !(0.0..=1.0).contains(&t.paraphrase_threshold_max) {
        errors.push("triangulation paraphrase thresholds must be within [0,1]".into());
    }
    if t.paraphrase_threshold_min > t.paraphrase_threshold_max {
        errors.push("triangulation.paraphrase_threshold_min must be <= paraphrase_threshold_max".into());
    }
    if !(0.0..=1.0).contains(&t.contradiction_tolerance_pct) {
        errors.push("triangulation.contradiction_tolerance_pct must be within [0,1]".into());
    }
    if !(0.0..=1.0).contains(&t.contradiction_fraction_cap) {
        errors.push("triangulation.contradiction_fraction_cap must be within [0,1]".into());
    }
    if config.gates.gates_profile.trim().is_empty() {
        errors.push("gates.gates_profile must not be empty".into());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(EatcError::Validation(errors.join("; ")))
    }
}

/// Validate a `RunRequest` independent of system config — catches the
/// boundary cases of an empty topic or a non-positive budget.
pub fn validate_request(request: &eatc_common::types::RunRequest) -> Result<(), EatcError> {
    if request.topic.trim().is_empty() {
        return Err(EatcError::EmptyTopic);
    }
    if request.budget_seconds == 0 {
        return Err(EatcError::Validation("budget_seconds must be > 0".into()));
    }
    if request.output_dir.trim().is_empty() {
        return Err(EatcError::Validation("output_dir must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        let system = SystemConfig::defaults();
        assert!(validate(&system).is_ok());
    }

    #[test]
    fn zero_pdf_cap_fails_validation() {
        let mut system = SystemConfig::defaults();
        system.http.pdf.max_mb = 0.0;
        assert!(validate(&system).is_err());
    }

    #[test]
    fn empty_topic_request_is_rejected() {
        let request = eatc_common::types::RunRequest {
            topic: "   ".into(),
            intent_hint: None,
            depth: eatc_common::types::Depth::Standard,
            budget_seconds: 60,
            strict: false,
            output_dir: "out".into(),
            providers: None,
        };
        assert!(matches!(validate_request(&request), Err(EatcError::EmptyTopic)));
    }
}
