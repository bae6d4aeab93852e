//! Configuration validation

use crate::schema::{RawConfig, RawRule};
use clocklock_util::Domain;
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Rule '{domain}': {message}")]
    RuleError { domain: String, message: String },

    #[error("Duplicate rule for domain: {0}")]
    DuplicateDomain(String),

    #[error("Global config error: {0}")]
    GlobalError(String),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.daemon.requests_per_second == Some(0) {
        errors.push(ValidationError::GlobalError(
            "requests_per_second must be at least 1".into(),
        ));
    }

    if let Some(domain) = &config.daemon.bootstrap_domain
        && Domain::new(domain).is_empty()
    {
        errors.push(ValidationError::GlobalError(
            "bootstrap_domain cannot be empty".into(),
        ));
    }

    // Duplicates are judged after normalization, so `www.a.com` clashes with `a.com`
    let mut seen = HashSet::new();
    for rule in &config.rules {
        let domain = Domain::new(&rule.domain);
        if !domain.is_empty() && !seen.insert(domain.clone()) {
            errors.push(ValidationError::DuplicateDomain(domain.to_string()));
        }
    }

    for rule in &config.rules {
        errors.extend(validate_rule(rule));
    }

    errors
}

fn validate_rule(rule: &RawRule) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let domain = Domain::from_url_or_host(&rule.domain);
    if domain.is_empty() {
        errors.push(ValidationError::RuleError {
            domain: rule.domain.clone(),
            message: "domain cannot be empty".into(),
        });
    } else if domain.as_str() != Domain::new(&rule.domain).as_str() {
        errors.push(ValidationError::RuleError {
            domain: rule.domain.clone(),
            message: format!("expected a bare hostname, did you mean '{}'?", domain),
        });
    }

    errors
}
