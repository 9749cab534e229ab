//! Run settings validation

use regex::Regex;

use crate::error::{NickForgeError, Result};
use crate::types::{
    GenerationConfig, RunConfig, MAX_NAME_LENGTH, MAX_PREFIX_LENGTH, MAX_TARGET_COUNT,
    MIN_NAME_LENGTH,
};
use crate::validation_error;

/// Validator for user supplied run settings
pub struct ConfigValidator {
    min_length: usize,
    max_length: usize,
    max_target: usize,
}

impl ConfigValidator {
    /// Create a validator with the default bounds
    pub fn new() -> Self {
        Self {
            min_length: MIN_NAME_LENGTH,
            max_length: MAX_NAME_LENGTH,
            max_target: MAX_TARGET_COUNT,
        }
    }

    /// Strip everything but ASCII letters and fold to lowercase
    pub fn sanitize_prefix(&self, prefix: &str) -> Result<String> {
        let non_letters = Regex::new(r"[^A-Za-z]")
            .map_err(|e| NickForgeError::internal(e.to_string()))?;
        Ok(non_letters.replace_all(prefix.trim(), "").to_lowercase())
    }

    /// Validate generation settings, returning a copy with the prefix sanitized
    pub fn validate_generation(&self, config: &GenerationConfig) -> Result<GenerationConfig> {
        self.validate_lengths(config.min_length, config.max_length)?;

        let prefix = self.sanitize_prefix(&config.prefix)?;
        self.validate_prefix(&prefix, config.max_length)?;

        Ok(GenerationConfig {
            prefix,
            ..config.clone()
        })
    }

    /// Validate the number of names a run should find
    pub fn validate_target(&self, target: usize) -> Result<()> {
        if target == 0 || target > self.max_target {
            return Err(validation_error!(
                "target count must be between 1 and {}, got {}",
                self.max_target,
                target
            ));
        }
        Ok(())
    }

    /// Validate a whole run, returning the normalized configuration
    pub fn validate_run(&self, config: &RunConfig) -> Result<RunConfig> {
        let generation = self.validate_generation(&config.generation)?;
        self.validate_target(config.target_count)?;

        if config.normal_ceiling == 0 || config.turbo_ceiling == 0 {
            return Err(validation_error!("concurrency ceilings must be at least 1"));
        }
        if config.recent_capacity == 0 {
            return Err(validation_error!("recent-history capacity must be at least 1"));
        }
        if config.max_generation_attempts == 0 {
            return Err(validation_error!("generation attempts must be at least 1"));
        }
        if config.stats_interval.is_zero() {
            return Err(validation_error!("stats interval must be greater than zero"));
        }

        Ok(RunConfig {
            generation,
            ..config.clone()
        })
    }

    fn validate_lengths(&self, min: usize, max: usize) -> Result<()> {
        if min < self.min_length || max > self.max_length {
            return Err(validation_error!(
                "name lengths must be between {} and {}, got {}-{}",
                self.min_length,
                self.max_length,
                min,
                max
            ));
        }
        if min > max {
            return Err(validation_error!(
                "min length {} exceeds max length {}",
                min,
                max
            ));
        }
        Ok(())
    }

    fn validate_prefix(&self, prefix: &str, max_length: usize) -> Result<()> {
        if prefix.len() > MAX_PREFIX_LENGTH {
            return Err(validation_error!(
                "prefix '{}' is longer than {} letters",
                prefix,
                MAX_PREFIX_LENGTH
            ));
        }
        if prefix.len() > max_length {
            return Err(validation_error!(
                "prefix '{}' is longer than the max length {}",
                prefix,
                max_length
            ));
        }
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}
