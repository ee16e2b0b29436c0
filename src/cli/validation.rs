//! CLI argument validation functions
//!
//! This module provides custom validation functions for CLI arguments
//! that go beyond what clap can validate automatically.

use std::fs;
use std::path::PathBuf;

/// Validate that a file path is accessible (exists and is readable)
pub fn validate_config_file_path(path_str: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(format!("Configuration file does not exist: '{}'", path_str));
    }

    if !path.is_file() {
        return Err(format!("Configuration path is not a file: '{}'", path_str));
    }

    match fs::File::open(&path) {
        Ok(_) => Ok(path),
        Err(e) => Err(format!("Cannot read configuration file '{}': {}", path_str, e)),
    }
}

/// Validate rollback steps is a positive number
pub fn validate_rollback_steps(steps_str: &str) -> Result<u32, String> {
    let steps: u32 = steps_str.parse().map_err(|_| {
        format!(
            "Rollback steps must be a valid positive number, got: '{}'",
            steps_str
        )
    })?;

    if steps == 0 {
        return Err("Rollback steps must be greater than 0".to_string());
    }

    // Reasonable upper limit to prevent accidental mass rollbacks
    if steps > 100 {
        return Err("Rollback steps cannot exceed 100 for safety reasons".to_string());
    }

    Ok(steps)
}

/// Validate worker loop count (1-64)
pub fn validate_worker_loops(loops_str: &str) -> Result<usize, String> {
    let loops: usize = loops_str
        .parse()
        .map_err(|_| format!("Worker loops must be a valid number, got: '{}'", loops_str))?;

    if loops == 0 {
        return Err("At least one worker loop is required".to_string());
    }

    if loops > 64 {
        return Err("Worker loops cannot exceed 64".to_string());
    }

    Ok(loops)
}

/// Validate a send rate (messages/minute, positive)
pub fn validate_send_rate(rate_str: &str) -> Result<i32, String> {
    let rate: i32 = rate_str
        .parse()
        .map_err(|_| format!("Send rate must be a valid number, got: '{}'", rate_str))?;

    if rate <= 0 {
        return Err("Send rate must be greater than 0".to_string());
    }

    Ok(rate)
}

/// Validate a worker identity: non-empty, no whitespace, and no `-<digits>`
/// ambiguity with the per-loop suffix is enforced elsewhere.
pub fn validate_worker_id(id_str: &str) -> Result<String, String> {
    let id = id_str.trim();

    if id.is_empty() {
        return Err("Worker id cannot be empty".to_string());
    }

    if id.contains(char::is_whitespace) {
        return Err("Worker id cannot contain whitespace".to_string());
    }

    if id.len() > 200 {
        return Err("Worker id is too long (maximum 200 characters)".to_string());
    }

    Ok(id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rollback_steps_validation_valid() {
        let valid_steps = ["1", "5", "10", "50", "100"];

        for steps_str in valid_steps {
            let result = validate_rollback_steps(steps_str);
            assert!(result.is_ok(), "Steps {} should be valid", steps_str);
        }
    }

    #[test]
    fn test_rollback_steps_validation_invalid() {
        let invalid_steps = ["0", "101", "999", "-1", "abc", ""];

        for steps_str in invalid_steps {
            let result = validate_rollback_steps(steps_str);
            assert!(result.is_err(), "Steps '{}' should be invalid", steps_str);
        }
    }

    #[test]
    fn test_worker_loops_bounds() {
        assert!(validate_worker_loops("1").is_ok());
        assert!(validate_worker_loops("64").is_ok());
        assert!(validate_worker_loops("0").is_err());
        assert!(validate_worker_loops("65").is_err());
        assert!(validate_worker_loops("many").is_err());
    }

    #[test]
    fn test_send_rate_must_be_positive() {
        assert_eq!(validate_send_rate("600"), Ok(600));
        assert!(validate_send_rate("0").is_err());
        assert!(validate_send_rate("-5").is_err());
        assert!(validate_send_rate("fast").is_err());
    }

    #[test]
    fn test_worker_id_shape() {
        assert_eq!(validate_worker_id("host-a"), Ok("host-a".to_string()));
        assert!(validate_worker_id("").is_err());
        assert!(validate_worker_id("has space").is_err());
        assert!(validate_worker_id(&"x".repeat(300)).is_err());
    }
}
