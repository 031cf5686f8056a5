//! Scheduled sweep and trial configuration.

use serde::Deserialize;

use super::error::ValidationError;

fn default_trial_days() -> i64 {
    14
}

fn default_reminder_days() -> Vec<u32> {
    vec![7, 3, 1]
}

/// Trial length and sweep reminder thresholds.
#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    /// Length of the admin trial in days.
    #[serde(default = "default_trial_days")]
    pub trial_days: i64,

    /// Days-remaining thresholds at which trial reminders are sent.
    #[serde(default = "default_reminder_days")]
    pub reminder_days: Vec<u32>,
}

impl SweepConfig {
    /// Validate sweep configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(1..=365).contains(&self.trial_days) {
            return Err(ValidationError::OutOfRange {
                field: "trial_days",
                min: 1,
                max: 365,
                actual: self.trial_days,
            });
        }
        for &days in &self.reminder_days {
            if i64::from(days) >= self.trial_days {
                return Err(ValidationError::OutOfRange {
                    field: "reminder_days",
                    min: 0,
                    max: self.trial_days - 1,
                    actual: i64::from(days),
                });
            }
        }
        Ok(())
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            trial_days: default_trial_days(),
            reminder_days: default_reminder_days(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = SweepConfig::default();
        assert_eq!(cfg.trial_days, 14);
        assert_eq!(cfg.reminder_days, vec![7, 3, 1]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_zero_trial_days() {
        let cfg = SweepConfig {
            trial_days: 0,
            ..SweepConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_reminder_beyond_trial_length() {
        let cfg = SweepConfig {
            trial_days: 7,
            reminder_days: vec![7],
        };
        assert!(cfg.validate().is_err());
    }
}
