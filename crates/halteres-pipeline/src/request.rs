//! The program generation request and its fail-fast validation.
//!
//! A `ProgramRequest` is created once per run and never mutated. Validation
//! enumerates every required field path in a fixed order and reports the
//! first missing or empty one, before any upstream call is made.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Immutable input for one generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramRequest {
    /// Physical metrics of the client the program is for.
    pub client: ClientMetrics,
    /// Calendar shape of the program.
    pub schedule: Schedule,
    /// Stylistic and constraint fields.
    pub format: WorkoutFormat,
    /// Training environment description.
    pub gym: GymProfile,
    /// Program name and description; feeds the retrieval query.
    pub overview: ProgramOverview,
}

/// Numeric and categorical client attributes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientMetrics {
    /// Client gender, free text.
    pub gender: String,
    /// Height in centimetres.
    pub height_cm: Option<f64>,
    /// Body weight in kilograms.
    pub weight_kg: Option<f64>,
    /// Bench press one-rep max in kilograms.
    pub bench_1rm: Option<f64>,
    /// Back squat one-rep max in kilograms.
    pub squat_1rm: Option<f64>,
    /// Deadlift one-rep max in kilograms.
    pub deadlift_1rm: Option<f64>,
    /// Mile time in minutes, if known.
    pub mile_time: Option<f64>,
}

/// Calendar descriptor for the program.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedule {
    /// First day of the program.
    pub start_date: Option<NaiveDate>,
    /// Program length in weeks. Must be positive.
    pub duration_weeks: u32,
    /// Active weekdays, e.g. `["Monday", "Wednesday", "Friday"]`. Must be
    /// non-empty; its length is the expected workout count per week.
    pub training_days: Vec<String>,
    /// Session length in minutes.
    pub session_minutes: u32,
}

/// Stylistic and constraint fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkoutFormat {
    /// Training style tags, e.g. `["AMRAP", "EMOM"]`.
    pub format: Vec<String>,
    /// Focus area tags, e.g. `["Strength", "Conditioning"]`.
    pub focus: Vec<String>,
    /// Free-text program instructions.
    pub instructions: Option<String>,
    /// Free-text injuries and movement restrictions.
    pub restrictions: Option<String>,
}

/// Training environment description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GymProfile {
    /// Available equipment, free text.
    pub equipment: String,
    /// Space description, if notable.
    pub space: Option<String>,
}

/// Program identity, used for retrieval and prompt framing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramOverview {
    /// Program name.
    pub name: String,
    /// Program description.
    pub description: String,
}

impl ProgramRequest {
    /// Validates every required field path, in order.
    ///
    /// # Errors
    /// Returns `PipelineError::InvalidRequest` naming the first missing or
    /// empty required field.
    pub fn validate(&self) -> Result<()> {
        require_text("client.gender", &self.client.gender)?;
        require_number("client.height_cm", self.client.height_cm)?;
        require_number("client.weight_kg", self.client.weight_kg)?;
        require_number("client.bench_1rm", self.client.bench_1rm)?;
        require_number("client.squat_1rm", self.client.squat_1rm)?;
        require_number("client.deadlift_1rm", self.client.deadlift_1rm)?;

        if self.schedule.start_date.is_none() {
            return Err(missing("schedule.start_date"));
        }
        if self.schedule.duration_weeks == 0 {
            return Err(missing("schedule.duration_weeks"));
        }
        if self.schedule.training_days.iter().all(|d| d.trim().is_empty()) {
            return Err(missing("schedule.training_days"));
        }
        if self.schedule.session_minutes == 0 {
            return Err(missing("schedule.session_minutes"));
        }

        if self.format.format.iter().all(|f| f.trim().is_empty()) {
            return Err(missing("format.format"));
        }
        if self.format.focus.iter().all(|f| f.trim().is_empty()) {
            return Err(missing("format.focus"));
        }

        require_text("gym.equipment", &self.gym.equipment)?;
        Ok(())
    }

    /// Expected workouts per week, from the active weekday count.
    pub fn workouts_per_week(&self) -> usize {
        self.schedule.training_days.len()
    }
}

fn missing(field: &str) -> PipelineError {
    PipelineError::InvalidRequest { field: field.to_string() }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(missing(field));
    }
    Ok(())
}

fn require_number(field: &str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if v > 0.0 => Ok(()),
        _ => Err(missing(field)),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn valid_request() -> ProgramRequest {
        ProgramRequest {
            client: ClientMetrics {
                gender: "female".to_string(),
                height_cm: Some(170.0),
                weight_kg: Some(65.0),
                bench_1rm: Some(60.0),
                squat_1rm: Some(90.0),
                deadlift_1rm: Some(110.0),
                mile_time: None,
            },
            schedule: Schedule {
                start_date: NaiveDate::from_ymd_opt(2025, 3, 3),
                duration_weeks: 4,
                training_days: vec![
                    "Monday".to_string(),
                    "Wednesday".to_string(),
                    "Friday".to_string(),
                ],
                session_minutes: 60,
            },
            format: WorkoutFormat {
                format: vec!["AMRAP".to_string(), "EMOM".to_string()],
                focus: vec!["Strength".to_string()],
                instructions: None,
                restrictions: Some("left knee, no box jumps".to_string()),
            },
            gym: GymProfile {
                equipment: "barbell, rower, pull-up rig".to_string(),
                space: None,
            },
            overview: ProgramOverview {
                name: "Spring Strength Block".to_string(),
                description: "Four-week strength-biased cycle".to_string(),
            },
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn test_empty_gender_fails() {
        let mut req = valid_request();
        req.client.gender = "  ".to_string();
        let err = req.validate().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRequest { field } if field == "client.gender"));
    }

    #[test]
    fn test_missing_strength_max_fails() {
        let mut req = valid_request();
        req.client.squat_1rm = None;
        let err = req.validate().unwrap_err();
        assert!(
            matches!(err, PipelineError::InvalidRequest { field } if field == "client.squat_1rm")
        );
    }

    #[test]
    fn test_zero_duration_fails() {
        let mut req = valid_request();
        req.schedule.duration_weeks = 0;
        let err = req.validate().unwrap_err();
        assert!(
            matches!(err, PipelineError::InvalidRequest { field } if field == "schedule.duration_weeks")
        );
    }

    #[test]
    fn test_empty_training_days_fails() {
        let mut req = valid_request();
        req.schedule.training_days.clear();
        let err = req.validate().unwrap_err();
        assert!(
            matches!(err, PipelineError::InvalidRequest { field } if field == "schedule.training_days")
        );
    }

    #[test]
    fn test_blank_training_days_fail() {
        let mut req = valid_request();
        req.schedule.training_days = vec!["".to_string(), " ".to_string()];
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_missing_equipment_fails() {
        let mut req = valid_request();
        req.gym.equipment = String::new();
        let err = req.validate().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRequest { field } if field == "gym.equipment"));
    }

    #[test]
    fn test_validation_order_reports_first_failure() {
        let mut req = valid_request();
        req.client.gender = String::new();
        req.gym.equipment = String::new();
        let err = req.validate().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRequest { field } if field == "client.gender"));
    }

    #[test]
    fn test_deserializes_with_missing_sections() {
        // Sparse payloads deserialize; validation is what rejects them.
        let req: ProgramRequest = serde_json::from_str(r#"{"overview":{"name":"x"}}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_workouts_per_week() {
        assert_eq!(valid_request().workouts_per_week(), 3);
    }
}
