use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub semester: Option<String>,
    pub credits: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub course_id: String,
    pub exercise_number: i64,
    pub points_earned: Option<f64>,
    pub points_possible: Option<f64>,
    pub notes: String,
    pub sort_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exam {
    pub id: String,
    pub course_id: String,
    pub exam_name: String,
    pub grade: Option<f64>,
    pub max_grade: Option<f64>,
    pub weight: Option<f64>,
    pub exam_date: Option<String>,
    pub sort_order: i64,
}

#[derive(Debug)]
pub struct EditError {
    pub message: String,
}

impl EditError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

fn as_number(field: &str, value: &serde_json::Value) -> Result<f64, EditError> {
    value
        .as_f64()
        .ok_or_else(|| EditError::new(format!("{} must be a number", field)))
}

fn as_nullable_number(field: &str, value: &serde_json::Value) -> Result<Option<f64>, EditError> {
    if value.is_null() {
        return Ok(None);
    }
    as_number(field, value).map(Some)
}

fn as_text(field: &str, value: &serde_json::Value) -> Result<String, EditError> {
    value
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| EditError::new(format!("{} must be a string", field)))
}

impl Exercise {
    /// Applies an inline grid edit. Only basic numeric typing is enforced;
    /// the grid owns everything beyond that.
    pub fn set_field(&mut self, field: &str, value: &serde_json::Value) -> Result<(), EditError> {
        match field {
            "exercise_number" => {
                let n = as_number(field, value)?;
                self.exercise_number = n as i64;
            }
            "points_earned" => self.points_earned = as_nullable_number(field, value)?,
            "points_possible" => self.points_possible = as_nullable_number(field, value)?,
            "notes" => self.notes = as_text(field, value)?,
            other => return Err(EditError::new(format!("unknown exercise field: {}", other))),
        }
        Ok(())
    }
}

impl Exam {
    pub fn set_field(&mut self, field: &str, value: &serde_json::Value) -> Result<(), EditError> {
        match field {
            "exam_name" => self.exam_name = as_text(field, value)?,
            "grade" => self.grade = as_nullable_number(field, value)?,
            "max_grade" => self.max_grade = as_nullable_number(field, value)?,
            "weight" => self.weight = as_nullable_number(field, value)?,
            "exam_date" => {
                self.exam_date = if value.is_null() {
                    None
                } else {
                    Some(as_text(field, value)?)
                };
            }
            other => return Err(EditError::new(format!("unknown exam field: {}", other))),
        }
        Ok(())
    }
}
