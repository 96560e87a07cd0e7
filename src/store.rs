use std::fmt;
use std::rc::Rc;

use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::model::{Course, Exam, Exercise};

/// Error carried by every rejected resource-client outcome. The controller
/// treats all rejections uniformly, so the code only matters for IPC
/// responses and logs.
#[derive(Debug, Clone)]
pub struct StoreError {
    pub code: &'static str,
    pub message: String,
}

impl StoreError {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for StoreError {}

fn query_err(e: rusqlite::Error) -> StoreError {
    StoreError::new("db_query_failed", e.to_string())
}

fn write_err(e: rusqlite::Error) -> StoreError {
    StoreError::new("db_write_failed", e.to_string())
}

fn now_stamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub id: String,
    pub sort_order: i64,
}

/// CRUD + reorder contract shared by the two graded collections. The backend
/// assigns `id` and `sort_order` on create and returns the canonical record;
/// `get_by_course` returns rows ordered by `sort_order` ascending.
pub trait ResourceClient {
    type Record;
    type Fields;

    fn get_by_course(&self, course_id: &str) -> Result<Vec<Self::Record>, StoreError>;
    fn create(&self, course_id: &str, fields: &Self::Fields) -> Result<Self::Record, StoreError>;
    fn update(&self, id: &str, fields: &Self::Fields) -> Result<(), StoreError>;
    fn delete(&self, id: &str) -> Result<(), StoreError>;
    fn reorder(&self, order: &[SortKey]) -> Result<(), StoreError>;
}

pub type ExerciseClient = dyn ResourceClient<Record = Exercise, Fields = ExerciseFields>;
pub type ExamClient = dyn ResourceClient<Record = Exam, Fields = ExamFields>;

/// The editable field-set persisted by an exercise update. An inline edit
/// always writes the whole set, not just the changed field.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseFields {
    pub exercise_number: i64,
    pub points_earned: Option<f64>,
    pub points_possible: Option<f64>,
    pub notes: String,
}

impl From<&Exercise> for ExerciseFields {
    fn from(ex: &Exercise) -> Self {
        Self {
            exercise_number: ex.exercise_number,
            points_earned: ex.points_earned,
            points_possible: ex.points_possible,
            notes: ex.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExamFields {
    pub exam_name: String,
    pub grade: Option<f64>,
    pub max_grade: Option<f64>,
    pub weight: Option<f64>,
    pub exam_date: Option<String>,
}

impl From<&Exam> for ExamFields {
    fn from(xm: &Exam) -> Self {
        Self {
            exam_name: xm.exam_name.clone(),
            grade: xm.grade,
            max_grade: xm.max_grade,
            weight: xm.weight,
            exam_date: xm.exam_date.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CourseFields {
    pub name: String,
    pub semester: Option<String>,
    pub credits: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CourseSummary {
    pub course: Course,
    pub exercise_count: i64,
    pub exam_count: i64,
}

/// Backend half of the course manager: the list of courses and their
/// lifecycle. Selection and modal UX stay with the front-end.
pub trait CourseStore {
    fn list(&self) -> Result<Vec<Course>, StoreError>;
    fn get(&self, id: &str) -> Result<Option<Course>, StoreError>;
    fn create(&self, fields: &CourseFields) -> Result<Course, StoreError>;
    fn update(&self, id: &str, fields: &CourseFields) -> Result<Course, StoreError>;
    /// Deletes the course and everything it owns.
    fn delete(&self, id: &str) -> Result<(), StoreError>;
    fn overview(&self) -> Result<Vec<CourseSummary>, StoreError>;
}

fn next_sort_order(conn: &Connection, table: &str, course_id: &str) -> Result<i64, StoreError> {
    let sql = format!(
        "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM {} WHERE course_id = ?",
        table
    );
    conn.query_row(&sql, [course_id], |r| r.get(0))
        .map_err(query_err)
}

fn apply_reorder(conn: &Connection, table: &str, order: &[SortKey]) -> Result<(), StoreError> {
    let tx = conn
        .unchecked_transaction()
        .map_err(|e| StoreError::new("db_tx_failed", e.to_string()))?;
    let sql = format!(
        "UPDATE {} SET sort_order = ?, updated_at = ? WHERE id = ?",
        table
    );
    let stamp = now_stamp();
    for key in order {
        let changed = tx
            .execute(&sql, (key.sort_order, &stamp, &key.id))
            .map_err(write_err)?;
        if changed == 0 {
            let _ = tx.rollback();
            return Err(StoreError::new(
                "not_found",
                format!("no row with id {} in {}", key.id, table),
            ));
        }
    }
    tx.commit()
        .map_err(|e| StoreError::new("db_commit_failed", e.to_string()))
}

pub struct SqliteExercises {
    pub conn: Rc<Connection>,
}

impl ResourceClient for SqliteExercises {
    type Record = Exercise;
    type Fields = ExerciseFields;

    fn get_by_course(&self, course_id: &str) -> Result<Vec<Exercise>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, course_id, exercise_number, points_earned, points_possible,
                        notes, sort_order
                 FROM exercises
                 WHERE course_id = ?
                 ORDER BY sort_order",
            )
            .map_err(query_err)?;
        stmt.query_map([course_id], |r| {
            Ok(Exercise {
                id: r.get(0)?,
                course_id: r.get(1)?,
                exercise_number: r.get(2)?,
                points_earned: r.get(3)?,
                points_possible: r.get(4)?,
                notes: r.get(5)?,
                sort_order: r.get(6)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(query_err)
    }

    fn create(&self, course_id: &str, fields: &ExerciseFields) -> Result<Exercise, StoreError> {
        let id = Uuid::new_v4().to_string();
        let sort_order = next_sort_order(&self.conn, "exercises", course_id)?;
        self.conn
            .execute(
                "INSERT INTO exercises(id, course_id, exercise_number, points_earned,
                                       points_possible, notes, sort_order, updated_at)
                 VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
                (
                    &id,
                    course_id,
                    fields.exercise_number,
                    fields.points_earned,
                    fields.points_possible,
                    &fields.notes,
                    sort_order,
                    now_stamp(),
                ),
            )
            .map_err(write_err)?;
        Ok(Exercise {
            id,
            course_id: course_id.to_string(),
            exercise_number: fields.exercise_number,
            points_earned: fields.points_earned,
            points_possible: fields.points_possible,
            notes: fields.notes.clone(),
            sort_order,
        })
    }

    fn update(&self, id: &str, fields: &ExerciseFields) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute(
                "UPDATE exercises
                 SET exercise_number = ?, points_earned = ?, points_possible = ?,
                     notes = ?, updated_at = ?
                 WHERE id = ?",
                (
                    fields.exercise_number,
                    fields.points_earned,
                    fields.points_possible,
                    &fields.notes,
                    now_stamp(),
                    id,
                ),
            )
            .map_err(write_err)?;
        if changed == 0 {
            return Err(StoreError::new("not_found", "exercise not found"));
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM exercises WHERE id = ?", [id])
            .map_err(write_err)?;
        if changed == 0 {
            return Err(StoreError::new("not_found", "exercise not found"));
        }
        Ok(())
    }

    fn reorder(&self, order: &[SortKey]) -> Result<(), StoreError> {
        apply_reorder(&self.conn, "exercises", order)
    }
}

pub struct SqliteExams {
    pub conn: Rc<Connection>,
}

impl ResourceClient for SqliteExams {
    type Record = Exam;
    type Fields = ExamFields;

    fn get_by_course(&self, course_id: &str) -> Result<Vec<Exam>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, course_id, exam_name, grade, max_grade, weight, exam_date, sort_order
                 FROM exams
                 WHERE course_id = ?
                 ORDER BY sort_order",
            )
            .map_err(query_err)?;
        stmt.query_map([course_id], |r| {
            Ok(Exam {
                id: r.get(0)?,
                course_id: r.get(1)?,
                exam_name: r.get(2)?,
                grade: r.get(3)?,
                max_grade: r.get(4)?,
                weight: r.get(5)?,
                exam_date: r.get(6)?,
                sort_order: r.get(7)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(query_err)
    }

    fn create(&self, course_id: &str, fields: &ExamFields) -> Result<Exam, StoreError> {
        let id = Uuid::new_v4().to_string();
        let sort_order = next_sort_order(&self.conn, "exams", course_id)?;
        self.conn
            .execute(
                "INSERT INTO exams(id, course_id, exam_name, grade, max_grade, weight,
                                   exam_date, sort_order, updated_at)
                 VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
                (
                    &id,
                    course_id,
                    &fields.exam_name,
                    fields.grade,
                    fields.max_grade,
                    fields.weight,
                    &fields.exam_date,
                    sort_order,
                    now_stamp(),
                ),
            )
            .map_err(write_err)?;
        Ok(Exam {
            id,
            course_id: course_id.to_string(),
            exam_name: fields.exam_name.clone(),
            grade: fields.grade,
            max_grade: fields.max_grade,
            weight: fields.weight,
            exam_date: fields.exam_date.clone(),
            sort_order,
        })
    }

    fn update(&self, id: &str, fields: &ExamFields) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute(
                "UPDATE exams
                 SET exam_name = ?, grade = ?, max_grade = ?, weight = ?,
                     exam_date = ?, updated_at = ?
                 WHERE id = ?",
                (
                    &fields.exam_name,
                    fields.grade,
                    fields.max_grade,
                    fields.weight,
                    &fields.exam_date,
                    now_stamp(),
                    id,
                ),
            )
            .map_err(write_err)?;
        if changed == 0 {
            return Err(StoreError::new("not_found", "exam not found"));
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute("DELETE FROM exams WHERE id = ?", [id])
            .map_err(write_err)?;
        if changed == 0 {
            return Err(StoreError::new("not_found", "exam not found"));
        }
        Ok(())
    }

    fn reorder(&self, order: &[SortKey]) -> Result<(), StoreError> {
        apply_reorder(&self.conn, "exams", order)
    }
}

pub struct SqliteCourses {
    pub conn: Rc<Connection>,
}

impl CourseStore for SqliteCourses {
    fn list(&self) -> Result<Vec<Course>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, semester, credits FROM courses ORDER BY name")
            .map_err(query_err)?;
        stmt.query_map([], |r| {
            Ok(Course {
                id: r.get(0)?,
                name: r.get(1)?,
                semester: r.get(2)?,
                credits: r.get(3)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(query_err)
    }

    fn get(&self, id: &str) -> Result<Option<Course>, StoreError> {
        self.conn
            .query_row(
                "SELECT id, name, semester, credits FROM courses WHERE id = ?",
                [id],
                |r| {
                    Ok(Course {
                        id: r.get(0)?,
                        name: r.get(1)?,
                        semester: r.get(2)?,
                        credits: r.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(query_err)
    }

    fn create(&self, fields: &CourseFields) -> Result<Course, StoreError> {
        let name = fields.name.trim();
        if name.is_empty() {
            return Err(StoreError::new("bad_params", "name must not be empty"));
        }
        let id = Uuid::new_v4().to_string();
        self.conn
            .execute(
                "INSERT INTO courses(id, name, semester, credits, updated_at)
                 VALUES(?, ?, ?, ?, ?)",
                (&id, name, &fields.semester, fields.credits, now_stamp()),
            )
            .map_err(write_err)?;
        Ok(Course {
            id,
            name: name.to_string(),
            semester: fields.semester.clone(),
            credits: fields.credits,
        })
    }

    fn update(&self, id: &str, fields: &CourseFields) -> Result<Course, StoreError> {
        let name = fields.name.trim();
        if name.is_empty() {
            return Err(StoreError::new("bad_params", "name must not be empty"));
        }
        let changed = self
            .conn
            .execute(
                "UPDATE courses SET name = ?, semester = ?, credits = ?, updated_at = ?
                 WHERE id = ?",
                (name, &fields.semester, fields.credits, now_stamp(), id),
            )
            .map_err(write_err)?;
        if changed == 0 {
            return Err(StoreError::new("not_found", "course not found"));
        }
        Ok(Course {
            id: id.to_string(),
            name: name.to_string(),
            semester: fields.semester.clone(),
            credits: fields.credits,
        })
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let exists: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM courses WHERE id = ?", [id], |r| r.get(0))
            .optional()
            .map_err(query_err)?;
        if exists.is_none() {
            return Err(StoreError::new("not_found", "course not found"));
        }

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| StoreError::new("db_tx_failed", e.to_string()))?;

        // Delete in dependency order; no ON DELETE CASCADE in the schema.
        for sql in [
            "DELETE FROM exercises WHERE course_id = ?",
            "DELETE FROM exams WHERE course_id = ?",
            "DELETE FROM courses WHERE id = ?",
        ] {
            if let Err(e) = tx.execute(sql, [id]) {
                let _ = tx.rollback();
                return Err(StoreError::new("db_delete_failed", e.to_string()));
            }
        }

        tx.commit()
            .map_err(|e| StoreError::new("db_commit_failed", e.to_string()))
    }

    fn overview(&self) -> Result<Vec<CourseSummary>, StoreError> {
        // Correlated subqueries avoid double-counting from joins.
        let mut stmt = self
            .conn
            .prepare(
                "SELECT
                   c.id,
                   c.name,
                   c.semester,
                   c.credits,
                   (SELECT COUNT(*) FROM exercises e WHERE e.course_id = c.id) AS exercise_count,
                   (SELECT COUNT(*) FROM exams x WHERE x.course_id = c.id) AS exam_count
                 FROM courses c
                 ORDER BY c.name",
            )
            .map_err(query_err)?;
        stmt.query_map([], |r| {
            Ok(CourseSummary {
                course: Course {
                    id: r.get(0)?,
                    name: r.get(1)?,
                    semester: r.get(2)?,
                    credits: r.get(3)?,
                },
                exercise_count: r.get(4)?,
                exam_count: r.get(5)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(query_err)
    }
}
