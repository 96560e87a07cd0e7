use serde_json::{json, Value};
use tracing::error;

use crate::calc;
use crate::grid::{exam_columns, exercise_columns, GridView};
use crate::model::{Course, EditError, Exam, Exercise};
use crate::store::{
    CourseStore, CourseSummary, ExamClient, ExamFields, ExerciseClient, ExerciseFields, SortKey,
    StoreError,
};

/// Injected confirmation/notification capability, standing in for the
/// front-end's blocking dialogs so the controller stays testable.
pub trait Prompter {
    fn confirm(&mut self, message: &str) -> bool;
    fn notify(&mut self, message: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Welcome,
    Course,
    Overview,
}

impl View {
    pub fn as_str(&self) -> &'static str {
        match self {
            View::Welcome => "welcome",
            View::Course => "course",
            View::Overview => "overview",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Exercises,
    Exams,
}

impl Tab {
    pub fn parse(s: &str) -> Option<Tab> {
        match s {
            "exercises" => Some(Tab::Exercises),
            "exams" => Some(Tab::Exams),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Exercises => "exercises",
            Tab::Exams => "exams",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseHeader {
    pub name: String,
    pub semester: String,
    pub credits: String,
}

impl CourseHeader {
    fn from_course(course: &Course) -> Self {
        Self {
            name: course.name.clone(),
            semester: course.semester.clone().unwrap_or_default(),
            credits: course
                .credits
                .map(|n| format!("{} ECTS", n))
                .unwrap_or_default(),
        }
    }
}

/// Display strings for the stats panel, recomputed after the initial load and
/// after every successful mutation on either collection.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsView {
    pub total_points: String,
    pub exercise_percentage: String,
    pub average_grade: String,
    pub weighted_average: String,
}

impl Default for StatsView {
    fn default() -> Self {
        Self {
            total_points: "0.00 / 0.00".to_string(),
            exercise_percentage: "0.00%".to_string(),
            average_grade: "-".to_string(),
            weighted_average: "-".to_string(),
        }
    }
}

/// Application controller. Owns the only mutable in-memory copy of the
/// selected course's exercise and exam collections; the grids are pure render
/// targets fed from here and hand control back through the edit/delete/reorder
/// entry points.
pub struct GradeTracker {
    courses: Box<dyn CourseStore>,
    exercise_api: Box<ExerciseClient>,
    exam_api: Box<ExamClient>,

    view: View,
    tab: Tab,
    header: CourseHeader,
    current_course: Option<Course>,
    exercises: Vec<Exercise>,
    exams: Vec<Exam>,
    exercise_grid: Option<GridView>,
    exam_grid: Option<GridView>,
    overview: Vec<CourseSummary>,
    stats: StatsView,
}

impl GradeTracker {
    pub fn new(
        courses: Box<dyn CourseStore>,
        exercise_api: Box<ExerciseClient>,
        exam_api: Box<ExamClient>,
    ) -> Self {
        Self {
            courses,
            exercise_api,
            exam_api,
            view: View::Welcome,
            tab: Tab::Exercises,
            header: CourseHeader::default(),
            current_course: None,
            exercises: Vec::new(),
            exams: Vec::new(),
            exercise_grid: None,
            exam_grid: None,
            overview: Vec::new(),
            stats: StatsView::default(),
        }
    }

    #[cfg(test)]
    pub fn view(&self) -> View {
        self.view
    }

    #[cfg(test)]
    pub fn current_course(&self) -> Option<&Course> {
        self.current_course.as_ref()
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn exams(&self) -> &[Exam] {
        &self.exams
    }

    #[cfg(test)]
    pub fn stats(&self) -> &StatsView {
        &self.stats
    }

    pub fn course_list(&self) -> Result<Vec<Course>, StoreError> {
        self.courses.list()
    }

    pub fn create_course(&mut self, fields: &crate::store::CourseFields) -> Result<Course, StoreError> {
        let course = self.courses.create(fields)?;
        self.course_list_changed();
        Ok(course)
    }

    pub fn update_course(
        &mut self,
        id: &str,
        fields: &crate::store::CourseFields,
    ) -> Result<Course, StoreError> {
        let course = self.courses.update(id, fields)?;
        self.course_list_changed();
        Ok(course)
    }

    // ---- course selection & view switching ----

    pub fn select_course_by_id(&mut self, course_id: &str) -> Result<(), StoreError> {
        let course = self
            .courses
            .get(course_id)?
            .ok_or_else(|| StoreError::new("not_found", "course not found"))?;
        self.select_course(course);
        Ok(())
    }

    pub fn select_course(&mut self, course: Course) {
        self.view = View::Course;
        self.header = CourseHeader::from_course(&course);

        // The previous course's collections are discarded, never cached.
        self.load_exercises(&course.id);
        self.load_exams(&course.id);

        self.render_exercise_grid();
        self.render_exam_grid();
        self.update_stats();

        self.current_course = Some(course);
    }

    /// Called after the course list changed without a new selection (e.g. a
    /// course was edited). Refreshes the header if the selected course still
    /// exists; otherwise leaves everything untouched.
    pub fn course_list_changed(&mut self) {
        let Some(current) = self.current_course.as_ref() else {
            return;
        };
        match self.courses.list() {
            Ok(list) => {
                if let Some(course) = list.into_iter().find(|c| c.id == current.id) {
                    self.header = CourseHeader::from_course(&course);
                    self.current_course = Some(course);
                }
            }
            Err(e) => error!("failed to refresh course list: {}", e),
        }
    }

    pub fn show_overview(&mut self) {
        self.view = View::Overview;
        match self.courses.overview() {
            Ok(rows) => self.overview = rows,
            Err(e) => {
                error!("failed to load overview: {}", e);
                self.overview = Vec::new();
            }
        }
    }

    pub fn show_welcome(&mut self) {
        self.view = View::Welcome;
    }

    /// Purely presentational; no data reload, no stats recompute.
    pub fn switch_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    pub fn delete_current_course(&mut self, ui: &mut dyn Prompter) {
        let Some(course) = self.current_course.clone() else {
            return;
        };
        let message = format!(
            "Are you sure you want to delete \"{}\"? This will also delete all exercises and exams.",
            course.name
        );
        if !ui.confirm(&message) {
            return;
        }

        match self.courses.delete(&course.id) {
            Ok(()) => {
                self.current_course = None;
                self.exercises.clear();
                self.exams.clear();
                self.render_exercise_grid();
                self.render_exam_grid();
            }
            Err(e) => error!("failed to delete course: {}", e),
        }

        // Fall back to the welcome view regardless of outcome detail.
        self.show_welcome();
    }

    // ---- collection loading ----

    fn load_exercises(&mut self, course_id: &str) {
        match self.exercise_api.get_by_course(course_id) {
            Ok(rows) => self.exercises = rows,
            Err(e) => {
                error!("failed to load exercises: {}", e);
                self.exercises = Vec::new();
            }
        }
    }

    fn load_exams(&mut self, course_id: &str) {
        match self.exam_api.get_by_course(course_id) {
            Ok(rows) => self.exams = rows,
            Err(e) => {
                error!("failed to load exams: {}", e);
                self.exams = Vec::new();
            }
        }
    }

    // ---- grid rendering ----

    fn exercise_rows(&self) -> Vec<Value> {
        self.exercises
            .iter()
            .map(|ex| serde_json::to_value(ex).unwrap_or(Value::Null))
            .collect()
    }

    fn exam_rows(&self) -> Vec<Value> {
        self.exams
            .iter()
            .map(|xm| serde_json::to_value(xm).unwrap_or(Value::Null))
            .collect()
    }

    // Reuse an existing grid so the widget keeps its editing and scroll
    // state; only the very first render constructs one.
    fn render_exercise_grid(&mut self) {
        let rows = self.exercise_rows();
        match self.exercise_grid.as_mut() {
            Some(grid) => grid.update_data(rows),
            None => self.exercise_grid = Some(GridView::new(exercise_columns(), rows)),
        }
    }

    fn render_exam_grid(&mut self) {
        let rows = self.exam_rows();
        match self.exam_grid.as_mut() {
            Some(grid) => grid.update_data(rows),
            None => self.exam_grid = Some(GridView::new(exam_columns(), rows)),
        }
    }

    // ---- record creation ----

    pub fn add_exercise(&mut self, ui: &mut dyn Prompter) {
        let Some(course) = self.current_course.as_ref() else {
            return;
        };
        let fields = ExerciseFields {
            exercise_number: calc::next_exercise_number(&self.exercises),
            points_earned: Some(0.0),
            points_possible: Some(10.0),
            notes: String::new(),
        };
        match self.exercise_api.create(&course.id, &fields) {
            Ok(record) => {
                self.exercises.push(record);
                self.render_exercise_grid();
                self.update_stats();
            }
            Err(e) => {
                error!("failed to add exercise: {}", e);
                ui.notify("Failed to add exercise");
            }
        }
    }

    pub fn add_exam(&mut self, ui: &mut dyn Prompter) {
        let Some(course) = self.current_course.as_ref() else {
            return;
        };
        let fields = ExamFields {
            exam_name: "New Exam".to_string(),
            grade: None,
            max_grade: Some(100.0),
            weight: Some(1.0),
            exam_date: None,
        };
        match self.exam_api.create(&course.id, &fields) {
            Ok(record) => {
                self.exams.push(record);
                self.render_exam_grid();
                self.update_stats();
            }
            Err(e) => {
                error!("failed to add exam: {}", e);
                ui.notify("Failed to add exam");
            }
        }
    }

    // ---- mutation relay ----

    /// Inline cell edit: the row is mutated first (that is the grid's doing),
    /// then the entire current row is persisted. A failed save is logged and
    /// alerted but the edit is not rolled back.
    pub fn edit_exercise_cell(
        &mut self,
        row_index: usize,
        field: &str,
        value: &Value,
        ui: &mut dyn Prompter,
    ) -> Result<(), EditError> {
        let Some(row) = self.exercises.get_mut(row_index) else {
            return Err(EditError::new("rowIndex out of range"));
        };
        row.set_field(field, value)?;
        let id = row.id.clone();
        let fields = ExerciseFields::from(&*row);
        self.render_exercise_grid();

        match self.exercise_api.update(&id, &fields) {
            Ok(()) => self.update_stats(),
            Err(e) => {
                error!("failed to update exercise: {}", e);
                ui.notify("Failed to save changes");
            }
        }
        Ok(())
    }

    pub fn edit_exam_cell(
        &mut self,
        row_index: usize,
        field: &str,
        value: &Value,
        ui: &mut dyn Prompter,
    ) -> Result<(), EditError> {
        let Some(row) = self.exams.get_mut(row_index) else {
            return Err(EditError::new("rowIndex out of range"));
        };
        row.set_field(field, value)?;
        let id = row.id.clone();
        let fields = ExamFields::from(&*row);
        self.render_exam_grid();

        match self.exam_api.update(&id, &fields) {
            Ok(()) => self.update_stats(),
            Err(e) => {
                error!("failed to update exam: {}", e);
                ui.notify("Failed to save changes");
            }
        }
        Ok(())
    }

    /// Row deletion commits to the backend first; the in-memory row is only
    /// removed once the delete succeeded.
    pub fn delete_exercise_row(
        &mut self,
        row_index: usize,
        ui: &mut dyn Prompter,
    ) -> Result<(), EditError> {
        let Some(row) = self.exercises.get(row_index) else {
            return Err(EditError::new("rowIndex out of range"));
        };
        match self.exercise_api.delete(&row.id) {
            Ok(()) => {
                self.exercises.remove(row_index);
                self.render_exercise_grid();
                self.update_stats();
            }
            Err(e) => {
                error!("failed to delete exercise: {}", e);
                ui.notify("Failed to delete exercise");
            }
        }
        Ok(())
    }

    pub fn delete_exam_row(
        &mut self,
        row_index: usize,
        ui: &mut dyn Prompter,
    ) -> Result<(), EditError> {
        let Some(row) = self.exams.get(row_index) else {
            return Err(EditError::new("rowIndex out of range"));
        };
        match self.exam_api.delete(&row.id) {
            Ok(()) => {
                self.exams.remove(row_index);
                self.render_exam_grid();
                self.update_stats();
            }
            Err(e) => {
                error!("failed to delete exam: {}", e);
                ui.notify("Failed to delete exam");
            }
        }
        Ok(())
    }

    /// Row reorder is optimistic: the in-memory array is replaced with the
    /// grid's reordered copy before the backend call, and a failed call keeps
    /// the new order.
    pub fn reorder_exercises(&mut self, mut reordered: Vec<Exercise>, ui: &mut dyn Prompter) {
        for (i, row) in reordered.iter_mut().enumerate() {
            row.sort_order = i as i64;
        }
        self.exercises = reordered;
        self.render_exercise_grid();

        let order: Vec<SortKey> = self
            .exercises
            .iter()
            .map(|ex| SortKey {
                id: ex.id.clone(),
                sort_order: ex.sort_order,
            })
            .collect();
        match self.exercise_api.reorder(&order) {
            Ok(()) => self.update_stats(),
            Err(e) => {
                error!("failed to reorder exercises: {}", e);
                ui.notify("Failed to save new order");
            }
        }
    }

    pub fn reorder_exams(&mut self, mut reordered: Vec<Exam>, ui: &mut dyn Prompter) {
        for (i, row) in reordered.iter_mut().enumerate() {
            row.sort_order = i as i64;
        }
        self.exams = reordered;
        self.render_exam_grid();

        let order: Vec<SortKey> = self
            .exams
            .iter()
            .map(|xm| SortKey {
                id: xm.id.clone(),
                sort_order: xm.sort_order,
            })
            .collect();
        match self.exam_api.reorder(&order) {
            Ok(()) => self.update_stats(),
            Err(e) => {
                error!("failed to reorder exams: {}", e);
                ui.notify("Failed to save new order");
            }
        }
    }

    // ---- statistics ----

    fn update_stats(&mut self) {
        let totals = calc::exercise_totals(&self.exercises);
        let averages = calc::exam_averages(&self.exams);
        self.stats = StatsView {
            total_points: totals.points_display(),
            exercise_percentage: format!("{}%", totals.percentage_display()),
            average_grade: averages.average_display(),
            weighted_average: averages.weighted_display(),
        };
    }

    // ---- render model ----

    pub fn view_model(&self) -> Value {
        json!({
            "view": self.view.as_str(),
            "activeTab": self.tab.as_str(),
            "header": {
                "name": self.header.name,
                "semester": self.header.semester,
                "credits": self.header.credits,
            },
            "stats": {
                "totalPoints": self.stats.total_points,
                "exercisePercentage": self.stats.exercise_percentage,
                "averageGrade": self.stats.average_grade,
                "weightedAverage": self.stats.weighted_average,
            },
            "exerciseGrid": self.exercise_grid.as_ref().map(|g| g.view_model()),
            "examGrid": self.exam_grid.as_ref().map(|g| g.view_model()),
            "overview": self.overview.iter().map(|s| json!({
                "id": s.course.id,
                "name": s.course.name,
                "semester": s.course.semester,
                "credits": s.course.credits,
                "exerciseCount": s.exercise_count,
                "examCount": s.exam_count,
            })).collect::<Vec<_>>(),
        })
    }

    #[cfg(test)]
    fn exercise_grid_instance(&self) -> Option<u64> {
        self.exercise_grid.as_ref().map(|g| g.instance())
    }
}
