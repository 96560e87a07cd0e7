use crate::model::{Exam, Exercise};

/// Two-decimal display formatting shared by the stats panel and the grids
/// (same as the front-end's `toFixed(2)`).
pub fn fmt2(v: f64) -> String {
    format!("{:.2}", v)
}

/// Derived percentage shared by the stats panel and the per-row progress
/// column. Never persisted; defined as 0 when `possible` is <= 0 to avoid
/// dividing by zero.
pub fn percentage_of(earned: f64, possible: f64) -> f64 {
    if possible <= 0.0 {
        return 0.0;
    }
    earned / possible * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExerciseTotals {
    pub earned: f64,
    pub possible: f64,
}

impl ExerciseTotals {
    /// Overall percentage as a display string, `"0.00"` when nothing is
    /// achievable yet.
    pub fn percentage_display(&self) -> String {
        fmt2(percentage_of(self.earned, self.possible))
    }

    pub fn points_display(&self) -> String {
        format!("{} / {}", fmt2(self.earned), fmt2(self.possible))
    }
}

pub fn exercise_totals(exercises: &[Exercise]) -> ExerciseTotals {
    // Fold from positive zero: `Sum` for f64 starts at -0.0, which would leak
    // "-0.00" into the display strings for an empty collection.
    let earned = exercises
        .iter()
        .fold(0.0, |acc, ex| acc + ex.points_earned.unwrap_or(0.0));
    let possible = exercises
        .iter()
        .fold(0.0, |acc, ex| acc + ex.points_possible.unwrap_or(0.0));
    ExerciseTotals { earned, possible }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExamAverages {
    /// Arithmetic mean over graded exams; None when no exam is graded yet.
    pub average: Option<f64>,
    /// Σ(grade×weight)/Σ(weight) over graded exams, weight defaulting to 1.
    pub weighted: Option<f64>,
}

impl ExamAverages {
    pub fn average_display(&self) -> String {
        self.average.map(fmt2).unwrap_or_else(|| "-".to_string())
    }

    pub fn weighted_display(&self) -> String {
        self.weighted.map(fmt2).unwrap_or_else(|| "-".to_string())
    }
}

pub fn exam_averages(exams: &[Exam]) -> ExamAverages {
    let graded: Vec<&Exam> = exams.iter().filter(|xm| xm.grade.is_some()).collect();
    if graded.is_empty() {
        return ExamAverages {
            average: None,
            weighted: None,
        };
    }

    let grade_sum: f64 = graded.iter().filter_map(|xm| xm.grade).sum();
    let average = grade_sum / graded.len() as f64;

    let weight_sum: f64 = graded.iter().map(|xm| xm.weight.unwrap_or(1.0)).sum();
    let weighted_sum: f64 = graded
        .iter()
        .map(|xm| xm.grade.unwrap_or(0.0) * xm.weight.unwrap_or(1.0))
        .sum();
    let weighted = weighted_sum / weight_sum;

    ExamAverages {
        average: Some(average),
        weighted: Some(weighted),
    }
}

/// One past the highest exercise number in the collection, or 1 when empty.
/// Numbers are user-editable and not guaranteed contiguous or unique.
pub fn next_exercise_number(exercises: &[Exercise]) -> i64 {
    exercises
        .iter()
        .map(|ex| ex.exercise_number)
        .max()
        .map(|n| n + 1)
        .unwrap_or(1)
}
