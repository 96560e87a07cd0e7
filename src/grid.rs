use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{json, Value};

use crate::calc::{fmt2, percentage_of};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnKind {
    Text,
    Number { min: f64, step: f64 },
}

/// How a cell value is turned into display text. `Fixed2` carries the string
/// shown for an absent value; the defaults differ per column and are part of
/// the widget contract the front-end relies on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellDisplay {
    Raw,
    Fixed2 { empty: &'static str },
    /// Derived progress column: percentage computed from the row's earned and
    /// possible points, rendered as `"<pct>%"` for the bar label.
    Percentage,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub field: &'static str,
    pub label: &'static str,
    pub kind: ColumnKind,
    pub editable: bool,
    pub display: CellDisplay,
}

pub fn exercise_columns() -> Vec<Column> {
    vec![
        Column {
            field: "exercise_number",
            label: "Exercise #",
            kind: ColumnKind::Number { min: 1.0, step: 1.0 },
            editable: true,
            display: CellDisplay::Raw,
        },
        Column {
            field: "points_earned",
            label: "Points Earned",
            kind: ColumnKind::Number { min: 0.0, step: 0.01 },
            editable: true,
            display: CellDisplay::Fixed2 { empty: "0.00" },
        },
        Column {
            field: "points_possible",
            label: "Points Possible",
            kind: ColumnKind::Number { min: 0.0, step: 0.01 },
            editable: true,
            display: CellDisplay::Fixed2 { empty: "0.00" },
        },
        Column {
            field: "percentage",
            label: "Percentage",
            kind: ColumnKind::Text,
            editable: false,
            display: CellDisplay::Percentage,
        },
        Column {
            field: "notes",
            label: "Notes",
            kind: ColumnKind::Text,
            editable: true,
            display: CellDisplay::Raw,
        },
    ]
}

pub fn exam_columns() -> Vec<Column> {
    vec![
        Column {
            field: "exam_name",
            label: "Exam Name",
            kind: ColumnKind::Text,
            editable: true,
            display: CellDisplay::Raw,
        },
        Column {
            field: "grade",
            label: "Grade",
            kind: ColumnKind::Number { min: 0.0, step: 0.01 },
            editable: true,
            display: CellDisplay::Fixed2 { empty: "-" },
        },
        Column {
            field: "max_grade",
            label: "Max Grade",
            kind: ColumnKind::Number { min: 0.0, step: 0.01 },
            editable: true,
            display: CellDisplay::Fixed2 { empty: "100.00" },
        },
        Column {
            field: "weight",
            label: "Weight",
            kind: ColumnKind::Number { min: 0.0, step: 0.01 },
            editable: true,
            display: CellDisplay::Fixed2 { empty: "1.00" },
        },
        Column {
            field: "exam_date",
            label: "Date",
            kind: ColumnKind::Text,
            editable: true,
            display: CellDisplay::Raw,
        },
    ]
}

pub fn format_cell(column: &Column, row: &Value) -> String {
    match column.display {
        CellDisplay::Percentage => {
            let earned = row
                .get("points_earned")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);
            let possible = row
                .get("points_possible")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0);
            format!("{}%", fmt2(percentage_of(earned, possible)))
        }
        CellDisplay::Fixed2 { empty } => match row.get(column.field).and_then(|v| v.as_f64()) {
            Some(v) => fmt2(v),
            None => empty.to_string(),
        },
        CellDisplay::Raw => match row.get(column.field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        },
    }
}

fn column_schema(column: &Column) -> Value {
    let mut schema = json!({
        "field": column.field,
        "label": column.label,
        "editable": column.editable,
    });
    if let ColumnKind::Number { min, step } = column.kind {
        schema["type"] = json!("number");
        schema["min"] = json!(min);
        schema["step"] = json!(step);
    } else {
        schema["type"] = json!("text");
    }
    schema
}

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Controller-side model of one grid widget. The widget is created once per
/// collection and afterwards only receives replacement data, so in-place
/// editing and scroll state on the front-end survive redraws. `instance`
/// makes that identity observable.
pub struct GridView {
    columns: Vec<Column>,
    rows: Vec<Value>,
    instance: u64,
}

impl GridView {
    pub fn new(columns: Vec<Column>, rows: Vec<Value>) -> Self {
        Self {
            columns,
            rows,
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Replaces the backing data without recreating the widget.
    pub fn update_data(&mut self, rows: Vec<Value>) {
        self.rows = rows;
    }

    #[cfg(test)]
    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn rendered(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|col| format_cell(col, row))
                    .collect()
            })
            .collect()
    }

    pub fn view_model(&self) -> Value {
        json!({
            "instance": self.instance,
            "columns": self.columns.iter().map(column_schema).collect::<Vec<_>>(),
            "rows": self.rows,
            "rendered": self.rendered(),
        })
    }
}
