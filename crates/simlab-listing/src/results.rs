use std::cmp::Ordering;

use serde_json::Value;

/// Columns every result record carries, in display order.
pub const FIXED_COLUMNS: [&str; 3] = ["run_name", "agent_id", "user_simulator_id"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
  #[default]
  Ascending,
  Descending,
}

impl SortDirection {
  fn apply(self, ordering: Ordering) -> Ordering {
    match self {
      SortDirection::Ascending => ordering,
      SortDirection::Descending => ordering.reverse(),
    }
  }

  fn toggled(self) -> Self {
    match self {
      SortDirection::Ascending => SortDirection::Descending,
      SortDirection::Descending => SortDirection::Ascending,
    }
  }
}

/// Leaderboard records with a sort column.
///
/// A column names a top-level record field or, failing that, a metric whose
/// `mean` is compared. A column compares numerically when every present value
/// in it is numeric (numbers or numeric strings), case-insensitively as text
/// otherwise. Missing values compare equal to each other and sort last in
/// either direction.
#[derive(Debug, Clone)]
pub struct ResultTable {
  rows: Vec<Value>,
  column: String,
  direction: SortDirection,
}

impl ResultTable {
  /// Wrap records, sorted ascending by run name.
  pub fn new(rows: Vec<Value>) -> Self {
    let mut table = Self {
      rows,
      column: FIXED_COLUMNS[0].to_string(),
      direction: SortDirection::Ascending,
    };
    table.apply();
    table
  }

  /// Header click: the active column toggles its direction, any other column
  /// becomes active ascending.
  pub fn sort_by(&mut self, column: &str) {
    if self.column == column {
      self.direction = self.direction.toggled();
    } else {
      self.column = column.to_string();
      self.direction = SortDirection::Ascending;
    }
    self.apply();
  }

  /// Sort by `column` in an explicit direction.
  pub fn sort(&mut self, column: &str, direction: SortDirection) {
    self.column = column.to_string();
    self.direction = direction;
    self.apply();
  }

  pub fn column(&self) -> &str {
    &self.column
  }

  pub fn direction(&self) -> SortDirection {
    self.direction
  }

  pub fn rows(&self) -> &[Value] {
    &self.rows
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  /// Fixed columns followed by the metric names of the first record.
  pub fn columns(&self) -> Vec<String> {
    let mut columns: Vec<String> = FIXED_COLUMNS.iter().map(|c| c.to_string()).collect();
    if let Some(Value::Object(metrics)) = self.rows.first().and_then(|r| r.get("metrics")) {
      columns.extend(metrics.keys().cloned());
    }
    columns
  }

  fn apply(&mut self) {
    let column = self.column.as_str();
    let numeric = self
      .rows
      .iter()
      .filter_map(|row| cell(row, column))
      .all(|value| as_number(value).is_some());
    let direction = self.direction;

    self.rows.sort_by(|a, b| match (cell(a, column), cell(b, column)) {
      (None, None) => Ordering::Equal,
      (None, Some(_)) => Ordering::Greater,
      (Some(_), None) => Ordering::Less,
      (Some(x), Some(y)) => {
        let ordering = if numeric {
          let x = as_number(x).unwrap_or_default();
          let y = as_number(y).unwrap_or_default();
          x.total_cmp(&y)
        } else {
          as_text(x).cmp(&as_text(y))
        };
        direction.apply(ordering)
      }
    });
  }
}

/// Value of `column` in a record: the top-level field, else the metric mean.
/// `null` counts as missing.
pub fn cell<'a>(row: &'a Value, column: &str) -> Option<&'a Value> {
  let value = match row.get(column) {
    Some(value) => value,
    None => row.get("metrics")?.get(column)?.get("mean")?,
  };
  (!value.is_null()).then_some(value)
}

fn as_number(value: &Value) -> Option<f64> {
  match value {
    Value::Number(n) => n.as_f64(),
    Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
    _ => None,
  }
}

fn as_text(value: &Value) -> String {
  match value {
    Value::String(s) => s.to_lowercase(),
    other => other.to_string().to_lowercase(),
  }
}
