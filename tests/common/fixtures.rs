//! Tables and statistic closures shared by the scenarios

use sessiongraph::{Derived, EngineError, EngineResult, Table, Value};

/// `[age, city]` with three rows
pub fn people() -> Table {
    Table::new(
        vec!["age".into(), "city".into()],
        vec![
            vec![Value::Int(31), "Paris".into()],
            vec![Value::Int(45), "Berlin".into()],
            vec![Value::Int(20), "Paris".into()],
        ],
    )
    .expect("valid fixture")
}

/// Mean of a numeric column, as a scalar
pub fn mean_of(column: &'static str) -> impl FnOnce(&Table) -> EngineResult<Derived> + Send + 'static {
    move |table| {
        let cells: Vec<f64> = table
            .column(column)
            .ok_or_else(|| EngineError::invalid(format!("unknown column {column}")))?
            .filter_map(Value::as_f64)
            .collect();
        if cells.is_empty() {
            return Ok(Derived::Scalar(Value::Null));
        }
        Ok(Derived::Scalar(Value::Float(
            cells.iter().sum::<f64>() / cells.len() as f64,
        )))
    }
}

/// The first `n` rows, as a table
pub fn head(n: usize) -> impl FnOnce(&Table) -> EngineResult<Derived> + Send + 'static {
    move |table| {
        let rows = table.rows().iter().take(n).cloned().collect();
        Ok(Derived::Table(Table::new(table.columns().to_vec(), rows)?))
    }
}
