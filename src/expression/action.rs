//! The actions list names: ADD_COLUMN, REMOVE_COLUMN, COPY_COLUMN,
//! APPLY_FUNCTION, PROJECT, executed in order against a `DataBlock`.

use crate::block::{DataBlock, NamedColumn};
use crate::column::{Column, DataType, Field, PodArray};
use crate::error::{EngineError, EngineResult, ErrorCode};
use crate::expression::function::FunctionRegistry;

#[derive(Clone)]
pub enum Action {
    AddColumn { name: String, data_type: DataType, column: Column },
    RemoveColumn { name: String },
    CopyColumn { from: String, to: String },
    ApplyFunction { function: String, arguments: Vec<String>, result: String },
    /// Final reshape to the query's output column list.
    Project { names_to_aliases: Vec<(String, String)> },
}

/// An ordered action list plus the registry it resolves `ApplyFunction`
/// against. Construct once per query, reuse across every block that query
/// processes — matching ClickHouse's `ExpressionActions` lifetime.
#[derive(Clone)]
pub struct ExpressionActions {
    actions: Vec<Action>,
    registry: FunctionRegistry,
}

impl ExpressionActions {
    pub fn new(registry: FunctionRegistry) -> Self {
        Self { actions: Vec::new(), registry }
    }

    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// A quick pass over an empty-but-typed "sample block" to catch
    /// unknown columns/functions before any real data flows, the way
    /// ClickHouse's planner type-checks an `ExpressionActions` chain up
    /// front rather than failing mid-query.
    pub fn check_against_sample(&self, sample: &DataBlock) -> EngineResult<()> {
        let mut names: Vec<String> = sample.column_names().into_iter().map(str::to_string).collect();
        for action in &self.actions {
            match action {
                Action::AddColumn { name, .. } => names.push(name.clone()),
                Action::RemoveColumn { name } => {
                    if !names.contains(name) {
                        return Err(EngineError::new(ErrorCode::UnknownIdentifier, name.clone()));
                    }
                    names.retain(|n| n != name);
                }
                Action::CopyColumn { from, to } => {
                    if !names.contains(from) {
                        return Err(EngineError::new(ErrorCode::UnknownIdentifier, from.clone()));
                    }
                    names.push(to.clone());
                }
                Action::ApplyFunction { function, arguments, result } => {
                    self.registry.get(function)?;
                    for a in arguments {
                        if !names.contains(a) {
                            return Err(EngineError::new(ErrorCode::UnknownIdentifier, a.clone()));
                        }
                    }
                    names.push(result.clone());
                }
                Action::Project { names_to_aliases } => {
                    for (name, _) in names_to_aliases {
                        if !names.contains(name) {
                            return Err(EngineError::new(ErrorCode::UnknownIdentifier, name.clone()));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn execute(&self, mut block: DataBlock) -> EngineResult<DataBlock> {
        for action in &self.actions {
            block = self.apply_one(block, action)?;
        }
        Ok(block)
    }

    fn apply_one(&self, mut block: DataBlock, action: &Action) -> EngineResult<DataBlock> {
        match action {
            Action::AddColumn { name, data_type, column } => {
                block.push_column(NamedColumn { name: name.clone(), data_type: data_type.clone(), column: column.clone() })?;
                Ok(block)
            }
            Action::RemoveColumn { name } => {
                block.remove_column(name);
                Ok(block)
            }
            Action::CopyColumn { from, to } => {
                let src = block.column(from).ok_or_else(|| EngineError::new(ErrorCode::UnknownIdentifier, from.clone()))?;
                let copy = NamedColumn { name: to.clone(), data_type: src.data_type.clone(), column: src.column.clone() };
                block.push_column(copy)?;
                Ok(block)
            }
            Action::ApplyFunction { function, arguments, result } => {
                let func = self.registry.get(function)?;
                let arg_columns: Vec<&Column> = arguments
                    .iter()
                    .map(|a| block.column(a).map(|c| &c.column).ok_or_else(|| EngineError::new(ErrorCode::UnknownIdentifier, a.clone())))
                    .collect::<EngineResult<_>>()?;
                let rows = block.rows();
                let nullable_output = arg_columns.iter().any(|c| c.is_nullable());

                let mut values = Vec::with_capacity(rows);
                let mut any_null = false;
                for row in 0..rows {
                    let args: Vec<Field> = arg_columns.iter().map(|c| c.get_as_field(row)).collect::<EngineResult<_>>()?;
                    if func.is_null_propagating() && args.iter().any(Field::is_null) {
                        any_null = true;
                        values.push(Field::Null);
                    } else {
                        values.push(func.apply(&args)?);
                    }
                }

                let column = column_from_fields(&values, nullable_output || any_null)?;
                block.push_column(NamedColumn { name: result.clone(), data_type: infer_data_type(&column), column })?;
                Ok(block)
            }
            Action::Project { names_to_aliases } => block.project(names_to_aliases),
        }
    }
}

fn infer_data_type(column: &Column) -> DataType {
    match column {
        Column::UInt64(_) => DataType::UInt64,
        Column::Int64(_) => DataType::Int64,
        Column::Float64(_) => DataType::Float64,
        Column::String(_) => DataType::String,
        Column::Array(a) => DataType::Array(Box::new(infer_data_type(&a.data))),
        Column::Nullable(n) => DataType::Nullable(Box::new(infer_data_type(&n.data))),
        Column::Const(_) => DataType::UInt64,
        Column::LowCardinality(_) => DataType::LowCardinality(Box::new(DataType::String)),
    }
}

/// Builds a column from row-major `Field`s, inferring the scalar variant
/// from the first non-null value (falling back to `Float64` for an
/// all-null result). Wraps in `Nullable` when `force_nullable` or any value
/// is null.
fn column_from_fields(values: &[Field], force_nullable: bool) -> EngineResult<Column> {
    let base_kind = values.iter().find(|f| !f.is_null());
    let mut base = match base_kind {
        Some(Field::UInt64(_)) => Column::UInt64(PodArray::new()),
        Some(Field::Int64(_)) => Column::Int64(PodArray::new()),
        Some(Field::Float64(_)) => Column::Float64(PodArray::new()),
        Some(Field::String(_)) => Column::String(Default::default()),
        _ => Column::Float64(PodArray::new()),
    };
    let has_null = force_nullable || values.iter().any(Field::is_null);
    if has_null {
        let mut nullable = crate::column::NullableColumn::new(base)?;
        for v in values {
            nullable.data.insert_field(match v {
                Field::Null => match &*nullable.data {
                    Column::String(_) => Field::String(String::new()),
                    Column::Float64(_) => Field::Float64(0.0),
                    Column::Int64(_) => Field::Int64(0),
                    _ => Field::UInt64(0),
                },
                other => other.clone(),
            })?;
            nullable.null_mask.push(v.is_null() as u8);
        }
        Ok(Column::Nullable(nullable))
    } else {
        for v in values {
            base.insert_field(v.clone())?;
        }
        Ok(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::DataType;

    fn block_with_two_cols() -> DataBlock {
        let mut a = Column::UInt64(PodArray::new());
        let mut b = Column::UInt64(PodArray::new());
        for i in 0..4u64 {
            a.insert_field(Field::UInt64(i)).unwrap();
            b.insert_field(Field::UInt64(i * 2)).unwrap();
        }
        DataBlock::from_columns(vec![
            NamedColumn { name: "a".into(), data_type: DataType::UInt64, column: a },
            NamedColumn { name: "b".into(), data_type: DataType::UInt64, column: b },
        ])
        .unwrap()
    }

    #[test]
    fn apply_function_adds_result_column() {
        let mut actions = ExpressionActions::new(FunctionRegistry::with_builtins());
        actions.push(Action::ApplyFunction { function: "plus".into(), arguments: vec!["a".into(), "b".into()], result: "sum".into() });
        let out = actions.execute(block_with_two_cols()).unwrap();
        assert_eq!(out.column("sum").unwrap().column.get_as_field(2).unwrap(), Field::Float64(6.0));
    }

    #[test]
    fn project_renames_and_drops_columns() {
        let mut actions = ExpressionActions::new(FunctionRegistry::with_builtins());
        actions.push(Action::Project { names_to_aliases: vec![("a".into(), "only".into())] });
        let out = actions.execute(block_with_two_cols()).unwrap();
        assert_eq!(out.num_columns(), 1);
        assert!(out.has_column("only"));
    }

    #[test]
    fn check_against_sample_catches_unknown_column() {
        let mut actions = ExpressionActions::new(FunctionRegistry::with_builtins());
        actions.push(Action::CopyColumn { from: "missing".into(), to: "x".into() });
        assert!(actions.check_against_sample(&block_with_two_cols()).is_err());
    }
}
