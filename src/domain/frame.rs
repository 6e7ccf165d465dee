// Tabular result model and the column reshaping applied before a table write
use serde_json::Value;
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("expected a JSON array of row objects")]
    NotAnArray,

    #[error("row {0} is not a JSON object")]
    RowNotObject(usize),

    #[error("unknown column `{0}`")]
    UnknownColumn(String),

    #[error("column `{0}` is nested; flatten it before writing")]
    NestedColumn(String),

    #[error("map column `{column}` holds a non-object value in row {row}")]
    NotAMap { column: String, row: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataType {
    String,
    Integer,
    Double,
    Boolean,
    Map,
    Struct(Vec<Field>),
}

impl DataType {
    pub fn is_nested(&self) -> bool {
        matches!(self, DataType::Map | DataType::Struct(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// An in-memory table: ordered typed fields and one value per field per row
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    fields: Vec<Field>,
    rows: Vec<Vec<Value>>,
}

impl Frame {
    /// Build a frame from an array of row objects. Columns appear in first-seen
    /// order; object-valued columns are structs unless listed in `map_columns`.
    pub fn from_json_rows(document: &Value, map_columns: &[String]) -> Result<Self, FrameError> {
        let rows = document.as_array().ok_or(FrameError::NotAnArray)?;
        let mut objects = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            objects.push(row.as_object().ok_or(FrameError::RowNotObject(index))?);
        }

        let mut names: Vec<String> = Vec::new();
        for object in &objects {
            for key in object.keys() {
                if !names.contains(key) {
                    names.push(key.clone());
                }
            }
        }

        let mut fields = Vec::with_capacity(names.len());
        for name in &names {
            let values: Vec<&Value> = objects.iter().filter_map(|o| o.get(name)).collect();
            let is_map = map_columns.iter().any(|m| m == name);
            if is_map {
                if let Some(row) = objects
                    .iter()
                    .position(|o| o.get(name).is_some_and(|v| !v.is_null() && !v.is_object()))
                {
                    return Err(FrameError::NotAMap {
                        column: name.clone(),
                        row,
                    });
                }
            }
            fields.push(Field::new(name.clone(), infer_type(&values, is_map)));
        }

        let rows = objects
            .iter()
            .map(|object| {
                names
                    .iter()
                    .map(|name| object.get(name).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Ok(Self { fields, rows })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    #[cfg(test)]
    pub fn column_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    #[cfg(test)]
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.index_of(name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    pub fn select(&self, columns: &[String]) -> Result<Frame, FrameError> {
        let mut indices = Vec::with_capacity(columns.len());
        for column in columns {
            indices.push(
                self.index_of(column)
                    .ok_or_else(|| FrameError::UnknownColumn(column.clone()))?,
            );
        }

        let fields = indices.iter().map(|&i| self.fields[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(Frame { fields, rows })
    }

    pub fn ensure_flat(&self) -> Result<(), FrameError> {
        match self.fields.iter().find(|f| f.data_type.is_nested()) {
            Some(field) => Err(FrameError::NestedColumn(field.name.clone())),
            None => Ok(()),
        }
    }

    fn drop_column(&mut self, index: usize) {
        self.fields.remove(index);
        for row in &mut self.rows {
            row.remove(index);
        }
    }

    /// Add a column at the end, or replace an existing one of the same name
    fn put_column(&mut self, field: Field, values: Vec<Value>) {
        match self.index_of(&field.name) {
            Some(index) => {
                self.fields[index] = field;
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[index] = value;
                }
            }
            None => {
                self.fields.push(field);
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
    }
}

/// Type shared by every non-null value. Mixed value kinds fall back to String.
fn infer_type(values: &[&Value], is_map: bool) -> DataType {
    let present: Vec<&Value> = values.iter().copied().filter(|v| !v.is_null()).collect();
    if present.is_empty() {
        return DataType::String;
    }

    if present.iter().all(|v| v.is_boolean()) {
        return DataType::Boolean;
    }
    if present.iter().all(|v| v.is_number()) {
        return if present.iter().all(|v| v.is_i64() || v.is_u64()) {
            DataType::Integer
        } else {
            DataType::Double
        };
    }
    if !present.iter().all(|v| v.is_object()) {
        return DataType::String;
    }
    if is_map {
        return DataType::Map;
    }

    let mut children: Vec<String> = Vec::new();
    for object in present.iter().filter_map(|v| v.as_object()) {
        for key in object.keys() {
            if !children.contains(key) {
                children.push(key.clone());
            }
        }
    }
    let fields = children
        .iter()
        .map(|child| {
            let nested: Vec<&Value> = present.iter().filter_map(|v| v.get(child)).collect();
            Field::new(child.clone(), infer_type(&nested, false))
        })
        .collect();
    DataType::Struct(fields)
}

/// Integer cast with the truncating semantics of a SQL `CAST(x AS INT)`
fn cast_integer(value: &Value) -> Value {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .map(Value::from)
            .unwrap_or(Value::Null),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                .map(Value::from)
                .unwrap_or(Value::Null)
        }
        Value::Bool(b) => Value::from(i64::from(*b)),
        _ => Value::Null,
    }
}

/// Replace each listed map column by one integer column per distinct key
pub fn flatten_map(mut frame: Frame, fields: &[String]) -> Frame {
    let targets: Vec<String> = frame
        .fields
        .iter()
        .filter(|f| f.data_type == DataType::Map && fields.contains(&f.name))
        .map(|f| f.name.clone())
        .collect();

    for name in targets {
        let Some(index) = frame.index_of(&name) else {
            continue;
        };

        let keys: BTreeSet<String> = frame
            .rows
            .iter()
            .filter_map(|row| row[index].as_object())
            .flat_map(|object| object.keys().cloned())
            .collect();

        let columns: Vec<(String, Vec<Value>)> = keys
            .into_iter()
            .map(|key| {
                let values = frame
                    .rows
                    .iter()
                    .map(|row| row[index].get(&key).map(cast_integer).unwrap_or(Value::Null))
                    .collect();
                (key, values)
            })
            .collect();

        frame.drop_column(index);
        for (key, values) in columns {
            frame.put_column(Field::new(key, DataType::Integer), values);
        }
    }

    frame
}

/// Replace each struct column by `{parent}_{child}` columns, one level deep
pub fn flatten_struct(mut frame: Frame) -> Frame {
    let structs: Vec<(String, Vec<Field>)> = frame
        .fields
        .iter()
        .filter_map(|f| match &f.data_type {
            DataType::Struct(children) => Some((f.name.clone(), children.clone())),
            _ => None,
        })
        .collect();

    for (parent, children) in structs {
        let Some(index) = frame.index_of(&parent) else {
            continue;
        };

        for child in children {
            let values = frame
                .rows
                .iter()
                .map(|row| row[index].get(&child.name).cloned().unwrap_or(Value::Null))
                .collect();
            let name = format!("{}_{}", parent, child.name);
            frame.put_column(Field::new(name, child.data_type), values);
        }

        if let Some(index) = frame.index_of(&parent) {
            frame.drop_column(index);
        }
    }

    frame
}
