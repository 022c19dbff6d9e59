// Table payload domain model
use crate::error::ScrapeError;
use serde_json::Value;

/// The embedded `"values"` table: facility types, visit dates and average
/// time spent, index-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub facilities: Vec<String>,
    pub dates: Vec<String>,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub facility: String,
    pub date: String,
    pub value: Option<f64>,
}

impl Payload {
    /// Validates the shape and converts the three columns.
    /// Value tokens that are not numbers become `None`.
    pub fn from_value(candidate: &Value) -> Result<Self, ScrapeError> {
        if !is_valid_shape(candidate) {
            return Err(ScrapeError::InvalidShape(describe_shape(candidate)));
        }

        let Some([facilities, dates, values]) = candidate.as_array().map(Vec::as_slice) else {
            return Err(ScrapeError::InvalidShape(describe_shape(candidate)));
        };
        fn items(column: &Value) -> &[Value] {
            column.as_array().map(Vec::as_slice).unwrap_or_default()
        }

        Ok(Self {
            facilities: items(facilities).iter().map(label_of).collect(),
            dates: items(dates).iter().map(label_of).collect(),
            values: items(values).iter().map(number_of).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.facilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = TableRow> + '_ {
        self.facilities
            .iter()
            .zip(&self.dates)
            .zip(&self.values)
            .map(|((facility, date), value)| TableRow {
                facility: facility.clone(),
                date: date.clone(),
                value: *value,
            })
    }
}

/// True only for exactly three arrays of the same non-zero length.
pub fn is_valid_shape(candidate: &Value) -> bool {
    let Some(columns) = candidate.as_array() else {
        return false;
    };
    if columns.len() != 3 {
        return false;
    }

    let mut lengths = Vec::with_capacity(3);
    for column in columns {
        match column.as_array() {
            Some(items) => lengths.push(items.len()),
            None => return false,
        }
    }

    lengths[0] > 0 && lengths.iter().all(|len| *len == lengths[0])
}

/// Short human description of a candidate, used in shape errors
pub fn describe_shape(candidate: &Value) -> String {
    match candidate {
        Value::Array(columns) => {
            let parts: Vec<String> = columns
                .iter()
                .map(|column| match column {
                    Value::Array(items) => format!("array[{}]", items.len()),
                    other => kind_of(other).to_string(),
                })
                .collect();
            format!("{} sequence(s): [{}]", columns.len(), parts.join(", "))
        }
        other => kind_of(other).to_string(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn label_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn number_of(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}
