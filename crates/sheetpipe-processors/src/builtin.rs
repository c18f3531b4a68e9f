//! Builtin processors and the standard registry.

use std::sync::Arc;

use serde_json::Value;

use crate::processor::{ProcessingError, RowMap, RowProcessor};
use crate::registry::ProcessorRegistry;

/// Registry with the builtin processor set: `type1`, `type2`, and the
/// default fallback. Built once at worker startup.
pub fn builtin_registry() -> ProcessorRegistry {
    ProcessorRegistry::builder(Arc::new(DefaultProcessor))
        .register("type1", Arc::new(Type1Processor))
        .register("type2", Arc::new(Type2Processor))
        .build()
}

/// Pass-through processor for unregistered file types.
#[derive(Debug)]
pub struct DefaultProcessor;

impl RowProcessor for DefaultProcessor {
    fn name(&self) -> &str {
        "default"
    }

    fn process_row(&self, row_data: &RowMap) -> Result<RowMap, ProcessingError> {
        Ok(row_data.clone())
    }
}

/// Type 1 files: collapse surrounding whitespace in string values.
#[derive(Debug)]
pub struct Type1Processor;

impl RowProcessor for Type1Processor {
    fn name(&self) -> &str {
        "type1"
    }

    fn process_row(&self, row_data: &RowMap) -> Result<RowMap, ProcessingError> {
        Ok(normalize_whitespace(row_data))
    }
}

/// Type 2 files: collapse whitespace, then turn blank strings into nulls.
#[derive(Debug)]
pub struct Type2Processor;

impl RowProcessor for Type2Processor {
    fn name(&self) -> &str {
        "type2"
    }

    fn process_row(&self, row_data: &RowMap) -> Result<RowMap, ProcessingError> {
        let mut out = normalize_whitespace(row_data);
        for value in out.values_mut() {
            if matches!(value, Value::String(s) if s.is_empty()) {
                *value = Value::Null;
            }
        }
        Ok(out)
    }
}

fn normalize_whitespace(row_data: &RowMap) -> RowMap {
    let mut out = RowMap::new();
    for (key, value) in row_data {
        let value = match value {
            Value::String(s) => Value::String(s.trim().to_string()),
            other => other.clone(),
        };
        out.insert(key.clone(), value);
    }
    out
}
