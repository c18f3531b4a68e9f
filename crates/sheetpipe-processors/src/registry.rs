//! Processor registry: file-type discriminator -> processor.
//!
//! The registry is populated once at startup through the builder and is
//! immutable afterwards; resolution is a plain table lookup with a
//! guaranteed default entry, so an unregistered type is never a hard
//! failure.

use std::collections::HashMap;
use std::sync::Arc;

use crate::processor::RowProcessor;

pub struct ProcessorRegistry {
    processors: HashMap<String, Arc<dyn RowProcessor>>,
    default: Arc<dyn RowProcessor>,
}

pub struct ProcessorRegistryBuilder {
    processors: HashMap<String, Arc<dyn RowProcessor>>,
    default: Arc<dyn RowProcessor>,
}

impl ProcessorRegistry {
    /// Start a builder. The default processor is a constructor argument so
    /// the fallback entry cannot be absent.
    pub fn builder(default: Arc<dyn RowProcessor>) -> ProcessorRegistryBuilder {
        ProcessorRegistryBuilder {
            processors: HashMap::new(),
            default,
        }
    }

    /// Resolve the processor for a file type, falling back to the default
    /// entry for unregistered types.
    pub fn resolve(&self, file_type: &str) -> Arc<dyn RowProcessor> {
        match self.processors.get(file_type) {
            Some(processor) => Arc::clone(processor),
            None => {
                tracing::debug!(
                    file_type,
                    fallback = self.default.name(),
                    "No processor registered for type, using default"
                );
                Arc::clone(&self.default)
            }
        }
    }

    /// Registered type discriminators, sorted.
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.processors.keys().cloned().collect();
        types.sort();
        types
    }
}

impl ProcessorRegistryBuilder {
    pub fn register(mut self, file_type: impl Into<String>, processor: Arc<dyn RowProcessor>) -> Self {
        let file_type = file_type.into();
        tracing::info!(
            file_type = %file_type,
            processor = processor.name(),
            "Registered row processor"
        );
        self.processors.insert(file_type, processor);
        self
    }

    pub fn build(self) -> ProcessorRegistry {
        ProcessorRegistry {
            processors: self.processors,
            default: self.default,
        }
    }
}
