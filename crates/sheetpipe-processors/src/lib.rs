mod builtin;
mod processor;
mod registry;

pub use builtin::{builtin_registry, DefaultProcessor, Type1Processor, Type2Processor};
pub use processor::{ProcessingError, RowMap, RowProcessor};
pub use registry::{ProcessorRegistry, ProcessorRegistryBuilder};
