pub mod memory_document;
