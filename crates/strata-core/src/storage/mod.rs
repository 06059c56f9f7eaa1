//! Columnar in-memory storage.
//!
//! A [`Table`] is a list of [`Chunk`]s; a chunk holds one [`Column`] per table
//! column. Columns are plain value vectors, dictionary-encoded, or references
//! into another table through a shared position list.

mod attribute_vector;
mod catalog;
mod chunk;
mod column;
mod dictionary_column;
mod dictionary_compression;
mod reference_column;
mod table;
mod value_column;

pub use attribute_vector::FittedAttributeVector;
pub use catalog::Catalog;
pub use chunk::Chunk;
pub use column::{Column, TypedDictionaryColumn, TypedValueColumn};
pub use dictionary_column::DictionaryColumn;
pub use dictionary_compression::DictionaryCompression;
pub use reference_column::{reference_chunk, reference_columns, ReferenceColumn};
pub use table::{ColumnDefinition, Table};
pub use value_column::ValueColumn;
