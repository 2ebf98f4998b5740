use super::{EnumId, Named, SchemaId, TableId};

/// A type restricted to an ordered set of labels.
#[derive(Debug, Clone)]
pub struct Enum {
    pub id: EnumId,
    pub schema: SchemaId,
    /// Set for table-scoped encodings.
    pub table: Option<TableId>,
    pub name: String,
    pub db_name: String,
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub name: String,
    pub db_name: String,
    /// Sort position of the label.
    pub value: i32,
}

impl Named for Enum {
    fn name(&self) -> &str {
        &self.name
    }

    fn db_name(&self) -> &str {
        &self.db_name
    }
}

impl Named for EnumValue {
    fn name(&self) -> &str {
        &self.name
    }

    fn db_name(&self) -> &str {
        &self.db_name
    }
}
