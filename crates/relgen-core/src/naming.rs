use crate::error::Result;

/// Converts a database identifier into the display name exposed to templates.
pub trait NameConverter {
    fn convert(&self, db_name: &str) -> Result<String>;
}

/// Keeps database names unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityNames;

impl NameConverter for IdentityNames {
    fn convert(&self, db_name: &str) -> Result<String> {
        Ok(db_name.to_string())
    }
}
