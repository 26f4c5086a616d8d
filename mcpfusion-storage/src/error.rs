//! Storage error types, re-exported as `mcpfusion_interfaces::StoreError` at
//! the trait boundary. This module adds the sqlx-specific `From` impl the
//! interface crate can't depend on.

use mcpfusion_interfaces::StoreError;

pub type StorageResult<T> = std::result::Result<T, StoreError>;

pub(crate) fn map_sqlx(op: &'static str, err: sqlx::Error) -> StoreError {
    StoreError::database(op, err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_constructor_carries_op() {
        let err = map_sqlx("get_tenant_info", sqlx::Error::RowNotFound);
        match err {
            StoreError::Database { op, .. } => assert_eq!(op, "get_tenant_info"),
            _ => panic!("expected Database variant"),
        }
    }
}
