pub mod db;
pub mod domain;
pub mod error;
pub mod normalize;
pub mod repo;

#[cfg(test)]
mod tests {
    use super::error::{AppError, ErrorClass};

    #[test]
    fn app_error_is_structured() {
        let err = AppError::new("DB_TEST", "db failed").with_retryable(false);
        assert_eq!(err.code, "DB_TEST");
        assert_eq!(err.message, "db failed");
        assert!(!err.retryable);
        assert_eq!(err.to_string(), "[DB_TEST] db failed");
    }

    #[test]
    fn error_class_follows_code_prefix() {
        assert_eq!(
            AppError::new("AI_EMBEDDING_FAILED", "x").class(),
            ErrorClass::Embedding
        );
        assert_eq!(
            AppError::new("AI_RETRIEVAL_FAILED", "x").class(),
            ErrorClass::Retrieval
        );
        assert_eq!(
            AppError::new("AI_GENERATION_UNCONFIGURED", "x").class(),
            ErrorClass::Generation
        );
        assert_eq!(AppError::new("DB_TX_FAILED", "x").class(), ErrorClass::Storage);
        assert_eq!(AppError::new("TS_INVALID", "x").class(), ErrorClass::Invalid);
    }

    #[test]
    fn display_includes_details_when_present() {
        let err = AppError::new("AI_EMBEDDING_FAILED", "boom").with_details("status=500");
        assert_eq!(err.to_string(), "[AI_EMBEDDING_FAILED] boom (status=500)");
    }
}
