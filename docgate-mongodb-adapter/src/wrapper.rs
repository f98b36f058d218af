use docgate::errors::{ErrorKind, GatewayError};
use mongodb::error::{Error as MongoError, ErrorKind as MongoErrorKind, WriteFailure};

const DUPLICATE_KEY: i32 = 11000;
const DUPLICATE_KEY_LEGACY: i32 = 11001;
const DOCUMENT_VALIDATION_FAILURE: i32 = 121;
const DOLLAR_PREFIXED_FIELD_NAME: i32 = 52;

/// Maps a server error code to a cause kind.
pub(crate) fn code_kind(code: i32) -> ErrorKind {
    match code {
        DUPLICATE_KEY | DUPLICATE_KEY_LEGACY => ErrorKind::DuplicateKey,
        DOCUMENT_VALIDATION_FAILURE | DOLLAR_PREFIXED_FIELD_NAME => ErrorKind::ValidationError,
        _ => ErrorKind::BackendError,
    }
}

pub(crate) fn to_gateway_error(error: MongoError) -> GatewayError {
    let error_kind = match error.kind.as_ref() {
        MongoErrorKind::Write(WriteFailure::WriteError(write_error)) => code_kind(write_error.code),
        MongoErrorKind::InsertMany(insert_error) => insert_error
            .write_errors
            .as_ref()
            .and_then(|errors| errors.first())
            .map(|first| code_kind(first.code))
            .unwrap_or(ErrorKind::BackendError),
        MongoErrorKind::Command(command_error) => code_kind(command_error.code),
        MongoErrorKind::Io(_)
        | MongoErrorKind::ServerSelection { .. }
        | MongoErrorKind::ConnectionPoolCleared { .. }
        | MongoErrorKind::DnsResolve { .. } => ErrorKind::TransportError,
        MongoErrorKind::BsonDeserialization(_) => ErrorKind::DecodingError,
        MongoErrorKind::BsonSerialization(_) => ErrorKind::ValidationError,
        MongoErrorKind::Authentication { .. } => ErrorKind::ConnectionError,
        MongoErrorKind::InvalidArgument { .. } => ErrorKind::InvalidOperation,
        MongoErrorKind::Shutdown => ErrorKind::StoreAlreadyClosed,
        _ => ErrorKind::BackendError,
    };
    GatewayError::new(&format!("MongoDB Error: {}", error), error_kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_codes() {
        assert_eq!(code_kind(11000), ErrorKind::DuplicateKey);
        assert_eq!(code_kind(11001), ErrorKind::DuplicateKey);
    }

    #[test]
    fn validation_codes() {
        assert_eq!(code_kind(121), ErrorKind::ValidationError);
        assert_eq!(code_kind(52), ErrorKind::ValidationError);
    }

    #[test]
    fn unknown_code_is_backend_error() {
        assert_eq!(code_kind(13), ErrorKind::BackendError);
    }

    #[test]
    fn io_error_is_transport_error() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let error = to_gateway_error(MongoError::from(io));
        assert_eq!(error.kind(), &ErrorKind::TransportError);
        assert!(error.message().starts_with("MongoDB Error"));
    }
}
