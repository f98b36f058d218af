use crate::collection::Filter;
use backtrace::Backtrace;
use parking_lot::Mutex;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;
use std::sync::Arc;

/// Error kinds for docgate operations.
///
/// The first group is the facade taxonomy: every error handed back by a
/// connection or gateway operation carries one of these kinds. The second
/// group describes the underlying cause, as raised by a store or by the
/// deadline layer, and normally travels as the `cause` of a facade error.
///
/// # Examples
///
/// ```rust,ignore
/// use docgate::errors::{GatewayError, ErrorKind, GatewayResult};
///
/// fn example() -> GatewayResult<()> {
///     Err(GatewayError::new("no document matches", ErrorKind::NotFound))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Facade errors
    /// Cannot establish or verify connectivity to the store
    ConnectionError,
    /// An insert failed at the store
    WriteError,
    /// A query or decode failure other than "no match"
    ReadError,
    /// A single-item lookup matched zero documents
    NotFound,
    /// A delete call failed at the transport or protocol level
    DeleteError,

    // Cause errors
    /// The operation did not complete before its deadline
    Timeout,
    /// Network or server selection failure
    TransportError,
    /// A unique constraint (including `_id`) was violated
    DuplicateKey,
    /// The store rejected the document shape
    ValidationError,
    /// A record could not be decoded into a document
    DecodingError,
    /// The filter could not be evaluated
    FilterError,
    /// The provided identifier is malformed
    InvalidId,
    /// The operation is not valid in the current context
    InvalidOperation,
    /// The store has already been shut down
    StoreAlreadyClosed,
    /// Any other failure reported by the store backend
    BackendError,
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::ConnectionError => write!(f, "Connection error"),
            ErrorKind::WriteError => write!(f, "Write error"),
            ErrorKind::ReadError => write!(f, "Read error"),
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::DeleteError => write!(f, "Delete error"),
            ErrorKind::Timeout => write!(f, "Timeout"),
            ErrorKind::TransportError => write!(f, "Transport error"),
            ErrorKind::DuplicateKey => write!(f, "Duplicate key"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::DecodingError => write!(f, "Decoding error"),
            ErrorKind::FilterError => write!(f, "Filter error"),
            ErrorKind::InvalidId => write!(f, "Invalid ID"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::StoreAlreadyClosed => write!(f, "Store already closed"),
            ErrorKind::BackendError => write!(f, "Backend error"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Diagnostic context attached to facade errors.
#[derive(Clone, Default, Debug)]
pub struct ErrorContext {
    operation: Option<&'static str>,
    collection: Option<String>,
    filter: Option<Filter>,
}

/// Custom docgate error type.
///
/// `GatewayError` carries a message, a kind, an optional cause and the
/// operation context (operation name, target collection, filter) so that a
/// failure can be diagnosed without the store's own logs.
///
/// # Examples
///
/// ```rust,ignore
/// use docgate::errors::{GatewayError, ErrorKind};
///
/// let cause = GatewayError::new("deadline of 5s elapsed", ErrorKind::Timeout);
/// let err = GatewayError::new_with_cause("could not insert", ErrorKind::WriteError, cause)
///     .with_collection("users");
/// assert!(err.is_timeout());
/// ```
#[derive(Clone)]
pub struct GatewayError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<GatewayError>>,
    context: ErrorContext,
    backtrace: Arc<Mutex<Backtrace>>,
}

impl GatewayError {
    /// Creates a new `GatewayError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        GatewayError {
            message: message.to_string(),
            error_kind,
            cause: None,
            context: ErrorContext::default(),
            backtrace: Arc::new(Mutex::new(Backtrace::new_unresolved())),
        }
    }

    /// Creates a new `GatewayError` wrapping a cause error.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: GatewayError) -> Self {
        GatewayError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            context: ErrorContext::default(),
            backtrace: Arc::new(Mutex::new(Backtrace::new_unresolved())),
        }
    }

    pub fn with_operation(mut self, operation: &'static str) -> Self {
        self.context.operation = Some(operation);
        self
    }

    pub fn with_collection(mut self, collection: &str) -> Self {
        self.context.collection = Some(collection.to_string());
        self
    }

    pub fn with_filter(mut self, filter: &Filter) -> Self {
        self.context.filter = Some(filter.clone());
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&GatewayError> {
        self.cause.as_deref()
    }

    /// The operation that failed, when raised by a gateway.
    pub fn operation(&self) -> Option<&'static str> {
        self.context.operation
    }

    /// The collection the failed operation targeted.
    pub fn collection(&self) -> Option<&str> {
        self.context.collection.as_deref()
    }

    /// The filter the failed read or delete used.
    pub fn filter(&self) -> Option<&Filter> {
        self.context.filter.as_ref()
    }

    /// Returns `true` if this error or any error in its cause chain is a timeout.
    pub fn is_timeout(&self) -> bool {
        self.chain().any(|err| err.error_kind == ErrorKind::Timeout)
    }

    /// Returns `true` if a single-item lookup matched nothing.
    pub fn is_not_found(&self) -> bool {
        self.error_kind == ErrorKind::NotFound
    }

    /// Returns the innermost error of the cause chain.
    pub fn root_cause(&self) -> &GatewayError {
        self.chain().last().unwrap_or(self)
    }

    fn chain(&self) -> impl Iterator<Item = &GatewayError> {
        std::iter::successors(Some(self), |err| err.cause.as_deref())
    }
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => {
                let mut backtrace = self.backtrace.lock();
                backtrace.resolve();
                write!(f, "{}\n{:?}", self.message, *backtrace)
            }
        }
    }
}

impl Error for GatewayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for docgate operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        let error_kind = match err.kind() {
            std::io::ErrorKind::TimedOut => ErrorKind::Timeout,
            std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::NotConnected
            | std::io::ErrorKind::BrokenPipe => ErrorKind::TransportError,
            _ => ErrorKind::BackendError,
        };
        GatewayError::new(&format!("IO error: {}", err), error_kind)
    }
}

impl From<String> for GatewayError {
    fn from(msg: String) -> Self {
        GatewayError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for GatewayError {
    fn from(msg: &str) -> Self {
        GatewayError::new(msg, ErrorKind::InternalError)
    }
}
