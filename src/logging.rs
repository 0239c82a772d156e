// Macros file - tracing macros are imported within the macro definitions

/// Standardized logging macros for consistent field names and message
/// patterns across the application.

/// Log the start of an API operation with consistent fields
#[macro_export]
macro_rules! log_api_start {
    ($operation:expr, provider = $provider:expr) => {
        tracing::debug!(
            operation = $operation,
            provider = $provider,
            "API operation started"
        );
    };
    ($operation:expr) => {
        tracing::debug!(
            operation = $operation,
            "API operation started"
        );
    };
}

/// Log successful completion of an API operation
#[macro_export]
macro_rules! log_api_success {
    ($operation:expr, provider = $provider:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            provider = $provider,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            "API operation completed: {}", $msg
        );
    };
}

/// Log API operation errors with consistent structure
#[macro_export]
macro_rules! log_api_error {
    ($operation:expr, provider = $provider:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            provider = $provider,
            error = %$error,
            "API operation failed: {}", $msg
        );
    };
    ($operation:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            error = %$error,
            "API operation failed: {}", $msg
        );
    };
}

/// Log system lifecycle events (startup, configuration, shutdown)
#[macro_export]
macro_rules! log_system_event {
    (config, $msg:expr) => {
        tracing::info!(component = "config", "{}", $msg);
    };
    (server, $msg:expr) => {
        tracing::info!(component = "server", "{}", $msg);
    };
}

/// Log validation outcomes with a consistent shape
#[macro_export]
macro_rules! log_validation {
    (success, $component:expr, $msg:expr) => {
        tracing::debug!(component = $component, "Validation passed: {}", $msg);
    };
    (failure, $component:expr, $msg:expr) => {
        tracing::warn!(component = $component, "Validation failed: {}", $msg);
    };
}
