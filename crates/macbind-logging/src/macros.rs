//! ---
//! macbind_section: "01-observability"
//! macbind_subsection: "module"
//! macbind_type: "source"
//! macbind_scope: "code"
//! macbind_description: "Context-enriched logging macros."
//! macbind_version: "v0.1.0"
//! macbind_owner: "tbd"
//! ---

/// Emit an informational log enriched with license context.
#[macro_export]
macro_rules! lic_info {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__lic_event!($crate::tracing::Level::INFO, &$ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__lic_event!($crate::tracing::Level::INFO, &$crate::LogContext::default(), $($arg)+)
    };
}

/// Emit a debug log enriched with license context.
#[macro_export]
macro_rules! lic_debug {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__lic_event!($crate::tracing::Level::DEBUG, &$ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__lic_event!($crate::tracing::Level::DEBUG, &$crate::LogContext::default(), $($arg)+)
    };
}

/// Emit an error log enriched with license context.
#[macro_export]
macro_rules! lic_error {
    (context = $ctx:expr, $($arg:tt)+) => {
        $crate::__lic_event!($crate::tracing::Level::ERROR, &$ctx, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::__lic_event!($crate::tracing::Level::ERROR, &$crate::LogContext::default(), $($arg)+)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __lic_event {
    ($level:expr, $ctx:expr, $($arg:tt)+) => {{
        let ctx: &$crate::LogContext = $ctx;
        $crate::tracing::event!(
            $level,
            subject = ctx.subject.unwrap_or(""),
            operation = ctx.operation.unwrap_or(""),
            key_fingerprint = ctx.key_fingerprint.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
}
