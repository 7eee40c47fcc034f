use std::error::Error;
use std::fmt;

/// A wrapper around an error that prints its whole source chain.
///
/// ```
/// use std::io::{Error, ErrorKind};
/// use tailpipe_log::LogError;
///
/// let custom_error = Error::new(ErrorKind::Other, "oh no!");
/// tailpipe_log::error!("operation failed: {}", LogError(&custom_error));
/// ```
pub struct LogError<'a, E: Error + ?Sized>(pub &'a E);

impl<E: Error + ?Sized> fmt::Display for LogError<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;

        let mut source = self.0.source();
        while let Some(cause) = source {
            write!(f, "\n  caused by: {cause}")?;
            source = cause.source();
        }

        Ok(())
    }
}

/// Logs an error with its source chain, falling back to stderr when no
/// logger is installed yet.
///
/// Startup failures can occur before [`init`](crate::init) has run; this
/// makes sure they are reported either way.
pub fn ensure_error(error: &dyn Error) {
    if tracing::dispatcher::has_been_set() {
        crate::error!("{}", LogError(error));
    } else {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("error: {}", LogError(error));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "inner failure")
        }
    }

    impl Error for Inner {}

    #[derive(Debug)]
    struct Outer(Inner);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "outer failure")
        }
    }

    impl Error for Outer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_log_error_chain() {
        let error = Outer(Inner);
        let formatted = LogError(&error).to_string();
        assert_eq!(formatted, "outer failure\n  caused by: inner failure");
    }
}
