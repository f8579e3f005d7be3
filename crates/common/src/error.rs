//! Error-context plumbing shared across the workspace.
//!
//! Each crate keeps its own `thiserror` enum; implementing [`FromMessage`]
//! for it and invoking [`impl_context!`] alongside adds a crate-local
//! `.context()` adapter on `Result` and `Option`.

/// Error types constructible from a plain message string.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// Generate a crate-local `Context` trait with a `.context()` method on
/// `Result` and `Option`.
///
/// Invoke inside a module that defines `Error: FromMessage` and
/// `type Result<T> = std::result::Result<T, Error>`.
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T> {
            fn context(self, context: impl Into<String>) -> Result<T>;
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                let ctx = context.into();
                self.map_err(|source| {
                    <Error as $crate::FromMessage>::from_message(format!("{ctx}: {source}"))
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(context.into()))
            }
        }
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::FromMessage;

    #[derive(Debug, PartialEq, Eq)]
    struct Error(String);

    impl FromMessage for Error {
        fn from_message(message: String) -> Self {
            Self(message)
        }
    }

    type Result<T> = std::result::Result<T, Error>;

    crate::impl_context!();

    #[test]
    fn context_prefixes_display_errors() {
        let parsed: std::result::Result<u32, _> = "5x".parse();
        let wrapped = parsed.context("parsing count");
        assert_eq!(
            wrapped,
            Err(Error("parsing count: invalid digit found in string".into()))
        );
    }

    #[test]
    fn context_converts_none() {
        let missing: Option<u32> = None;
        assert_eq!(
            missing.context("no value configured"),
            Err(Error("no value configured".into()))
        );
        assert_eq!(Some(7).context("unused"), Ok(7));
    }
}
