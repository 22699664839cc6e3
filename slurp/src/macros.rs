//! Macros for building and returning [`crate::error::SlurpError`] values.

/// Creates a [`crate::error::SlurpError`] from a kind, a static description and an optional
/// detail (anything implementing [`ToString`]) or source error.
#[macro_export]
macro_rules! slurp_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::SlurpError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        $crate::error::SlurpError::from(($kind, $desc)).with_source($source)
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::SlurpError::from(($kind, $desc, $detail.to_string()))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        $crate::error::SlurpError::from(($kind, $desc, $detail.to_string())).with_source($source)
    };
}

/// Returns early with a [`crate::error::SlurpError`] built by [`slurp_error!`].
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr) => {
        return ::core::result::Result::Err($crate::slurp_error!($kind, $desc))
    };
    ($kind:expr, $desc:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::slurp_error!($kind, $desc, source: $source))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        return ::core::result::Result::Err($crate::slurp_error!($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        return ::core::result::Result::Err($crate::slurp_error!(
            $kind,
            $desc,
            $detail,
            source: $source
        ))
    };
}
