//! Internal helper macros.

/// Early-returns with the given error when the predicate does not hold.
///
/// Like `assert!`, but producing an `Err` instead of a panic. Used for
/// validation checks in the decoders and the router.
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
