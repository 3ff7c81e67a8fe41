//! Event macros. With the `tracing` feature they forward to `tracing`; without
//! it they compile to nothing and their arguments are not evaluated.

macro_rules! holder_event {
    ($level:ident, $($arg:tt)+) => {
        #[cfg(feature = "tracing")]
        {
            ::tracing::$level!(target: "solo::holder", $($arg)+);
        }
    };
}

pub(crate) use holder_event;
