//! Process-scoped singletons: the [`Singleton`] trait and the
//! [`singleton!`](crate::singleton!) macro that implements it over a private
//! `static` holder.

use crate::{ConstructionError, LazySingletonHolder};

/// A type with exactly one process-wide instance, reachable only through
/// [`Singleton::instance`].
///
/// Normally implemented with [`singleton!`](crate::singleton!), which keeps
/// the backing holder private to the impl so no other code can reach the
/// slot directly.
pub trait Singleton: Sized + Send + Sync + 'static {
    /// The holder backing this singleton.
    fn holder() -> &'static LazySingletonHolder<Self>;

    /// Returns the process-wide instance, constructing it on first use.
    ///
    /// # Errors
    ///
    /// Propagates the initializer's failure as a [`ConstructionError`]; a
    /// later call retries.
    #[inline]
    fn instance() -> Result<&'static Self, ConstructionError> {
        Self::holder().instance()
    }

    /// Returns the instance only if it already exists.
    #[inline]
    fn try_get() -> Option<&'static Self> {
        Self::holder().get()
    }
}

/// Implements [`Singleton`] for a concrete type.
///
/// The initializer expression becomes the body of the holder's initializer
/// closure: it evaluates to `anyhow::Result<Type>` and may use `?`. An
/// optional `strategy = ...` or `config = ...` argument selects the holder
/// configuration. Only concrete, non-generic types are supported, since the
/// holder is a `static`.
///
/// # Example
///
/// ```rust
/// use solo::{singleton, Singleton, Strategy};
///
/// pub struct Settings {
///     pub verbose: bool,
/// }
///
/// singleton!(Settings => Ok(Settings { verbose: true }));
///
/// pub struct Catalog(Vec<&'static str>);
///
/// singleton!(Catalog => Ok(Catalog(vec!["a", "b"])), strategy = Strategy::FullyLocked);
///
/// assert!(Settings::instance().unwrap().verbose);
/// assert!(std::ptr::eq(Settings::instance().unwrap(), Settings::try_get().unwrap()));
/// assert_eq!(Catalog::instance().unwrap().0.len(), 2);
/// ```
#[macro_export]
macro_rules! singleton {
    ($ty:ty => $init:expr, config = $config:expr $(,)?) => {
        impl $crate::Singleton for $ty {
            fn holder() -> &'static $crate::LazySingletonHolder<Self> {
                static HOLDER: $crate::LazySingletonHolder<$ty> =
                    $crate::LazySingletonHolder::with_config($config, || $init);
                &HOLDER
            }
        }
    };
    ($ty:ty => $init:expr, strategy = $strategy:expr $(,)?) => {
        $crate::singleton!($ty => $init, config = $crate::HolderConfig::new().strategy($strategy));
    };
    ($ty:ty => $init:expr $(,)?) => {
        $crate::singleton!($ty => $init, config = $crate::HolderConfig::new());
    };
}
