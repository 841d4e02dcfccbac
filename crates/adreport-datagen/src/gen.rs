//! The generator trait.

use rand::RngCore;

/// Draws one value of type `T` per call. Everything drawn depends only on
/// the state of `rng`, so a seeded rng replays the same events.
pub trait Gen<T> {
    fn generate(&self, rng: &mut dyn RngCore) -> T;

    /// Post-process every drawn value.
    fn map<U, F>(self, f: F) -> Map<Self, F, T>
    where
        Self: Sized,
        F: Fn(T) -> U,
    {
        Map {
            inner: self,
            f,
            _drawn: std::marker::PhantomData,
        }
    }
}

/// Returned by [`Gen::map`].
pub struct Map<G, F, T> {
    inner: G,
    f: F,
    _drawn: std::marker::PhantomData<T>,
}

impl<T, U, G, F> Gen<U> for Map<G, F, T>
where
    G: Gen<T>,
    F: Fn(T) -> U,
{
    fn generate(&self, rng: &mut dyn RngCore) -> U {
        let drawn = self.inner.generate(rng);
        (self.f)(drawn)
    }
}
