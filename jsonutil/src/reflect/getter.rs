//! Computed members: zero-argument accessors registered for a record type.

use alloc::boxed::Box;
use alloc::string::String;
use core::fmt;

use facet::Facet;
use facet_core::Shape;
use facet_reflect::Peek;

use super::attrs::Visibility;

/// A value produced by a getter, owned by the encoder while it is written.
pub trait Computed {
    /// A view of the value for the encoder.
    fn peek(&self) -> Peek<'_, 'static>;
}

impl<V: Facet<'static>> Computed for V {
    fn peek(&self) -> Peek<'_, 'static> {
        Peek::new(self)
    }
}

type GetterCall = Box<
    dyn for<'mem, 'facet> Fn(Peek<'mem, 'facet>) -> Option<Result<Box<dyn Computed>, String>>
        + Send
        + Sync,
>;

// Closures only get a higher-ranked signature when one is expected at the
// definition site.
fn getter_call<F>(f: F) -> F
where
    F: for<'mem, 'facet> Fn(Peek<'mem, 'facet>) -> Option<Result<Box<dyn Computed>, String>>,
{
    f
}

/// A getter of a record type, registered with
/// [`TypeRegistry::add_getter`](super::TypeRegistry::add_getter).
///
/// A getter named `get` followed by an uppercase letter (or `is` followed by
/// an uppercase letter, returning `bool`) is preferred over the field it
/// names, provided its return type is compatible with the field's.
///
/// ```
/// use jsonutil::Facet;
/// use jsonutil::reflect::{Getter, TypeRegistry};
///
/// #[derive(Facet)]
/// struct Celsius {
///     degrees: f64,
/// }
///
/// TypeRegistry::add_getter(Getter::new("getFahrenheit", |c: &Celsius| c.degrees * 1.8 + 32.0));
/// ```
pub struct Getter {
    /// Accessor name
    pub name: &'static str,
    /// Declared visibility
    pub visibility: Visibility,
    /// Declared return type
    pub returns: &'static Shape,
    /// The record type the getter reads
    pub owner: &'static Shape,
    call: GetterCall,
}

impl Getter {
    /// A public getter returning an owned value.
    pub fn new<T, V>(name: &'static str, f: fn(&T) -> V) -> Self
    where
        T: for<'a> Facet<'a> + 'static,
        V: Facet<'static> + 'static,
    {
        Getter {
            name,
            visibility: Visibility::Public,
            returns: V::SHAPE,
            owner: <T as Facet<'static>>::SHAPE,
            call: Box::new(getter_call(move |peek| {
                let owner = peek.get::<T>().ok()?;
                Some(Ok(Box::new(f(owner)) as Box<dyn Computed>))
            })),
        }
    }

    /// A public getter that can fail.
    pub fn try_new<T, V>(name: &'static str, f: fn(&T) -> Result<V, String>) -> Self
    where
        T: for<'a> Facet<'a> + 'static,
        V: Facet<'static> + 'static,
    {
        Getter {
            name,
            visibility: Visibility::Public,
            returns: V::SHAPE,
            owner: <T as Facet<'static>>::SHAPE,
            call: Box::new(getter_call(move |peek| {
                let owner = peek.get::<T>().ok()?;
                Some(f(owner).map(|v| Box::new(v) as Box<dyn Computed>))
            })),
        }
    }

    /// Set the declared visibility.
    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Returns true if the name and return type follow the getter
    /// convention.
    pub fn is_getter(&self) -> bool {
        if self.returns == <() as Facet>::SHAPE {
            return false;
        }
        let rest = if let Some(rest) = self.name.strip_prefix("get") {
            rest
        } else if let Some(rest) = self.name.strip_prefix("is") {
            if self.returns != bool::SHAPE {
                return false;
            }
            rest
        } else {
            return false;
        };
        rest.chars().next().is_some_and(char::is_uppercase)
    }

    /// Call the getter on a value of its record type. `None` if the value
    /// has another type.
    pub fn invoke(&self, record: Peek<'_, '_>) -> Option<Result<Box<dyn Computed>, String>> {
        (self.call)(record)
    }
}

impl fmt::Debug for Getter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Getter")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .field("returns", &self.returns)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}
