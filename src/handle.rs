use std::fmt;
use std::marker::PhantomData;

use crate::id::NodeId;

/// A handle to a reactive value node created with `Runtime::create_value`.
pub struct ValueHandle<T> {
    pub(crate) id: NodeId,
    _marker: PhantomData<fn() -> T>,
}

/// A handle to a memoized expression node created with
/// `Runtime::create_expression`.
pub struct ExprHandle<T> {
    pub(crate) id: NodeId,
    _marker: PhantomData<fn() -> T>,
}

/// A handle to an observer created with `Runtime::create_observer`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle {
    pub(crate) id: NodeId,
}

macro_rules! impl_handle_traits {
    ($name:ident) => {
        impl<T> $name<T> {
            pub(crate) fn new(id: NodeId) -> Self {
                $name {
                    id,
                    _marker: PhantomData,
                }
            }
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<T> Copy for $name<T> {}

        impl<T> PartialEq for $name<T> {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id
            }
        }

        impl<T> Eq for $name<T> {}

        impl<T> std::hash::Hash for $name<T> {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                self.id.hash(state);
            }
        }

        impl<T> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name)).field("id", &self.id).finish()
            }
        }
    };
}

impl_handle_traits!(ValueHandle);
impl_handle_traits!(ExprHandle);

impl ObserverHandle {
    pub(crate) fn new(id: NodeId) -> Self {
        ObserverHandle { id }
    }
}

impl fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverHandle").field("id", &self.id).finish()
    }
}
