use std::any::Any;
use std::fmt;

/// Type-erased storage for a node's payload.
///
/// Value and expression nodes hold a `Box<dyn DynValue>` so the arena can
/// store heterogeneous payload types behind one `Slot` representation (spec
/// §9: "no dynamic dispatch needed beyond... the three-node tagged-variant
/// discriminator"). Equality is host-structural `PartialEq` on the concrete
/// type; two payloads of different concrete types are never compared in
/// practice since a node's type is fixed at creation.
pub(crate) trait DynValue: Any + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn dyn_eq(&self, other: &dyn DynValue) -> bool;
    fn dyn_clone(&self) -> Box<dyn DynValue>;
}

impl<T> DynValue for T
where
    T: Any + fmt::Debug + PartialEq + Clone,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn DynValue) -> bool {
        match other.as_any().downcast_ref::<T>() {
            Some(other) => self == other,
            None => false,
        }
    }

    fn dyn_clone(&self) -> Box<dyn DynValue> {
        Box::new(self.clone())
    }
}

impl dyn DynValue {
    pub(crate) fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

/// Bound required of any payload stored in a value or expression node.
pub trait Payload: Any + fmt::Debug + PartialEq + Clone {}
impl<T> Payload for T where T: Any + fmt::Debug + PartialEq + Clone {}
