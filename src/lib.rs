//! A fine-grained, single-threaded reactive dataflow engine.
//!
//! Three node kinds — mutable [values](ValueHandle), memoized
//! [expressions](ExprHandle), and side-effecting [observers](ObserverHandle)
//! — form a dependency graph whose edges are re-derived on every evaluation.
//! Writing a value invalidates its dependents transitively; [`Runtime::flush`]
//! drains the resulting queue of pending observers to a fixed point, pulling
//! memoized expressions along the way.
//!
//! ```
//! use reactive_core::Runtime;
//!
//! let rt = Runtime::new();
//! let count = rt.create_value(0i64);
//!
//! let doubled = {
//!     let rt = rt.clone();
//!     rt.create_expression(move || rt.read_value(count).unwrap() * 2)
//! };
//!
//! let rt2 = rt.clone();
//! let _printer = rt.create_observer(move || {
//!     let _ = rt2.read_expression(doubled).unwrap();
//! });
//!
//! rt.flush().unwrap();
//! rt.write_value(count, 21).unwrap();
//! rt.flush().unwrap();
//! assert_eq!(rt.read_expression(doubled).unwrap(), 42);
//! ```
//!
//! The core graph, invalidation, and flush algorithms are the only in-scope
//! behavior; there is no wire protocol, persistence, or cross-thread
//! scheduling (see `SPEC_FULL.md` in the repository root for the full
//! specification this crate implements).

mod arena;
mod context;
mod error;
mod handle;
mod id;
mod node;
mod runtime;
mod value;

pub use error::RuntimeError;
pub use handle::{ExprHandle, ObserverHandle, ValueHandle};
pub use runtime::{ExecCounted, Runtime, RuntimeConfig};
pub use value::Payload;
