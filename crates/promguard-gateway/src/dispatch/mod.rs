//! Endpoint dispatch table.

pub mod table;

pub use table::{Endpoint, PathPattern, Route, RouteTable};
