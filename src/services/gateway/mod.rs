pub mod proxy;
pub mod routes;

pub use proxy::ProxyClient;
pub use routes::{Access, PathRewrite, RouteEntry, RouteTable, Target, is_traversal};
