pub mod access;

pub use access::authenticate;
