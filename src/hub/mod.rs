pub mod awareness;
pub mod connections;
pub mod dispatcher;
pub mod group;
pub mod protocol;
pub mod session;
pub mod sync;
pub mod transport;
