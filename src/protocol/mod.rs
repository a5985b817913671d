//! Request/response protocol shared by every transport.

#![allow(unused_imports)]

pub mod dispatcher;
pub mod request;
pub mod response;

pub use dispatcher::*;
pub use request::*;
pub use response::*;
