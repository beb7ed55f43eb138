//! napi-rs bindings exposing `helloAsync` to Node.js.
//!
//! The task itself (validation, execution and result delivery) lives in the
//! `hello-async` crate; this crate supplies the Node host context and uses
//! libuv's thread pool as the scheduler.

#[macro_use]
extern crate napi_derive;

mod bridge;
mod error;

/// Returns the version of the hello-async-node package.
#[napi]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub use bridge::hello_async;
