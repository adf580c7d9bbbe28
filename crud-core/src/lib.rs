mod as_value;
mod builder;
mod config;
mod filter;
mod global;
mod introspect;
mod model;
mod operations;
mod queryer;
mod scan;
mod unify;
mod util;
mod value;

pub use ::anyhow::Context;
pub use as_value::*;
pub use builder::*;
pub use config::*;
pub use filter::*;
pub use global::*;
pub use introspect::*;
pub use model::*;
pub use queryer::*;
pub use scan::*;
pub use unify::*;
pub use util::*;
pub use value::*;
pub mod stream {
    pub use ::futures::stream::*;
}
pub use ::futures::future;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
