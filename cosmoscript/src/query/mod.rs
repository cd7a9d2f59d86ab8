mod builder;
pub use builder::*;

mod filter;
pub use filter::*;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("bad field `{field}`")]
    BadField { field: String },
    #[error("unsupported operation `{op}` on field `{field}`")]
    UnsupportedOp { field: String, op: &'static str },
}
