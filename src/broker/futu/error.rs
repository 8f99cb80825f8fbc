use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FutuError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid frame: {0}")]
    Frame(String),

    #[error("OpenD rejected proto {proto_id}: retType={ret_type} errCode={err_code} {msg}")]
    Gateway {
        proto_id: u32,
        ret_type: i32,
        err_code: i32,
        msg: String,
    },

    #[error("Proto {proto_id} returned no s2c body")]
    MissingBody { proto_id: u32 },

    #[error("Proto {proto_id} timed out")]
    Timeout { proto_id: u32 },

    #[error("Connection to OpenD is closed")]
    Disconnected,

    #[error("No trading account matches: {0}")]
    NoAccount(String),
}

pub type FutuResult<T> = Result<T, FutuError>;
