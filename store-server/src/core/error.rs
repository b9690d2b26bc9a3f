use thiserror::Error;

/// Server runner errors (startup / shutdown); request-level failures use
/// [`shared::error::AppError`].
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("内部服务器错误")]
    Internal(#[from] anyhow::Error),
}

/// 服务器启动的 Result 类型别名
pub type Result<T> = std::result::Result<T, ServerError>;
