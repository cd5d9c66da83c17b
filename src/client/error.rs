use thiserror::Error;

/// 上传客户端错误；`Display` 文本直接展示给用户。
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Choose an image before processing")]
    NoFileSelected,

    #[error("A removal request is already in progress")]
    AlreadyProcessing,

    /// 网关返回非成功状态（消息取自响应体 `error` 字段）
    #[error("{message}")]
    Gateway { status: u16, message: String },

    #[error("gateway response missing image data")]
    MissingImageData,

    #[error("gateway returned an unreadable response: {0}")]
    InvalidResponse(String),

    #[error("gateway returned invalid image data: {0}")]
    InvalidImageData(#[from] base64::DecodeError),

    /// 网络层失败（连接、超时、读取响应体）
    #[error("{0}")]
    Transport(String),

    #[error("failed to save result: {0}")]
    Save(#[from] std::io::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}
