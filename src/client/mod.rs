//! 上传客户端：文件选择、预览句柄管理、调用网关与结果下载。
pub mod controller;
pub mod error;
pub mod gateway;
pub mod preview;
pub mod sink;

pub use controller::{DOWNLOAD_FILE_NAME, Snapshot, Stage, SubmitOutcome, UploadController};
pub use error::ClientError;
pub use gateway::{HttpGateway, RemovalGateway, RemovalRequest};
pub use preview::{PreviewHandle, PreviewStore};
pub use sink::{DirectorySink, ResultSink};
