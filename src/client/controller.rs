use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

use super::error::ClientError;
use super::gateway::{RemovalGateway, RemovalRequest};
use super::preview::{PreviewHandle, PreviewStore};
use super::sink::ResultSink;
use crate::features::removal::{RemovalResult, UploadedFile};

/// 下载结果时使用的固定文件名。
pub const DOWNLOAD_FILE_NAME: &str = "background-removed.png";

const MSG_INITIAL: &str = "Upload an image to begin";
const MSG_READY: &str = "Ready to remove the background";
const MSG_UPLOADING: &str = "Uploading to background removal service...";
const MSG_DONE: &str = "Background removed. Download or compare below.";
const MSG_RETRY: &str = "Retry when you are ready.";

/// 上传流程阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Idle,
    Processing,
    Done,
}

/// 一次 submit 的结局。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// 结果（或错误）已写入当前状态
    Completed,
    /// 期间用户已重新选择文件或发起了新请求，本次响应被丢弃
    Superseded,
}

/// 当前生效的结果及其预览句柄。
struct LiveResult {
    result: RemovalResult,
    preview: PreviewHandle,
}

struct Session {
    file: Option<UploadedFile>,
    original_preview: Option<PreviewHandle>,
    result: Option<LiveResult>,
    stage: Stage,
    message: String,
    error: Option<String>,
    /// 每次 select / submit / download 自增，用于识别过期响应
    sequence: u64,
}

impl Session {
    fn new() -> Self {
        Self {
            file: None,
            original_preview: None,
            result: None,
            stage: Stage::Idle,
            message: MSG_INITIAL.to_string(),
            error: None,
            sequence: 0,
        }
    }

    fn can_process(&self) -> bool {
        self.file.is_some() && self.stage != Stage::Processing
    }
}

/// 对外展示用的只读状态快照。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub stage: Stage,
    pub message: String,
    pub error: Option<String>,
    pub file_name: Option<String>,
    pub original_preview: Option<String>,
    pub result_preview: Option<String>,
    pub can_process: bool,
}

/// 上传控制器：管理文件选择、预览句柄、抠图请求与结果下载。
///
/// 内部状态由互斥锁保护，锁不会跨越 `.await` 持有，
/// 因此多个 `submit` 可以重叠执行，过期响应通过序号丢弃。
pub struct UploadController<G> {
    gateway: G,
    previews: PreviewStore,
    credential: Option<String>,
    session: Mutex<Session>,
}

impl<G: RemovalGateway> UploadController<G> {
    pub fn new(gateway: G, credential: Option<String>) -> Self {
        Self::with_store(gateway, credential, PreviewStore::new())
    }

    pub fn with_store(gateway: G, credential: Option<String>, previews: PreviewStore) -> Self {
        Self {
            gateway,
            previews,
            credential: credential.filter(|c| !c.is_empty()),
            session: Mutex::new(Session::new()),
        }
    }

    pub fn previews(&self) -> &PreviewStore {
        &self.previews
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 选择新文件：释放旧预览、清空结果与错误，并使在途请求失效。
    ///
    /// 返回新原图的预览地址。
    pub fn select_file(&self, file: UploadedFile) -> String {
        let mut s = self.session();
        s.original_preview = None;
        s.result = None;

        let preview = self.previews.create_object_url();
        let url = preview.url().to_string();
        tracing::debug!(file_name = file.upload_name(), bytes = file.len(), "已选择文件");

        s.original_preview = Some(preview);
        s.file = Some(file);
        s.error = None;
        s.stage = Stage::Idle;
        s.message = MSG_READY.to_string();
        s.sequence += 1;
        url
    }

    /// 提交当前文件进行抠图。
    pub async fn submit(&self) -> Result<SubmitOutcome, ClientError> {
        let (sequence, request) = {
            let mut s = self.session();
            if s.stage == Stage::Processing {
                return Err(ClientError::AlreadyProcessing);
            }
            let Some(file) = s.file.clone() else {
                s.error = Some(ClientError::NoFileSelected.to_string());
                return Err(ClientError::NoFileSelected);
            };

            s.sequence += 1;
            s.stage = Stage::Processing;
            s.error = None;
            s.message = MSG_UPLOADING.to_string();
            let request = RemovalRequest {
                file,
                credential: self.credential.clone(),
            };
            (s.sequence, request)
        };

        let outcome = match self.gateway.remove_background(request).await {
            Ok(response) => response
                .decode()
                .map(|result| (response.data_uri(), result))
                .map_err(ClientError::from),
            Err(e) => Err(e),
        };

        let mut s = self.session();
        if s.sequence != sequence {
            tracing::debug!(sequence, latest = s.sequence, "丢弃过期的抠图响应");
            return Ok(SubmitOutcome::Superseded);
        }

        match outcome {
            Ok((data_uri, result)) => {
                // 先释放旧结果，再登记新结果
                drop(s.result.take());
                let preview = self.previews.register_data_uri(data_uri);
                s.result = Some(LiveResult { result, preview });
                s.stage = Stage::Done;
                s.message = MSG_DONE.to_string();
                Ok(SubmitOutcome::Completed)
            }
            Err(e) => {
                tracing::warn!("抠图失败: {}", e);
                s.error = Some(e.to_string());
                s.stage = Stage::Idle;
                s.message = MSG_RETRY.to_string();
                Err(e)
            }
        }
    }

    /// 保存当前结果并清空原图/结果预览；没有结果时什么都不做并返回 `false`。
    pub fn download<S: ResultSink + ?Sized>(&self, sink: &mut S) -> Result<bool, ClientError> {
        let mut s = self.session();
        let Some(live) = s.result.as_ref() else {
            return Ok(false);
        };
        sink.save(DOWNLOAD_FILE_NAME, &live.result)?;

        s.result = None;
        s.original_preview = None;
        s.file = None;
        s.stage = Stage::Idle;
        s.message = MSG_INITIAL.to_string();
        s.sequence += 1;
        Ok(true)
    }

    /// 关闭错误提示。
    pub fn dismiss_error(&self) {
        self.session().error = None;
    }

    /// 当前结果（若有）。
    pub fn result(&self) -> Option<RemovalResult> {
        self.session().result.as_ref().map(|r| r.result.clone())
    }

    pub fn snapshot(&self) -> Snapshot {
        let s = self.session();
        Snapshot {
            stage: s.stage,
            message: s.message.clone(),
            error: s.error.clone(),
            file_name: s.file.as_ref().and_then(|f| f.file_name.clone()),
            original_preview: s.original_preview.as_ref().map(|p| p.url().to_string()),
            result_preview: s.result.as_ref().map(|r| r.preview.url().to_string()),
            can_process: s.can_process(),
        }
    }
}
