use axum::body::Bytes;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::multipart::Part;
use serde::{Deserialize, Serialize};

/// 上传文件缺少文件名时，转发给上游使用的占位文件名。
pub const FALLBACK_FILE_NAME: &str = "upload-from-bgremover.png";

/// 上游未声明 content-type 时的默认媒体类型。
pub const DEFAULT_IMAGE_TYPE: &str = "image/png";

/// 一次会话中选中的待处理图片（仅驻留内存）。
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub media_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn new(
        file_name: Option<String>,
        media_type: Option<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name,
            media_type,
            data: data.into(),
        }
    }

    /// 转发时使用的文件名：原始文件名为空则回退到占位名。
    pub fn upload_name(&self) -> &str {
        self.file_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(FALLBACK_FILE_NAME)
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref().filter(|m| !m.is_empty())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 构造转发用的 multipart 文件段；媒体类型非法时省略该头。
    pub fn multipart_part(&self) -> Part {
        let build = || {
            Part::stream_with_length(self.data.clone(), self.len() as u64)
                .file_name(self.upload_name().to_string())
        };
        match self.media_type() {
            Some(media_type) => build().mime_str(media_type).unwrap_or_else(|_| {
                tracing::debug!("忽略无效的上传媒体类型: {}", media_type);
                build()
            }),
            None => build(),
        }
    }
}

/// 抠图结果：二进制图片 + 媒体类型。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalResult {
    pub data: Bytes,
    pub content_type: String,
}

impl RemovalResult {
    pub fn new(data: impl Into<Bytes>, content_type: Option<&str>) -> Self {
        Self {
            data: data.into(),
            content_type: content_type
                .filter(|t| !t.is_empty())
                .unwrap_or(DEFAULT_IMAGE_TYPE)
                .to_string(),
        }
    }

    pub fn to_response(&self) -> RemovalResponse {
        RemovalResponse {
            image_base64: STANDARD.encode(&self.data),
            content_type: self.content_type.clone(),
        }
    }
}

/// 网关请求体（仅用于 OpenAPI 描述 multipart 表单）
#[derive(Debug, utoipa::ToSchema)]
pub struct RemovalUpload {
    /// 待处理的图片文件，必须是文件段
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// 网关成功响应体
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RemovalResponse {
    /// 处理后图片的 base64（标准字母表，带填充）
    pub image_base64: String,
    /// 处理后图片的媒体类型
    #[schema(example = "image/png")]
    pub content_type: String,
}

impl RemovalResponse {
    /// 可直接作为图片源渲染的 data URI。
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.content_type, self.image_base64)
    }

    pub fn decode(&self) -> Result<RemovalResult, base64::DecodeError> {
        let data = STANDARD.decode(self.image_base64.as_bytes())?;
        Ok(RemovalResult::new(data, Some(&self.content_type)))
    }
}
