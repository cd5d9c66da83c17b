use std::io;
use std::path::{Path, PathBuf};

use crate::features::removal::RemovalResult;

/// 结果保存目标（相当于浏览器的“下载”动作）。
pub trait ResultSink {
    fn save(&mut self, file_name: &str, result: &RemovalResult) -> io::Result<()>;
}

/// 把结果写入指定目录。
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    last_saved: Option<PathBuf>,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            last_saved: None,
        }
    }

    /// 最近一次写入的文件路径。
    pub fn last_saved(&self) -> Option<&Path> {
        self.last_saved.as_deref()
    }
}

impl ResultSink for DirectorySink {
    fn save(&mut self, file_name: &str, result: &RemovalResult) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, &result.data)?;
        tracing::info!(path = %path.display(), bytes = result.data.len(), "结果已保存");
        self.last_saved = Some(path);
        Ok(())
    }
}
