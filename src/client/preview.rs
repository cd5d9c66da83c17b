use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use uuid::Uuid;

type Registry = HashMap<Uuid, String>;

/// 预览句柄登记表。
///
/// 每个 [`PreviewHandle`] 在创建时登记、在 `Drop` 时注销，
/// 登记表中的条目数即为当前尚未释放的预览资源数量。
#[derive(Debug, Clone, Default)]
pub struct PreviewStore {
    inner: Arc<Mutex<Registry>>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // 登记表只存字符串，持锁期间不会 panic，中毒时直接沿用数据
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 为原始图片创建 `blob:` 形式的本地预览地址。
    pub fn create_object_url(&self) -> PreviewHandle {
        let id = Uuid::new_v4();
        self.register(id, format!("blob:bg-remover/{id}"))
    }

    /// 为结果图片登记 data URI 预览。
    pub fn register_data_uri(&self, data_uri: String) -> PreviewHandle {
        self.register(Uuid::new_v4(), data_uri)
    }

    fn register(&self, id: Uuid, url: String) -> PreviewHandle {
        self.registry().insert(id, url.clone());
        PreviewHandle {
            id,
            url,
            store: self.clone(),
        }
    }

    fn release(&self, id: &Uuid) {
        if self.registry().remove(id).is_some() {
            tracing::trace!(%id, "预览句柄已释放");
        }
    }

    /// 尚未释放的预览数量。
    pub fn live_count(&self) -> usize {
        self.registry().len()
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.registry().values().any(|u| u == url)
    }
}

/// 独占的预览资源句柄，离开作用域即释放。
pub struct PreviewHandle {
    id: Uuid,
    url: String,
    store: PreviewStore,
}

impl PreviewHandle {
    /// 可直接作为图片源使用的地址。
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // data URI 可能有数 MB，只打印前缀
        let shown: String = self.url.chars().take(48).collect();
        f.debug_struct("PreviewHandle")
            .field("id", &self.id)
            .field("url", &shown)
            .finish()
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.store.release(&self.id);
    }
}
