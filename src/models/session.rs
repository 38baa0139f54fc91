use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// 会话级缓存区：字符串键到任意类型值
pub(crate) type SessionArena = DashMap<String, Box<dyn Any + Send + Sync>>;

struct SessionInner {
    session_id: String,
    user_id: String,
    start_time: DateTime<Utc>,
    arena: SessionArena,
}

/// 会话句柄
///
/// 由调用方在会话开始时创建，克隆开销很小（引用计数）。句柄直接拥有本会话的
/// 缓存区：最后一个克隆被丢弃时，缓存区随之释放，无需显式清理。
/// 会话身份以句柄本身为准，而不是 `session_id` 字符串：两个用相同 id
/// 分别创建的句柄互不共享缓存。
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<SessionInner>,
}

impl SessionContext {
    /// 用指定 id 创建会话
    pub fn new(session_id: &str, user_id: &str) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                session_id: session_id.to_string(),
                user_id: user_id.to_string(),
                start_time: Utc::now(),
                arena: DashMap::new(),
            }),
        }
    }

    /// 以随机 id 开始一个新会话
    pub fn start(user_id: &str) -> Self {
        Self::new(&Uuid::new_v4().to_string(), user_id)
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn user_id(&self) -> &str {
        &self.inner.user_id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.inner.start_time
    }

    /// 是否为同一个会话句柄（按身份比较）
    pub fn same_session(&self, other: &SessionContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// 获取不延长会话生命周期的弱引用
    pub fn downgrade(&self) -> WeakSessionContext {
        WeakSessionContext {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// 当前存活的句柄克隆数量
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    pub(crate) fn arena(&self) -> &SessionArena {
        &self.inner.arena
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("session_id", &self.inner.session_id)
            .field("user_id", &self.inner.user_id)
            .field("start_time", &self.inner.start_time)
            .field("cached_entries", &self.inner.arena.len())
            .finish()
    }
}

/// 会话句柄的弱引用
#[derive(Clone, Default)]
pub struct WeakSessionContext {
    inner: Weak<SessionInner>,
}

impl WeakSessionContext {
    /// 会话仍存活时返回强句柄
    pub fn upgrade(&self) -> Option<SessionContext> {
        self.inner.upgrade().map(|inner| SessionContext { inner })
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl fmt::Debug for WeakSessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakSessionContext")
            .field("alive", &self.is_alive())
            .finish()
    }
}
