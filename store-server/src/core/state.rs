use std::sync::Arc;

use sqlx::SqlitePool;

use crate::core::Config;
use crate::db::DbService;
use crate::services::{
    FileStorage, LocalFileStorage, LogMailer, Mailer, MockGateway, PaymentGateway, RestGateway,
};

/// 服务器状态 - 持有所有服务的单例引用
///
/// ServerState 是履约核心的中枢数据结构，持有配置、数据库连接池和
/// 外部协作方 (网关/文件存储/邮件) 的共享引用。
/// 使用 Arc 实现浅拷贝，所有权成本极低。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | pool | SqlitePool | SQLite 连接池 |
/// | gateway | Arc<dyn PaymentGateway> | 支付网关客户端 |
/// | storage | Arc<dyn FileStorage> | 文件存储 |
/// | mailer | Arc<dyn Mailer> | 通知服务 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// SQLite 连接池
    pub pool: SqlitePool,
    /// 支付网关客户端
    pub gateway: Arc<dyn PaymentGateway>,
    /// 文件存储
    pub storage: Arc<dyn FileStorage>,
    /// 通知服务
    pub mailer: Arc<dyn Mailer>,
}

impl ServerState {
    /// 创建服务器状态 (手动构造)
    ///
    /// 通常使用 [`ServerState::initialize`] 方法代替；测试用这个注入
    /// mock 协作方。
    pub fn new(
        config: Config,
        pool: SqlitePool,
        gateway: Arc<dyn PaymentGateway>,
        storage: Arc<dyn FileStorage>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            config,
            pool,
            gateway,
            storage,
            mailer,
        }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录结构
    /// 2. 数据库 (work_dir/database/folio.db)
    /// 3. 协作方 (网关、文件存储、邮件)
    ///
    /// # Panics
    ///
    /// 数据库初始化失败时 panic
    pub async fn initialize(config: &Config) -> Self {
        // 0. Ensure work_dir structure exists
        config
            .ensure_work_dir_structure()
            .expect("Failed to create work directory structure");

        // 1. Initialize DB
        let db_path = config.database_dir().join("folio.db");
        let db_path_str = db_path.to_string_lossy();
        let db_service = DbService::new(&db_path_str)
            .await
            .expect("Failed to initialize database");

        // 2. Collaborators
        let gateway: Arc<dyn PaymentGateway> = match (&config.gateway_url, &config.gateway_secret_key)
        {
            (Some(url), Some(key)) => Arc::new(RestGateway::new(url.clone(), key.clone())),
            _ => {
                tracing::warn!("GATEWAY_URL not configured, using in-process mock gateway");
                Arc::new(MockGateway::new())
            }
        };
        let storage: Arc<dyn FileStorage> = Arc::new(LocalFileStorage::new(
            config.files_dir(),
            config.public_base_url.clone(),
        ));
        let mailer: Arc<dyn Mailer> = Arc::new(LogMailer);

        Self::new(config.clone(), db_service.pool, gateway, storage, mailer)
    }
}
