/// 服务器配置 - 店面履约核心的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/folio/store | 工作目录 |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | CURRENCY | EUR | 结算货币 |
/// | TAX_RATE | 0.10 | 订单税率 |
/// | DEFAULT_MAX_DOWNLOADS | 5 | 默认下载次数上限 |
/// | DOWNLOAD_TOKEN_TTL_MINUTES | 30 | 下载令牌有效期(分钟) |
/// | TOKEN_ROTATION_MARGIN_SECS | 300 | 令牌轮换安全边际(秒) |
/// | PUBLIC_BASE_URL | http://localhost:3000 | 下载链接基础地址 |
/// | GATEWAY_URL | (unset) | 支付网关地址 (unset ⇒ mock) |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/folio HTTP_PORT=8080 TAX_RATE=0.21 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、文件、日志
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// 运行环境: development | staging | production
    pub environment: String,

    // === 订单定价 ===
    /// 结算货币 (ISO 4217)
    pub currency: String,
    /// 统一税率 (0.10 = 10%)
    pub tax_rate: f64,

    // === 数字下载 ===
    /// 无产品覆盖时的下载次数上限
    pub default_max_downloads: i64,
    /// 下载令牌有效期 (分钟)
    pub download_token_ttl_minutes: i64,
    /// 令牌轮换安全边际 (秒)
    pub token_rotation_margin_secs: i64,
    /// 下载链接的公共基础地址
    pub public_base_url: String,

    // === 支付网关 ===
    /// 网关 REST 地址 (未设置时使用内置 mock)
    pub gateway_url: Option<String>,
    /// 网关 API 密钥
    pub gateway_secret_key: Option<String>,
    /// Webhook 签名密钥 (未设置时跳过验签)
    pub gateway_webhook_secret: Option<String>,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/folio/store".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),

            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "EUR".into()),
            tax_rate: std::env::var("TAX_RATE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.10),

            default_max_downloads: std::env::var("DEFAULT_MAX_DOWNLOADS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            download_token_ttl_minutes: std::env::var("DOWNLOAD_TOKEN_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            token_rotation_margin_secs: std::env::var("TOKEN_ROTATION_MARGIN_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(300),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),

            gateway_url: std::env::var("GATEWAY_URL").ok(),
            gateway_secret_key: std::env::var("GATEWAY_SECRET_KEY").ok(),
            gateway_webhook_secret: std::env::var("GATEWAY_WEBHOOK_SECRET").ok(),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    // === Work directory structure ===

    pub fn database_dir(&self) -> std::path::PathBuf {
        std::path::PathBuf::from(&self.work_dir).join("database")
    }

    pub fn files_dir(&self) -> std::path::PathBuf {
        std::path::PathBuf::from(&self.work_dir).join("files")
    }

    pub fn logs_dir(&self) -> std::path::PathBuf {
        std::path::PathBuf::from(&self.work_dir).join("logs")
    }

    /// Create the work_dir layout if missing
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        for dir in [self.database_dir(), self.files_dir(), self.logs_dir()] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    // === Derived durations (milliseconds) ===

    pub fn token_ttl_ms(&self) -> i64 {
        self.download_token_ttl_minutes * 60 * 1000
    }

    pub fn token_rotation_margin_ms(&self) -> i64 {
        self.token_rotation_margin_secs * 1000
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
