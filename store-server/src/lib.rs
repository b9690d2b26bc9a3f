//! Folio Store Server - 出版物店面履约核心
//!
//! # 架构概述
//!
//! 本模块是店面订单履约后端的主入口，提供以下核心功能：
//!
//! - **订单生命周期** (`services/order_service`): 购物车转订单、状态机、取消补偿
//! - **支付对账** (`services/payment_service`): 网关回调与线下审批的幂等收敛
//! - **数字下载** (`services/digital_service`): 轮换令牌、下载限额、过期清理
//! - **数据库** (`db`): 嵌入式 SQLite (sqlx) 存储
//! - **HTTP API** (`api`): RESTful API 接口
//!
//! # 模块结构
//!
//! ```text
//! store-server/src/
//! ├── core/          # 配置、状态、服务器
//! ├── services/      # 订单、支付、数字下载、协作方接口
//! ├── api/           # HTTP 路由和处理器
//! ├── db/            # 数据库层 (repository)
//! ├── money/         # Decimal 金额运算
//! └── utils/         # 工具函数
//! ```

pub mod api;
pub mod core;
pub mod db;
pub mod money;
pub mod services;
pub mod utils;

// Re-export 公共类型
pub use crate::core::{Config, Server, ServerState};
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境 (dotenv + 日志)
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let log_level = std::env::var("LOG_LEVEL").ok();
    init_logger_with_file(log_level.as_deref(), None);
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    ______      ___
   / ____/___  / (_)___
  / /_  / __ \/ / / __ \
 / __/ / /_/ / / / /_/ /
/_/    \____/_/_/\____/
    "#
    );
}
