//! Domain services
//!
//! # 模块结构
//!
//! - [`order_service`] - 订单生命周期管理
//! - [`payment_service`] - 支付对账引擎
//! - [`digital_service`] - 数字下载访问控制
//! - [`gateway`] - 支付网关客户端
//! - [`file_storage`] - 文件存储
//! - [`notification`] - 通知服务

pub mod digital_service;
pub mod file_storage;
pub mod gateway;
pub mod notification;
pub mod order_service;
pub mod payment_service;

pub use file_storage::{FileStorage, LocalFileStorage};
pub use gateway::{MockGateway, PaymentGateway, RestGateway};
pub use notification::{LogMailer, Mailer, Notification};
pub use payment_service::WebhookOutcome;
