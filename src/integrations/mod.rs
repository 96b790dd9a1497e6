//! 渠道适配：WhatsApp Webhook 与 Web 聊天 API（对应 feature 开启时编译）

#[cfg(feature = "web")]
pub mod web;
#[cfg(feature = "whatsapp")]
pub mod whatsapp;
