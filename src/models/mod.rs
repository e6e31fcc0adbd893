//! 数据模型模块
//! 管理端身份、角色/权限目录、角色分配、访问审查与审计日志

pub mod admin_user;
pub mod assignment;
pub mod audit;
pub mod permission;
pub mod review;
pub mod role;
