//! # 数据模型模块
//!
//! 定义态密度相关的核心数据结构。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `plot/`, `commands/` 使用
//! - 子模块: dos

pub mod dos;

pub use dos::{capitalize_symbol, CompleteDos, Dos, OrbitalType, SiteDos, Spin};
