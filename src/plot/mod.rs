//! # 绘图模块
//!
//! 收集 DOS 曲线并保存为图像或数据文件。
//!
//! ## 子模块
//! - `plotter`: 曲线累加与图表渲染
//! - `format`: 由文件名推断输出格式
//! - `export`: 曲线数据导出
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `models/dos.rs`

pub mod export;
pub mod format;
pub mod plotter;

pub use format::PlotFormat;
pub use plotter::{DosPlotter, PlotOptions, TOTAL_DOS_LABEL};
