//! # dos-plotter - VASP 态密度绘图工具
//!
//! 读取 vasprun.xml，按元素/轨道筛选态密度曲线并保存为图像。
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (流程与曲线选择)
//!   │     ├── parsers/   (vasprun.xml 解析)
//!   │     ├── models/    (态密度数据模型)
//!   │     └── plot/      (绘图与导出)
//!   ├── utils/      (输出工具)
//!   └── error.rs    (错误处理)
//! ```

mod cli;
mod commands;
mod error;
mod models;
mod parsers;
mod plot;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli) {
        utils::output::print_error_chain(&e);
        std::process::exit(1);
    }
}
