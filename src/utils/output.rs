//! # 美化输出工具
//!
//! 提供统一的终端输出样式。状态信息写 stdout，错误写 stderr。
//!
//! ## 依赖关系
//! - 被 `main.rs`, `commands/` 使用
//! - 使用 `colored` crate

use colored::Colorize;

/// 打印成功消息
pub fn print_success(msg: &str) {
    println!("{} {}", "[OK]".green().bold(), msg);
}

/// 打印错误消息
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "[ERR]".red().bold(), msg);
}

/// 打印信息消息
pub fn print_info(msg: &str) {
    println!("{} {}", "[*]".blue().bold(), msg);
}

/// 打印错误及其来源链
pub fn print_error_chain(err: &dyn std::error::Error) {
    print_error(&err.to_string());
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("      {} {}", "caused by:".dimmed(), cause);
        source = cause.source();
    }
}
