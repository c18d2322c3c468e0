//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数。
//!
//! ## 参数
//! - `-e/--element`: 元素（可重复）
//! - `--orbital`: 轨道，角量子数或字母（可重复）
//! - `-t/--total`: 同时绘制总态密度
//! - `--input-file` / `--output-file`: 输入 vasprun.xml 与输出图像
//! - `-V/--version`: 打印版本
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 参数传递给 `commands/`

use crate::error::{DosPlotterError, Result};
use crate::models::OrbitalType;

use clap::Parser;
use std::path::PathBuf;

/// dos-plotter - 从 VASP 计算绘制态密度图
#[derive(Parser, Debug)]
#[command(name = "dos-plotter")]
#[command(version)]
#[command(about = "Create a Density of States plot from a VASP calculation", long_about = None)]
#[command(after_help = "Examples:\n  dos-plotter --element Co --orbital d --total --input-file vasprun.xml --output-file co-dos.svg")]
pub struct Cli {
    /// Include the DOS of the given element. May be repeated. If omitted, all elements are used for --orbital
    #[arg(short = 'e', long = "element", value_name = "ELEMENT")]
    pub elements: Vec<String>,

    /// Include the DOS of the given orbital, by azimuthal quantum number (0 = s, 1 = p, 2 = d, 3 = f) or letter. May be repeated
    #[arg(long = "orbital", value_name = "ORBITAL")]
    pub orbitals: Vec<OrbitalType>,

    /// Plot the total DOS alongside all other selected DOS
    #[arg(short, long, default_value_t = false)]
    pub total: bool,

    /// Path to the 'vasprun.xml' file from the calculation
    #[arg(long, default_value = "vasprun.xml")]
    pub input_file: PathBuf,

    /// Output file. The format is inferred from the extension (png, jpg, bmp, svg, csv, dat); png if there is none
    #[arg(long, default_value = "dos.png")]
    pub output_file: PathBuf,

    /// Energy axis limits in eV
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], allow_negative_numbers = true)]
    pub xlim: Option<Vec<f64>>,

    /// DOS axis limits
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], allow_negative_numbers = true)]
    pub ylim: Option<Vec<f64>>,

    /// Figure width in pixels (for bitmaps) or points (for SVG)
    #[arg(long, default_value_t = 1200, value_parser = clap::value_parser!(u32).range(1..))]
    pub width: u32,

    /// Figure height in pixels (for bitmaps) or points (for SVG)
    #[arg(long, default_value_t = 800, value_parser = clap::value_parser!(u32).range(1..))]
    pub height: u32,

    /// Plot absolute energies instead of E - E_f
    #[arg(long, default_value_t = false)]
    pub no_shift: bool,
}

impl Cli {
    pub fn x_limits(&self) -> Result<Option<(f64, f64)>> {
        parse_limits("--xlim", self.xlim.as_deref())
    }

    pub fn y_limits(&self) -> Result<Option<(f64, f64)>> {
        parse_limits("--ylim", self.ylim.as_deref())
    }
}

/// 校验轴范围：有限值且 MIN < MAX
fn parse_limits(flag: &str, values: Option<&[f64]>) -> Result<Option<(f64, f64)>> {
    match values {
        None => Ok(None),
        Some([min, max]) if min.is_finite() && max.is_finite() && min < max => {
            Ok(Some((*min, *max)))
        }
        Some([min, max]) => Err(DosPlotterError::InvalidArgument(format!(
            "{} expects finite MIN < MAX, got {} {}",
            flag, min, max
        ))),
        Some(other) => Err(DosPlotterError::InvalidArgument(format!(
            "{} expects exactly two values, got {}",
            flag,
            other.len()
        ))),
    }
}
