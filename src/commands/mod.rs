//! # 命令执行模块
//!
//! 串联整个流程：校验参数 → 解析 vasprun.xml → 选择曲线 → 保存图像。
//! 任一步失败即中止，不会写出部分结果。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `parsers/`, `plot/`, `utils/`
//! - 子模块: select

pub mod select;

use crate::cli::Cli;
use crate::error::Result;
use crate::parsers;
use crate::plot::{PlotFormat, PlotOptions};
use crate::utils::{output, progress};

use select::Selection;

/// 执行绘图
pub fn run(cli: Cli) -> Result<()> {
    // 先检查输出格式和轴范围，避免白白解析大文件
    let format = PlotFormat::from_path(&cli.output_file)?;
    let options = PlotOptions {
        width: cli.width,
        height: cli.height,
        xlim: cli.x_limits()?,
        ylim: cli.y_limits()?,
    };

    let spinner = progress::create_spinner(&format!("Reading '{}'", cli.input_file.display()));
    let parsed = parsers::parse_vasprun_file(&cli.input_file);
    spinner.finish_and_clear();
    let cdos = parsed?;

    output::print_info(&format!(
        "Loaded DOS: {} points, {} spin channel(s), E_f = {:.4} eV",
        cdos.total.energies.len(),
        cdos.total.densities.len(),
        cdos.efermi()
    ));

    let selection = Selection {
        elements: cli.elements,
        orbitals: cli.orbitals,
        total: cli.total,
    };
    let mut plot = select::create_plot(&cdos, &selection)?;
    plot.zero_at_efermi = !cli.no_shift;

    output::print_info(&format!("Curves ({}): {}", plot.len(), plot.labels().join(", ")));

    plot.save_plot(&cli.output_file, format, &options)?;

    output::print_success(&format!(
        "Saved {} plot to '{}'",
        format,
        cli.output_file.display()
    ));
    Ok(())
}
