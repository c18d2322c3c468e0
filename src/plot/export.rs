//! # DOS 曲线数据导出
//!
//! 将已选曲线导出为 CSV 或空白分隔的 `.dat` 文本。
//!
//! ## 列布局
//! 第一列为能量，其后每条曲线一列；自旋极化曲线拆为 `(up)`/`(down)` 两列。
//!
//! ## 依赖关系
//! - 被 `plot/plotter.rs` 调用
//! - 使用 `csv` 库写入 CSV 文件

use crate::error::{DosPlotterError, Result};
use crate::models::Dos;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// 表格化后的曲线数据
struct DosTable {
    header: Vec<String>,
    energies: Vec<f64>,
    columns: Vec<Vec<f64>>,
}

fn build_table(curves: &[(String, Dos)], shift: f64) -> Result<DosTable> {
    let first = curves
        .first()
        .map(|(_, dos)| dos)
        .ok_or_else(|| DosPlotterError::PlotError("No DOS curves to export".to_string()))?;

    let mut header = vec!["energy".to_string()];
    let mut columns = Vec::new();

    for (label, dos) in curves {
        let same_grid = dos.energies.len() == first.energies.len()
            && dos
                .energies
                .iter()
                .zip(&first.energies)
                .all(|(a, b)| (a - b).abs() < 1e-8);
        if !same_grid {
            return Err(DosPlotterError::PlotError(format!(
                "Curve '{}' is on a different energy grid",
                label
            )));
        }

        for (spin, values) in &dos.densities {
            if dos.is_spin_polarized() {
                header.push(format!("{} ({})", label, spin));
            } else {
                header.push(label.clone());
            }
            columns.push(values.clone());
        }
    }

    Ok(DosTable {
        header,
        energies: first.energies.iter().map(|e| e - shift).collect(),
        columns,
    })
}

/// 导出为 CSV
pub fn to_csv(curves: &[(String, Dos)], shift: f64, output_path: &Path) -> Result<()> {
    let table = build_table(curves, shift)?;
    let mut wtr = csv::Writer::from_path(output_path)?;

    wtr.write_record(&table.header)?;

    for (i, energy) in table.energies.iter().enumerate() {
        let mut record = vec![format!("{:.4}", energy)];
        record.extend(table.columns.iter().map(|c| format!("{:.6}", c[i])));
        wtr.write_record(&record)?;
    }

    wtr.flush().map_err(|e| DosPlotterError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// 导出为空白分隔的 `.dat` 文本
pub fn to_dat(curves: &[(String, Dos)], shift: f64, output_path: &Path) -> Result<()> {
    let table = build_table(curves, shift)?;
    let write_err = |e: std::io::Error| DosPlotterError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    };

    let file = File::create(output_path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "# Density of states (states/eV)").map_err(write_err)?;
    if shift != 0.0 {
        writeln!(writer, "# Energies relative to E_f = {:.6} eV", shift).map_err(write_err)?;
    }
    writeln!(writer, "# Columns: {}", table.header.join(" | ")).map_err(write_err)?;

    for (i, energy) in table.energies.iter().enumerate() {
        write!(writer, "{:12.4}", energy).map_err(write_err)?;
        for column in &table.columns {
            write!(writer, " {:14.6}", column[i]).map_err(write_err)?;
        }
        writeln!(writer).map_err(write_err)?;
    }

    writer.flush().map_err(write_err)?;
    Ok(())
}
