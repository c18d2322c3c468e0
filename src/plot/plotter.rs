//! # DOS 图表生成
//!
//! `DosPlotter` 按添加顺序收集带标签的态密度曲线，最后一次性保存。
//! 使用 `plotters` 渲染，位图由 `image` 按推断出的格式显式编码。
//!
//! ## 依赖关系
//! - 被 `commands/` 调用
//! - 使用 `models/dos.rs` 的 Dos 结构
//! - 使用 `plot/format.rs`, `plot/export.rs`

use crate::error::{DosPlotterError, Result};
use crate::models::{Dos, Spin};
use crate::plot::export;
use crate::plot::PlotFormat;

use plotters::prelude::*;
use std::path::Path;

/// 总态密度曲线的标签
pub const TOTAL_DOS_LABEL: &str = "Total DOS";

/// 渲染参数
#[derive(Debug, Clone)]
pub struct PlotOptions {
    pub width: u32,
    pub height: u32,
    pub xlim: Option<(f64, f64)>,
    pub ylim: Option<(f64, f64)>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        PlotOptions {
            width: 1200,
            height: 800,
            xlim: None,
            ylim: None,
        }
    }
}

/// 态密度曲线累加器
#[derive(Debug, Clone)]
pub struct DosPlotter {
    curves: Vec<(String, Dos)>,

    /// 能量以费米能级为零点
    pub zero_at_efermi: bool,
}

impl DosPlotter {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        DosPlotter {
            curves: Vec::new(),
            zero_at_efermi: true,
        }
    }

    /// 追加一条曲线（不去重）
    pub fn add_dos(&mut self, label: impl Into<String>, dos: Dos) {
        self.curves.push((label.into(), dos));
    }

    pub fn curves(&self) -> &[(String, Dos)] {
        &self.curves
    }

    pub fn labels(&self) -> Vec<&str> {
        self.curves().iter().map(|(label, _)| label.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// 能量平移量
    fn shift(&self) -> f64 {
        match (self.zero_at_efermi, self.curves.first()) {
            (true, Some((_, dos))) => dos.efermi,
            _ => 0.0,
        }
    }

    /// 保存到文件
    pub fn save_plot(&self, output_path: &Path, format: PlotFormat, options: &PlotOptions) -> Result<()> {
        if self.is_empty() {
            return Err(DosPlotterError::PlotError("No DOS curves to plot".to_string()));
        }

        match format {
            PlotFormat::Csv => export::to_csv(&self.curves, self.shift(), output_path),
            PlotFormat::Dat => export::to_dat(&self.curves, self.shift(), output_path),
            PlotFormat::Svg => {
                let root = SVGBackend::new(output_path, (options.width, options.height))
                    .into_drawing_area();
                self.draw_dos_chart(&root, options)?;
                root.present()
                    .map_err(|e| DosPlotterError::PlotError(e.to_string()))?;
                Ok(())
            }
            PlotFormat::Png | PlotFormat::Jpeg | PlotFormat::Bmp => {
                self.save_bitmap(output_path, format, options)
            }
        }
    }

    /// 先渲染到内存，再按指定格式编码，文件名无扩展名时同样可用
    fn save_bitmap(&self, output_path: &Path, format: PlotFormat, options: &PlotOptions) -> Result<()> {
        let image_format = format
            .image_format()
            .ok_or_else(|| DosPlotterError::UnsupportedFormat(format.to_string()))?;

        let (width, height) = (options.width, options.height);
        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            self.draw_dos_chart(&root, options)?;
            root.present()
                .map_err(|e| DosPlotterError::PlotError(e.to_string()))?;
        }

        image::save_buffer_with_format(
            output_path,
            &buffer,
            width,
            height,
            image::ColorType::Rgb8,
            image_format,
        )
        .map_err(|e| match e {
            image::ImageError::IoError(source) => DosPlotterError::FileWriteError {
                path: output_path.display().to_string(),
                source,
            },
            other => DosPlotterError::PlotError(other.to_string()),
        })
    }

    /// 数据范围: (x_min, x_max, y_min, y_max)
    fn data_range(&self) -> (f64, f64, f64, f64) {
        let shift = self.shift();
        let mut x_min = f64::INFINITY;
        let mut x_max = f64::NEG_INFINITY;
        let mut y_max: f64 = 0.0;
        let mut y_min: f64 = 0.0;

        for (_, dos) in &self.curves {
            for e in &dos.energies {
                x_min = x_min.min(e - shift);
                x_max = x_max.max(e - shift);
            }
            for (spin, values) in &dos.densities {
                let peak = values.iter().copied().fold(0.0, f64::max);
                match spin {
                    Spin::Up => y_max = y_max.max(peak),
                    Spin::Down => y_min = y_min.min(-peak),
                }
            }
        }

        if !x_min.is_finite() || !x_max.is_finite() || x_min >= x_max {
            x_min = -1.0;
            x_max = 1.0;
        }
        if y_max <= 0.0 {
            y_max = 1.0;
        }
        (x_min, x_max, y_min * 1.05, y_max * 1.05)
    }

    /// 绘制 DOS 图表的核心逻辑
    fn draw_dos_chart<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, plotters::coord::Shift>,
        options: &PlotOptions,
    ) -> Result<()>
    where
        DB::ErrorType: 'static,
    {
        root.fill(&WHITE)
            .map_err(|e| DosPlotterError::PlotError(format!("{:?}", e)))?;

        let shift = self.shift();
        let (data_x_min, data_x_max, data_y_min, data_y_max) = self.data_range();
        let (x_min, x_max) = options.xlim.unwrap_or((data_x_min, data_x_max));
        let (y_min, y_max) = options.ylim.unwrap_or((data_y_min, data_y_max));

        let x_desc = if self.zero_at_efermi {
            "E - E_f (eV)"
        } else {
            "Energy (eV)"
        };

        let mut chart = ChartBuilder::on(root)
            .margin(30)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)
            .map_err(|e| DosPlotterError::PlotError(format!("{:?}", e)))?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_desc(x_desc)
            .y_desc("Density of states")
            .x_label_style(("sans-serif", 16))
            .y_label_style(("sans-serif", 16))
            .axis_desc_style(("sans-serif", 18))
            .draw()
            .map_err(|e| DosPlotterError::PlotError(format!("{:?}", e)))?;

        for (index, (label, dos)) in self.curves.iter().enumerate() {
            let color = Palette99::pick(index).to_rgba();

            for (spin, values) in &dos.densities {
                // 自旋向下取负，画在 x 轴下方
                let sign = match spin {
                    Spin::Up => 1.0,
                    Spin::Down => -1.0,
                };
                let points: Vec<(f64, f64)> = dos
                    .energies
                    .iter()
                    .zip(values)
                    .map(|(e, v)| (e - shift, sign * v))
                    .collect();

                let series = chart
                    .draw_series(LineSeries::new(points, color.stroke_width(2)))
                    .map_err(|e| DosPlotterError::PlotError(format!("{:?}", e)))?;

                if *spin == Spin::Up {
                    series.label(label.as_str()).legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                    });
                }
            }
        }

        // 费米能级
        let efermi = if self.zero_at_efermi {
            0.0
        } else {
            self.curves.first().map(|(_, dos)| dos.efermi).unwrap_or(0.0)
        };
        if efermi > x_min && efermi < x_max {
            chart
                .draw_series(LineSeries::new(
                    vec![(efermi, y_min), (efermi, y_max)],
                    BLACK.mix(0.5).stroke_width(1),
                ))
                .map_err(|e| DosPlotterError::PlotError(format!("{:?}", e)))?;
        }

        if y_min < 0.0 {
            chart
                .draw_series(LineSeries::new(
                    vec![(x_min, 0.0), (x_max, 0.0)],
                    BLACK.stroke_width(1),
                ))
                .map_err(|e| DosPlotterError::PlotError(format!("{:?}", e)))?;
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .label_font(("sans-serif", 16))
            .draw()
            .map_err(|e| DosPlotterError::PlotError(format!("{:?}", e)))?;

        Ok(())
    }
}
