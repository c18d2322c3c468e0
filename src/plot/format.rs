//! # 输出格式推断
//!
//! 由输出文件名的扩展名决定图像/数据格式：取文件名中最后一个 `.`
//! 之后的部分（小写）；文件名不含 `.` 时使用 `png`。
//!
//! ## 依赖关系
//! - 被 `commands/mod.rs`, `plot/plotter.rs` 使用

use crate::error::{DosPlotterError, Result};

use std::fmt;
use std::path::Path;

/// 默认格式
pub const DEFAULT_FORMAT: &str = "png";

/// 支持的输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotFormat {
    Png,
    Jpeg,
    Bmp,
    Svg,
    /// 逗号分隔的曲线数据
    Csv,
    /// 空白分隔的曲线数据
    Dat,
}

impl PlotFormat {
    /// 取文件名最后一个 `.` 之后的文本作为格式名，无 `.` 时为 `png`
    pub fn format_name(file_name: &str) -> String {
        match file_name.rfind('.') {
            Some(pos) => file_name[pos + 1..].to_lowercase(),
            None => DEFAULT_FORMAT.to_string(),
        }
    }

    pub fn from_name(name: &str) -> Result<PlotFormat> {
        match name.to_lowercase().as_str() {
            "png" => Ok(PlotFormat::Png),
            "jpg" | "jpeg" => Ok(PlotFormat::Jpeg),
            "bmp" => Ok(PlotFormat::Bmp),
            "svg" => Ok(PlotFormat::Svg),
            "csv" => Ok(PlotFormat::Csv),
            "dat" => Ok(PlotFormat::Dat),
            other => Err(DosPlotterError::UnsupportedFormat(format!(
                "'{}' (supported: png, jpg, jpeg, bmp, svg, csv, dat)",
                other
            ))),
        }
    }

    /// 由输出路径推断格式（只看文件名部分，目录中的 `.` 不参与）
    pub fn from_path(path: &Path) -> Result<PlotFormat> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                DosPlotterError::InvalidArgument(format!(
                    "Output path has no file name: {}",
                    path.display()
                ))
            })?;
        PlotFormat::from_name(&PlotFormat::format_name(file_name))
    }

    /// 对应的 `image` 编码格式
    pub fn image_format(&self) -> Option<image::ImageFormat> {
        match self {
            PlotFormat::Png => Some(image::ImageFormat::Png),
            PlotFormat::Jpeg => Some(image::ImageFormat::Jpeg),
            PlotFormat::Bmp => Some(image::ImageFormat::Bmp),
            _ => None,
        }
    }
}

impl fmt::Display for PlotFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlotFormat::Png => write!(f, "png"),
            PlotFormat::Jpeg => write!(f, "jpeg"),
            PlotFormat::Bmp => write!(f, "bmp"),
            PlotFormat::Svg => write!(f, "svg"),
            PlotFormat::Csv => write!(f, "csv"),
            PlotFormat::Dat => write!(f, "dat"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_name() {
        assert_eq!(PlotFormat::format_name("out.svg"), "svg");
        assert_eq!(PlotFormat::format_name("out"), "png");
        assert_eq!(PlotFormat::format_name("co.dos.PNG"), "png");
        assert_eq!(PlotFormat::format_name("trailing."), "");
    }

    #[test]
    fn test_from_path() {
        assert_eq!(PlotFormat::from_path(Path::new("x.svg")).unwrap(), PlotFormat::Svg);
        assert_eq!(PlotFormat::from_path(Path::new("out")).unwrap(), PlotFormat::Png);
        assert_eq!(
            PlotFormat::from_path(Path::new("./plots.d/out")).unwrap(),
            PlotFormat::Png
        );
        assert_eq!(PlotFormat::from_path(Path::new("a/b.JPG")).unwrap(), PlotFormat::Jpeg);
        assert_eq!(PlotFormat::from_path(Path::new("dos.csv")).unwrap(), PlotFormat::Csv);
    }

    #[test]
    fn test_unsupported_format() {
        let err = PlotFormat::from_path(Path::new("dos.pdf")).unwrap_err();
        assert!(matches!(err, DosPlotterError::UnsupportedFormat(_)));
        assert!(PlotFormat::from_path(Path::new("trailing.")).is_err());
    }

    #[test]
    fn test_format_kinds() {
        assert_eq!(PlotFormat::Bmp.image_format(), Some(image::ImageFormat::Bmp));
        assert_eq!(PlotFormat::Svg.image_format(), None);
    }
}
