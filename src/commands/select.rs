//! # 曲线选择
//!
//! 根据元素/轨道/总态密度过滤条件，从完整态密度中挑选曲线加入图表。
//!
//! ## 规则（按优先级）
//! 1. 元素和轨道都给出：逐元素、逐轨道添加 `"<El> (<orb>)"`
//! 2. 只给出元素：逐元素添加轨道求和的元素态密度
//! 3. 只给出轨道：对计算中的每个元素（按格点顺序）添加所请求的轨道
//! 4. 都未给出：只添加一条 "Total DOS"
//!
//! `--total` 在 1-3 的情况下把 "Total DOS" 放在最前面。
//!
//! ## 依赖关系
//! - 被 `commands/mod.rs` 调用
//! - 使用 `models/dos.rs`, `plot/plotter.rs`

use crate::error::{DosPlotterError, Result};
use crate::models::{capitalize_symbol, CompleteDos, OrbitalType};
use crate::plot::{DosPlotter, TOTAL_DOS_LABEL};

/// 曲线过滤条件
#[derive(Debug, Clone)]
pub struct Selection {
    pub elements: Vec<String>,
    pub orbitals: Vec<OrbitalType>,
    pub total: bool,
}

impl Selection {
    fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.orbitals.is_empty()
    }
}

/// 按过滤条件构建图表
pub fn create_plot(cdos: &CompleteDos, selection: &Selection) -> Result<DosPlotter> {
    let mut plot = DosPlotter::new();

    if selection.is_empty() {
        plot.add_dos(TOTAL_DOS_LABEL, cdos.total.clone());
        return Ok(plot);
    }

    if selection.total {
        plot.add_dos(TOTAL_DOS_LABEL, cdos.total.clone());
    }

    if selection.orbitals.is_empty() {
        let element_dos = cdos.get_element_dos()?;
        for element in &selection.elements {
            let element = capitalize_symbol(element);
            let dos = element_dos
                .get(&element)
                .ok_or_else(|| cdos.element_not_found(&element))?;
            plot.add_dos(element, dos.clone());
        }
        return Ok(plot);
    }

    let elements = if selection.elements.is_empty() {
        let all = cdos.elements();
        if all.is_empty() {
            return Err(DosPlotterError::InvalidArgument(
                "--orbital needs projected DOS, but the calculation has none (set LORBIT)"
                    .to_string(),
            ));
        }
        all
    } else {
        selection.elements.iter().map(|e| capitalize_symbol(e)).collect()
    };

    for element in &elements {
        let spd_dos = cdos.get_element_spd_dos(element)?;
        for orbital in &selection.orbitals {
            let dos = spd_dos
                .get(orbital)
                .ok_or_else(|| DosPlotterError::OrbitalNotFound {
                    element: element.clone(),
                    orbital: orbital.to_string(),
                })?;
            plot.add_dos(format!("{} ({})", element, orbital), dos.clone());
        }
    }

    Ok(plot)
}
