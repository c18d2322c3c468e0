//! # 态密度 (DOS) 数据模型
//!
//! 存储从 vasprun.xml 解析出的总态密度与投影态密度，并提供
//! 按元素、按元素-轨道的求和视图。
//!
//! ## 依赖关系
//! - 被 `parsers/vasprun.rs` 构建
//! - 被 `commands/select.rs`, `plot/` 使用

use crate::error::{DosPlotterError, Result};

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// 自旋通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Spin {
    Up,
    Down,
}

impl Spin {
    /// 按 vasprun.xml 中 "spin N" 的序号（从 0 起）取自旋
    pub fn from_index(index: usize) -> Option<Spin> {
        match index {
            0 => Some(Spin::Up),
            1 => Some(Spin::Down),
            _ => None,
        }
    }
}

impl fmt::Display for Spin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Spin::Up => write!(f, "up"),
            Spin::Down => write!(f, "down"),
        }
    }
}

/// 轨道角动量通道（角量子数 l）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OrbitalType {
    S,
    P,
    D,
    F,
}

impl OrbitalType {
    pub fn from_l(l: u8) -> Option<OrbitalType> {
        match l {
            0 => Some(OrbitalType::S),
            1 => Some(OrbitalType::P),
            2 => Some(OrbitalType::D),
            3 => Some(OrbitalType::F),
            _ => None,
        }
    }

    /// 由 vasprun.xml `<partial>` 的列名推断轨道通道
    ///
    /// 支持 `s p d f` 与 lm 分解列名 (`py`, `dxy`, `x2-y2`, `fy3x2` 等)。
    pub fn from_field_name(name: &str) -> Option<OrbitalType> {
        let name = name.trim().to_lowercase();
        if name.starts_with("x2") {
            return Some(OrbitalType::D);
        }
        match name.chars().next()? {
            's' => Some(OrbitalType::S),
            'p' => Some(OrbitalType::P),
            'd' => Some(OrbitalType::D),
            'f' => Some(OrbitalType::F),
            _ => None,
        }
    }
}

impl fmt::Display for OrbitalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrbitalType::S => write!(f, "s"),
            OrbitalType::P => write!(f, "p"),
            OrbitalType::D => write!(f, "d"),
            OrbitalType::F => write!(f, "f"),
        }
    }
}

impl FromStr for OrbitalType {
    type Err = String;

    /// 接受角量子数 (`0`-`3`) 或轨道字母 (`s`, `p`, `d`, `f`)
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(l) = s.parse::<u8>() {
            return OrbitalType::from_l(l)
                .ok_or_else(|| format!("Invalid azimuthal quantum number '{}' (expected 0-3)", s));
        }
        match s.to_lowercase().as_str() {
            "s" => Ok(OrbitalType::S),
            "p" => Ok(OrbitalType::P),
            "d" => Ok(OrbitalType::D),
            "f" => Ok(OrbitalType::F),
            _ => Err(format!(
                "Invalid orbital '{}'. Use 0-3 or one of: s, p, d, f",
                s
            )),
        }
    }
}

/// 元素符号规范化：首字母大写，其余小写 ("co" / "CO" -> "Co")
pub fn capitalize_symbol(symbol: &str) -> String {
    let symbol = symbol.trim();
    let mut chars = symbol.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

/// 单条态密度曲线
#[derive(Debug, Clone, PartialEq)]
pub struct Dos {
    /// 费米能级 (eV)
    pub efermi: f64,

    /// 能量网格 (eV)
    pub energies: Vec<f64>,

    /// 各自旋通道的态密度 (states/eV)
    pub densities: BTreeMap<Spin, Vec<f64>>,
}

impl Dos {
    pub fn new(efermi: f64, energies: Vec<f64>, densities: BTreeMap<Spin, Vec<f64>>) -> Self {
        Dos {
            efermi,
            energies,
            densities,
        }
    }

    /// 同一能量网格上的零曲线
    pub fn zeros_like(&self) -> Self {
        let densities = self
            .densities
            .keys()
            .map(|spin| (*spin, vec![0.0; self.energies.len()]))
            .collect();
        Dos::new(self.efermi, self.energies.clone(), densities)
    }

    pub fn is_spin_polarized(&self) -> bool {
        self.densities.contains_key(&Spin::Down)
    }

    /// 逐点累加另一条曲线（能量网格必须一致）
    pub fn add(&mut self, other: &Dos) -> Result<()> {
        if self.energies.len() != other.energies.len() {
            return Err(DosPlotterError::PlotError(format!(
                "Cannot add DOS on different energy grids ({} vs {} points)",
                self.energies.len(),
                other.energies.len()
            )));
        }
        for (spin, values) in &other.densities {
            let target = self
                .densities
                .entry(*spin)
                .or_insert_with(|| vec![0.0; values.len()]);
            for (t, v) in target.iter_mut().zip(values) {
                *t += v;
            }
        }
        Ok(())
    }
}

/// 单个格点（离子）的投影态密度
#[derive(Debug, Clone)]
pub struct SiteDos {
    pub element: String,
    pub orbitals: BTreeMap<OrbitalType, Dos>,
}

/// 一次计算的完整态密度
#[derive(Debug, Clone)]
pub struct CompleteDos {
    pub total: Dos,
    pub pdos: Vec<SiteDos>,
}

impl CompleteDos {
    pub fn new(total: Dos, pdos: Vec<SiteDos>) -> Self {
        CompleteDos { total, pdos }
    }

    pub fn efermi(&self) -> f64 {
        self.total.efermi
    }

    /// 出现投影态密度的元素（按格点顺序去重）
    pub fn elements(&self) -> Vec<String> {
        let mut elements: Vec<String> = Vec::new();
        for site in &self.pdos {
            if !elements.contains(&site.element) {
                elements.push(site.element.clone());
            }
        }
        elements
    }

    /// 各元素轨道求和后的态密度
    pub fn get_element_dos(&self) -> Result<BTreeMap<String, Dos>> {
        let mut result: BTreeMap<String, Dos> = BTreeMap::new();
        for site in &self.pdos {
            let entry = result
                .entry(site.element.clone())
                .or_insert_with(|| self.total.zeros_like());
            for dos in site.orbitals.values() {
                entry.add(dos)?;
            }
        }
        Ok(result)
    }

    /// 指定元素的 s/p/d/f 分解态密度（对该元素所有格点求和）
    pub fn get_element_spd_dos(&self, element: &str) -> Result<BTreeMap<OrbitalType, Dos>> {
        let element = capitalize_symbol(element);
        let mut result: BTreeMap<OrbitalType, Dos> = BTreeMap::new();
        let mut found = false;

        for site in self.pdos.iter().filter(|s| s.element == element) {
            found = true;
            for (orbital, dos) in &site.orbitals {
                result
                    .entry(*orbital)
                    .or_insert_with(|| self.total.zeros_like())
                    .add(dos)?;
            }
        }

        if !found {
            return Err(self.element_not_found(&element));
        }
        Ok(result)
    }

    pub(crate) fn element_not_found(&self, element: &str) -> DosPlotterError {
        let available = self.elements();
        DosPlotterError::ElementNotFound {
            element: element.to_string(),
            available: if available.is_empty() {
                "none, file has no projected DOS".to_string()
            } else {
                available.join(", ")
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dos(values: &[f64]) -> Dos {
        let mut densities = BTreeMap::new();
        densities.insert(Spin::Up, values.to_vec());
        Dos::new(1.0, vec![-1.0, 0.0, 1.0], densities)
    }

    fn site(element: &str, s: &[f64], d: &[f64]) -> SiteDos {
        let mut orbitals = BTreeMap::new();
        orbitals.insert(OrbitalType::S, dos(s));
        orbitals.insert(OrbitalType::D, dos(d));
        SiteDos {
            element: element.to_string(),
            orbitals,
        }
    }

    fn sample() -> CompleteDos {
        CompleteDos::new(
            dos(&[10.0, 10.0, 10.0]),
            vec![
                site("Fe", &[1.0, 0.0, 0.0], &[0.0, 2.0, 0.0]),
                site("Co", &[0.5, 0.5, 0.5], &[3.0, 3.0, 3.0]),
                site("Fe", &[1.0, 1.0, 1.0], &[0.0, 0.0, 4.0]),
            ],
        )
    }

    #[test]
    fn test_orbital_from_str() {
        assert_eq!("0".parse::<OrbitalType>().unwrap(), OrbitalType::S);
        assert_eq!("2".parse::<OrbitalType>().unwrap(), OrbitalType::D);
        assert_eq!("d".parse::<OrbitalType>().unwrap(), OrbitalType::D);
        assert_eq!("F".parse::<OrbitalType>().unwrap(), OrbitalType::F);
        assert!("4".parse::<OrbitalType>().is_err());
        assert!("g".parse::<OrbitalType>().is_err());
    }

    #[test]
    fn test_orbital_from_field_name() {
        assert_eq!(OrbitalType::from_field_name("s"), Some(OrbitalType::S));
        assert_eq!(OrbitalType::from_field_name(" px "), Some(OrbitalType::P));
        assert_eq!(OrbitalType::from_field_name("dz2"), Some(OrbitalType::D));
        assert_eq!(OrbitalType::from_field_name("x2-y2"), Some(OrbitalType::D));
        assert_eq!(OrbitalType::from_field_name("fy3x2"), Some(OrbitalType::F));
        assert_eq!(OrbitalType::from_field_name("energy"), None);
    }

    #[test]
    fn test_capitalize_symbol() {
        assert_eq!(capitalize_symbol("co"), "Co");
        assert_eq!(capitalize_symbol("CO"), "Co");
        assert_eq!(capitalize_symbol(" fe "), "Fe");
        assert_eq!(capitalize_symbol(""), "");
    }

    #[test]
    fn test_elements_in_site_order() {
        assert_eq!(sample().elements(), vec!["Fe", "Co"]);
    }

    #[test]
    fn test_element_dos_sums_sites_and_orbitals() {
        let element_dos = sample().get_element_dos().unwrap();
        assert_eq!(element_dos["Fe"].densities[&Spin::Up], vec![2.0, 3.0, 5.0]);
        assert_eq!(element_dos["Co"].densities[&Spin::Up], vec![3.5, 3.5, 3.5]);
    }

    #[test]
    fn test_element_spd_dos_case_insensitive() {
        let cdos = sample();
        let spd = cdos.get_element_spd_dos("fe").unwrap();
        assert_eq!(spd.len(), 2);
        assert_eq!(spd[&OrbitalType::S].densities[&Spin::Up], vec![2.0, 1.0, 1.0]);
        assert_eq!(spd[&OrbitalType::D].densities[&Spin::Up], vec![0.0, 2.0, 4.0]);
        assert!(!spd.contains_key(&OrbitalType::P));
        assert_eq!(spd, cdos.get_element_spd_dos("Fe").unwrap());
    }

    #[test]
    fn test_element_spd_dos_unknown_element() {
        let err = sample().get_element_spd_dos("Ni").unwrap_err();
        match err {
            DosPlotterError::ElementNotFound { element, available } => {
                assert_eq!(element, "Ni");
                assert_eq!(available, "Fe, Co");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_add_rejects_mismatched_grid() {
        let mut a = dos(&[1.0, 1.0, 1.0]);
        let b = Dos::new(0.0, vec![0.0], BTreeMap::new());
        assert!(a.add(&b).is_err());
    }
}
