//! # VASP vasprun.xml 态密度解析器
//!
//! 从 vasprun.xml 中提取总态密度、投影态密度和格点元素信息。
//!
//! ## 读取的片段
//! ```text
//! <atominfo>
//!   <array name="atoms"> ... <rc><c>Fe</c><c>   1</c></rc> ...
//! <dos>
//!   <i name="efermi">  5.1234 </i>
//!   <total>   <array> <field>energy</field> ...
//!               <set comment="spin 1"> <r> e  total  integrated </r> ...
//!   <partial> <array> <field>energy</field> <field>s</field> <field>py</field> ...
//!               <set comment="ion 1"> <set comment="spin 1"> <r> e  s  py ... </r>
//! ```
//!
//! 只按标签流扫描，不构建 DOM。只读取第一个 `<dos>` 块。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/dos.rs`
//! - 使用 `regex` 切分标签

use crate::error::{DosPlotterError, Result};
use crate::models::{capitalize_symbol, CompleteDos, Dos, OrbitalType, SiteDos, Spin};

use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const FORMAT: &str = "vasprun.xml";

/// 解析 vasprun.xml 文件
pub fn parse_vasprun_file(path: &Path) -> Result<CompleteDos> {
    if !path.exists() {
        return Err(DosPlotterError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let bytes = fs::read(path).map_err(|e| DosPlotterError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    // vasprun.xml 声明为 ISO-8859-1，每个字节即一个码位
    let content: String = bytes.iter().map(|&b| b as char).collect();

    parse_vasprun_content(&content, &path.display().to_string())
}

/// 从字符串内容解析 vasprun.xml
pub fn parse_vasprun_content(content: &str, source: &str) -> Result<CompleteDos> {
    let raw = VasprunScanner::new().scan(content, source)?;
    raw.build(source)
}

fn parse_error(source: &str, reason: impl Into<String>) -> DosPlotterError {
    DosPlotterError::ParseError {
        format: FORMAT.to_string(),
        path: source.to_string(),
        reason: reason.into(),
    }
}

/// 当前所在的 DOS 子块
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DosSection {
    Total,
    Partial,
}

/// 打开的标签
struct OpenTag {
    name: String,
    attrs: String,
    /// 开始标签结束处的字节偏移，用于截取叶子节点文本
    text_start: usize,
}

/// 扫描得到的原始数据
#[derive(Debug, Default)]
struct RawVasprun {
    elements: Vec<String>,
    efermi: Option<f64>,
    /// [spin][row][column]
    total: Vec<Vec<Vec<f64>>>,
    partial_fields: Vec<String>,
    /// [ion][spin][row][column]
    partial: Vec<Vec<Vec<Vec<f64>>>>,
    found_dos: bool,
}

struct VasprunScanner {
    tag_re: Regex,
    comment_re: Regex,
    name_re: Regex,
}

impl VasprunScanner {
    fn new() -> Self {
        // 正则为常量，编译不会失败
        VasprunScanner {
            tag_re: Regex::new(r"<(/?)([A-Za-z_][\w.:-]*)([^>]*?)(/?)>").unwrap(),
            comment_re: Regex::new(r#"comment\s*=\s*"\s*(ion|spin)\s*(\d+)\s*""#).unwrap(),
            name_re: Regex::new(r#"name\s*=\s*"([^"]*)""#).unwrap(),
        }
    }

    fn attr_name<'a>(&self, attrs: &'a str) -> Option<&'a str> {
        self.name_re
            .captures(attrs)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
    }

    /// 在标签栈中查找最近的 `comment="<kind> N"`，返回从 0 起的序号
    fn enclosing_index(&self, stack: &[OpenTag], kind: &str) -> Option<usize> {
        stack.iter().rev().find_map(|tag| {
            let caps = self.comment_re.captures(&tag.attrs)?;
            if &caps[1] != kind {
                return None;
            }
            caps[2].parse::<usize>().ok()?.checked_sub(1)
        })
    }

    fn scan(&self, content: &str, source: &str) -> Result<RawVasprun> {
        let mut raw = RawVasprun::default();
        let mut stack: Vec<OpenTag> = Vec::new();
        let mut in_atoms_array = false;
        let mut dos_section: Option<DosSection> = None;
        let mut in_dos = false;
        let mut dos_done = false;
        let mut column_in_row = 0usize;

        for caps in self.tag_re.captures_iter(content) {
            let whole = caps.get(0).map(|m| (m.start(), m.end())).unwrap_or((0, 0));
            let closing = !caps[1].is_empty();
            let self_closing = !caps[4].is_empty();
            let name = &caps[2];
            let attrs = caps.get(3).map(|m| m.as_str()).unwrap_or("");

            if closing {
                let open = match stack.pop() {
                    Some(open) => open,
                    None => return Err(parse_error(source, format!("Unexpected </{}>", name))),
                };
                if open.name != name {
                    return Err(parse_error(
                        source,
                        format!("Mismatched tags: <{}> closed by </{}>", open.name, name),
                    ));
                }
                let text = &content[open.text_start..whole.0];

                match name {
                    "array" if in_atoms_array && self.attr_name(&open.attrs) == Some("atoms") => {
                        in_atoms_array = false;
                    }
                    "c" if in_atoms_array => {
                        if column_in_row == 0 {
                            raw.elements.push(capitalize_symbol(text));
                        }
                        column_in_row += 1;
                    }
                    "i" if in_dos && self.attr_name(&open.attrs) == Some("efermi") => {
                        let value = text.trim().parse::<f64>().map_err(|_| {
                            parse_error(source, format!("Invalid Fermi energy '{}'", text.trim()))
                        })?;
                        raw.efermi = Some(value);
                    }
                    "field" if dos_section == Some(DosSection::Partial) => {
                        raw.partial_fields.push(text.trim().to_string());
                    }
                    "r" if dos_section.is_some() => {
                        let row = parse_row(text, source)?;
                        self.store_row(&mut raw, &stack, dos_section, row, source)?;
                    }
                    "total" | "partial" if in_dos => dos_section = None,
                    "dos" if in_dos => {
                        in_dos = false;
                        dos_done = true;
                    }
                    _ => {}
                }
                continue;
            }

            if self_closing {
                continue;
            }

            match name {
                "array" if stack.iter().any(|t| t.name == "atominfo") => {
                    if self.attr_name(attrs) == Some("atoms") {
                        in_atoms_array = true;
                    }
                }
                "rc" if in_atoms_array => column_in_row = 0,
                "dos" if !dos_done && !in_dos => {
                    in_dos = true;
                    raw.found_dos = true;
                }
                "total" if in_dos => dos_section = Some(DosSection::Total),
                "partial" if in_dos => dos_section = Some(DosSection::Partial),
                _ => {}
            }

            stack.push(OpenTag {
                name: name.to_string(),
                attrs: attrs.to_string(),
                text_start: whole.1,
            });
        }

        if let Some(open) = stack.last() {
            return Err(parse_error(
                source,
                format!("Unexpected end of file inside <{}>", open.name),
            ));
        }

        Ok(raw)
    }

    fn store_row(
        &self,
        raw: &mut RawVasprun,
        stack: &[OpenTag],
        section: Option<DosSection>,
        row: Vec<f64>,
        source: &str,
    ) -> Result<()> {
        let spin = self
            .enclosing_index(stack, "spin")
            .ok_or_else(|| parse_error(source, "DOS row outside of a 'spin' set"))?;

        let sets = match section {
            Some(DosSection::Total) => &mut raw.total,
            Some(DosSection::Partial) => {
                let ion = self
                    .enclosing_index(stack, "ion")
                    .ok_or_else(|| parse_error(source, "Partial DOS row outside of an 'ion' set"))?;
                if raw.partial.len() <= ion {
                    raw.partial.resize_with(ion + 1, Vec::new);
                }
                &mut raw.partial[ion]
            }
            None => return Ok(()),
        };

        if sets.len() <= spin {
            sets.resize_with(spin + 1, Vec::new);
        }
        sets[spin].push(row);
        Ok(())
    }
}

fn parse_row(text: &str, source: &str) -> Result<Vec<f64>> {
    text.split_whitespace()
        .map(|w| {
            w.parse::<f64>()
                .map_err(|_| parse_error(source, format!("Invalid number '{}' in DOS row", w)))
        })
        .collect()
}

impl RawVasprun {
    fn build(self, source: &str) -> Result<CompleteDos> {
        if !self.found_dos {
            return Err(parse_error(source, "No <dos> block found (was LORBIT/NEDOS set?)"));
        }

        // 非共线计算的 partial 中多出的磁化分量按总态密度的自旋数截断
        let nspin = self.total.len();
        if nspin == 0 || nspin > 2 || self.total[0].is_empty() {
            return Err(parse_error(source, "Missing total DOS data"));
        }

        let efermi = self.efermi.unwrap_or(0.0);
        let energies: Vec<f64> = self.total[0]
            .iter()
            .map(|row| row.first().copied())
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| parse_error(source, "Empty row in total DOS"))?;
        let npts = energies.len();

        let mut densities = BTreeMap::new();
        for (index, rows) in self.total.iter().enumerate() {
            let spin = Spin::from_index(index)
                .ok_or_else(|| parse_error(source, "Too many spin channels"))?;
            if rows.len() != npts {
                return Err(parse_error(
                    source,
                    format!(
                        "Total DOS spin {} has {} points, expected {}",
                        index + 1,
                        rows.len(),
                        npts
                    ),
                ));
            }
            let values = rows
                .iter()
                .map(|row| row.get(1).copied())
                .collect::<Option<Vec<f64>>>()
                .ok_or_else(|| parse_error(source, "Total DOS row without density column"))?;
            densities.insert(spin, values);
        }
        let total = Dos::new(efermi, energies.clone(), densities);

        let pdos = if self.partial.is_empty() {
            Vec::new()
        } else {
            build_partial(
                &self.partial,
                &self.partial_fields,
                &self.elements,
                nspin,
                efermi,
                &energies,
                source,
            )?
        };

        Ok(CompleteDos::new(total, pdos))
    }
}

fn build_partial(
    partial: &[Vec<Vec<Vec<f64>>>],
    fields: &[String],
    elements: &[String],
    nspin: usize,
    efermi: f64,
    energies: &[f64],
    source: &str,
) -> Result<Vec<SiteDos>> {
    if partial.len() != elements.len() {
        return Err(parse_error(
            source,
            format!(
                "Partial DOS has {} ions but atominfo lists {}",
                partial.len(),
                elements.len()
            ),
        ));
    }

    // 第 0 列为能量
    let columns: Vec<OrbitalType> = fields
        .iter()
        .skip(1)
        .map(|f| {
            OrbitalType::from_field_name(f)
                .ok_or_else(|| parse_error(source, format!("Unknown partial DOS field '{}'", f)))
        })
        .collect::<Result<_>>()?;
    if columns.is_empty() {
        return Err(parse_error(source, "Partial DOS has no orbital fields"));
    }

    let npts = energies.len();
    let mut sites = Vec::with_capacity(partial.len());

    for (ion, (spins, element)) in partial.iter().zip(elements).enumerate() {
        if spins.len() < nspin {
            return Err(parse_error(
                source,
                format!(
                    "Partial DOS for ion {} has {} spin sets, expected {}",
                    ion + 1,
                    spins.len(),
                    nspin
                ),
            ));
        }

        let mut orbitals: BTreeMap<OrbitalType, BTreeMap<Spin, Vec<f64>>> = BTreeMap::new();
        for (index, rows) in spins.iter().take(nspin).enumerate() {
            let spin = Spin::from_index(index)
                .ok_or_else(|| parse_error(source, "Too many spin channels"))?;
            if rows.len() != npts {
                return Err(parse_error(
                    source,
                    format!(
                        "Partial DOS for ion {} spin {} has {} points, expected {}",
                        ion + 1,
                        index + 1,
                        rows.len(),
                        npts
                    ),
                ));
            }

            for (point, row) in rows.iter().enumerate() {
                if row.len() != columns.len() + 1 {
                    return Err(parse_error(
                        source,
                        format!(
                            "Partial DOS row has {} columns, expected {}",
                            row.len(),
                            columns.len() + 1
                        ),
                    ));
                }
                for (orbital, value) in columns.iter().zip(&row[1..]) {
                    let values = orbitals
                        .entry(*orbital)
                        .or_default()
                        .entry(spin)
                        .or_insert_with(|| vec![0.0; npts]);
                    values[point] += value;
                }
            }
        }

        sites.push(SiteDos {
            element: element.clone(),
            orbitals: orbitals
                .into_iter()
                .map(|(orbital, densities)| {
                    (orbital, Dos::new(efermi, energies.to_vec(), densities))
                })
                .collect(),
        });
    }

    Ok(sites)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 两个 Fe、一个 Co，非自旋极化，s/p/d 投影
    pub(crate) const FE_CO: &str = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<modeling>
 <atominfo>
  <atoms>       3 </atoms>
  <types>       2 </types>
  <array name="atoms" >
   <dimension dim="1">ion</dimension>
   <field type="string">element</field>
   <field type="int">atomtype</field>
   <set>
    <rc><c>Fe</c><c>   1</c></rc>
    <rc><c>Fe</c><c>   1</c></rc>
    <rc><c>Co</c><c>   2</c></rc>
   </set>
  </array>
  <array name="atomtypes" >
   <dimension dim="1">type</dimension>
   <set>
    <rc><c>   2</c><c>Fe</c><c>  55.84700000</c></rc>
    <rc><c>   1</c><c>Co</c><c>  58.93300000</c></rc>
   </set>
  </array>
 </atominfo>
 <calculation>
  <dos>
   <i name="efermi">      1.00000000 </i>
   <total>
    <array>
     <dimension dim="1">gridpoints</dimension>
     <dimension dim="2">spin</dimension>
     <field>energy</field>
     <field>total</field>
     <field>integrated</field>
     <set>
      <set comment="spin 1">
       <r>    -1.0000     6.0000     0.0000 </r>
       <r>     0.0000     9.0000     1.0000 </r>
       <r>     1.0000    12.0000     2.0000 </r>
      </set>
     </set>
    </array>
   </total>
   <partial>
    <array>
     <dimension dim="1">gridpoints</dimension>
     <dimension dim="2">spin</dimension>
     <dimension dim="3">ion</dimension>
     <field>energy</field>
     <field>    s</field>
     <field>    p</field>
     <field>    d</field>
     <set>
      <set comment="ion 1">
       <set comment="spin 1">
        <r>    -1.0000     1.0000     0.0000     1.0000 </r>
        <r>     0.0000     0.0000     1.0000     2.0000 </r>
        <r>     1.0000     0.0000     0.0000     3.0000 </r>
       </set>
      </set>
      <set comment="ion 2">
       <set comment="spin 1">
        <r>    -1.0000     1.0000     0.0000     1.0000 </r>
        <r>     0.0000     0.0000     1.0000     2.0000 </r>
        <r>     1.0000     0.0000     0.0000     3.0000 </r>
       </set>
      </set>
      <set comment="ion 3">
       <set comment="spin 1">
        <r>    -1.0000     0.5000     0.5000     0.0000 </r>
        <r>     0.0000     0.5000     0.5000     2.0000 </r>
        <r>     1.0000     0.5000     0.5000     5.0000 </r>
       </set>
      </set>
     </set>
    </array>
   </partial>
  </dos>
 </calculation>
</modeling>
"#;

    /// 自旋极化、lm 分解，单个 Ni
    const NI_SPIN_LM: &str = r#"<modeling>
 <atominfo>
  <array name="atoms" >
   <set>
    <rc><c>NI</c><c>   1</c></rc>
   </set>
  </array>
 </atominfo>
 <dos>
  <i name="efermi">     -0.50000000 </i>
  <total>
   <array>
    <field>energy</field>
    <field>total</field>
    <field>integrated</field>
    <set>
     <set comment="spin 1">
      <r>    -1.0000     2.0000     0.0000 </r>
      <r>     1.0000     4.0000     1.0000 </r>
     </set>
     <set comment="spin 2">
      <r>    -1.0000     1.0000     0.0000 </r>
      <r>     1.0000     3.0000     1.0000 </r>
     </set>
    </set>
   </array>
  </total>
  <partial>
   <array>
    <field>energy</field>
    <field>    s</field>
    <field>   py</field>
    <field>   pz</field>
    <field>   px</field>
    <field>  dxy</field>
    <field>  dyz</field>
    <field>  dz2</field>
    <field>  dxz</field>
    <field>x2-y2</field>
    <set>
     <set comment="ion 1">
      <set comment="spin 1">
       <r> -1.0 0.1 0.1 0.1 0.1 0.2 0.2 0.2 0.2 0.2 </r>
       <r>  1.0 0.0 0.0 0.0 0.0 1.0 1.0 1.0 1.0 1.0 </r>
      </set>
      <set comment="spin 2">
       <r> -1.0 0.1 0.0 0.0 0.0 0.1 0.1 0.1 0.1 0.1 </r>
       <r>  1.0 0.0 0.0 0.0 0.0 0.5 0.5 0.5 0.5 0.5 </r>
      </set>
     </set>
    </set>
   </array>
  </partial>
 </dos>
</modeling>
"#;

    fn approx(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn test_parse_total_and_partial() {
        let cdos = parse_vasprun_content(FE_CO, "vasprun.xml").unwrap();
        assert!((cdos.efermi() - 1.0).abs() < 1e-9);
        assert_eq!(cdos.total.energies, vec![-1.0, 0.0, 1.0]);
        assert_eq!(cdos.total.densities[&Spin::Up], vec![6.0, 9.0, 12.0]);
        assert!(!cdos.total.is_spin_polarized());

        assert_eq!(cdos.pdos.len(), 3);
        assert_eq!(cdos.elements(), vec!["Fe", "Co"]);

        let co_d = &cdos.pdos[2].orbitals[&OrbitalType::D];
        assert_eq!(co_d.densities[&Spin::Up], vec![0.0, 2.0, 5.0]);
    }

    #[test]
    fn test_atomtypes_array_is_ignored() {
        // atomtypes 表中的 <c> 不能被当作格点元素
        let cdos = parse_vasprun_content(FE_CO, "vasprun.xml").unwrap();
        assert_eq!(cdos.pdos.len(), 3);
        assert!(cdos.pdos.iter().all(|s| s.element == "Fe" || s.element == "Co"));
    }

    #[test]
    fn test_parse_spin_polarized_lm_decomposed() {
        let cdos = parse_vasprun_content(NI_SPIN_LM, "vasprun.xml").unwrap();
        assert!(cdos.total.is_spin_polarized());
        assert_eq!(cdos.total.densities[&Spin::Down], vec![1.0, 3.0]);
        assert!((cdos.efermi() + 0.5).abs() < 1e-9);

        // 元素符号被规范化
        assert_eq!(cdos.elements(), vec!["Ni"]);

        let spd = cdos.get_element_spd_dos("ni").unwrap();
        assert_eq!(spd.len(), 3);
        assert!(approx(&spd[&OrbitalType::P].densities[&Spin::Up], &[0.3, 0.0]));
        assert!(approx(&spd[&OrbitalType::D].densities[&Spin::Up], &[1.0, 5.0]));
        assert!(approx(&spd[&OrbitalType::D].densities[&Spin::Down], &[0.5, 2.5]));
    }

    #[test]
    fn test_missing_dos_block() {
        let content = "<modeling>\n <atominfo>\n </atominfo>\n</modeling>\n";
        let err = parse_vasprun_content(content, "x.xml").unwrap_err();
        assert!(matches!(err, DosPlotterError::ParseError { .. }));
    }

    #[test]
    fn test_truncated_file() {
        let cut = &FE_CO[..FE_CO.find("</partial>").unwrap()];
        let err = parse_vasprun_content(cut, "x.xml").unwrap_err();
        assert!(err.to_string().contains("Unexpected end of file"));
    }

    #[test]
    fn test_invalid_number() {
        let content = FE_CO.replace("6.0000", "six");
        let err = parse_vasprun_content(&content, "x.xml").unwrap_err();
        assert!(err.to_string().contains("Invalid number 'six'"));
    }

    #[test]
    fn test_total_only_file() {
        let start = FE_CO.find("<partial>").unwrap();
        let end = FE_CO.find("</partial>").unwrap() + "</partial>".len();
        let content = format!("{}{}", &FE_CO[..start], &FE_CO[end..]);

        let cdos = parse_vasprun_content(&content, "x.xml").unwrap();
        assert!(cdos.pdos.is_empty());
        assert!(matches!(
            cdos.get_element_spd_dos("Fe"),
            Err(DosPlotterError::ElementNotFound { .. })
        ));
    }

    #[test]
    fn test_latin1_file() {
        let dir = std::env::temp_dir().join(format!("dos_plotter_latin1_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("vasprun.xml");

        let pos = FE_CO.find(" <atominfo>").unwrap();
        let mut bytes = FE_CO[..pos].as_bytes().to_vec();
        bytes.extend_from_slice(b" <incar>\n  <i type=\"string\" name=\"SYSTEM\">Fe\xC5</i>\n </incar>\n");
        bytes.extend_from_slice(FE_CO[pos..].as_bytes());
        fs::write(&path, &bytes).unwrap();

        let cdos = parse_vasprun_file(&path).unwrap();
        assert_eq!(cdos.elements(), vec!["Fe", "Co"]);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file() {
        let err = parse_vasprun_file(Path::new("/nonexistent/dir/vasprun.xml")).unwrap_err();
        assert!(matches!(err, DosPlotterError::FileNotFound { .. }));
    }
}
