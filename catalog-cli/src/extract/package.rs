//! Low-level access to the parts of an xlsx package
//!
//! A workbook is a zip archive of XML parts linked by relationship files:
//!
//! - `xl/workbook.xml` lists sheets by name and relationship id
//! - `xl/_rels/workbook.xml.rels` maps those ids to worksheet parts
//! - `xl/worksheets/_rels/sheetN.xml.rels` links a worksheet to its drawing
//! - `xl/drawings/drawingN.xml` positions pictures with cell anchors
//! - `xl/drawings/_rels/drawingN.xml.rels` maps picture ids to `xl/media/*`
//!
//! calamine does not expose picture anchors, so this module walks those
//! parts directly with quick-xml.

use anyhow::{Context, Result, bail};
use quick_xml::Reader as XmlReader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;
use zip::result::ZipError;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const DRAWING_REL_SUFFIX: &str = "/drawing";

/// Zero-based cell position of the top-left corner of a picture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub row: u32,
    pub col: u32,
}

/// A picture embedded in a worksheet
#[derive(Debug, Clone)]
pub struct SheetPicture {
    /// `None` for absolutely positioned pictures
    pub anchor: Option<Anchor>,
    /// Package path of the media part, e.g. `xl/media/image1.png`
    pub media_path: String,
    pub data: Vec<u8>,
}

/// Sheet entry from `xl/workbook.xml`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    pub name: String,
    pub rel_id: String,
}

/// Relationship from a `.rels` part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// Picture reference from a drawing part, before the media is resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawingPicture {
    pub anchor: Option<Anchor>,
    pub embed_id: String,
}

/// Read-only handle on an xlsx package
pub struct XlsxPackage<R: Read + Seek> {
    archive: ZipArchive<R>,
}

impl XlsxPackage<File> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Failed to open workbook: {}", path.display()))?;
        Self::from_reader(file)
            .with_context(|| format!("Failed to read workbook: {}", path.display()))
    }
}

impl<R: Read + Seek> XlsxPackage<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let archive = ZipArchive::new(reader).context("Not a valid xlsx (zip) package")?;
        Ok(Self { archive })
    }

    /// Read a part, returning `None` if the package has no such part
    fn try_read_part(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("Failed to read part: {}", name)),
        };

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .with_context(|| format!("Failed to read part: {}", name))?;
        Ok(Some(bytes))
    }

    fn read_part(&mut self, name: &str) -> Result<Vec<u8>> {
        self.try_read_part(name)?
            .with_context(|| format!("Package is missing part: {}", name))
    }

    fn read_part_string(&mut self, name: &str) -> Result<String> {
        let bytes = self.read_part(name)?;
        String::from_utf8(bytes).with_context(|| format!("Part is not valid UTF-8: {}", name))
    }

    /// Relationships of `part`; an absent `.rels` part means none
    fn relationships(&mut self, part: &str) -> Result<Vec<Relationship>> {
        let rels_path = rels_path_for(part);
        match self.try_read_part(&rels_path)? {
            Some(bytes) => {
                let xml = String::from_utf8(bytes)
                    .with_context(|| format!("Part is not valid UTF-8: {}", rels_path))?;
                parse_relationships(&xml)
                    .with_context(|| format!("Failed to parse relationships: {}", rels_path))
            }
            None => Ok(Vec::new()),
        }
    }

    /// Sheets declared in the workbook, in workbook order
    pub fn sheets(&mut self) -> Result<Vec<SheetEntry>> {
        let xml = self.read_part_string(WORKBOOK_PART)?;
        parse_workbook_sheets(&xml).context("Failed to parse xl/workbook.xml")
    }

    /// Package path of the worksheet part named `sheet_name`
    pub fn worksheet_part(&mut self, sheet_name: &str) -> Result<String> {
        let sheets = self.sheets()?;
        let Some(entry) = sheets.iter().find(|s| s.name == sheet_name) else {
            let available: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
            bail!(
                "Worksheet '{}' not found (available: {})",
                sheet_name,
                available.join(", ")
            );
        };

        let rels = self.relationships(WORKBOOK_PART)?;
        let rel = rels
            .iter()
            .find(|r| r.id == entry.rel_id)
            .with_context(|| {
                format!(
                    "Worksheet '{}' references unknown relationship {}",
                    sheet_name, entry.rel_id
                )
            })?;

        Ok(resolve_target(WORKBOOK_PART, &rel.target))
    }

    /// All pictures on the sheet, in drawing order, with their payloads
    pub fn sheet_pictures(&mut self, sheet_name: &str) -> Result<Vec<SheetPicture>> {
        let sheet_part = self.worksheet_part(sheet_name)?;
        log::debug!("Worksheet '{}' is stored in {}", sheet_name, sheet_part);

        let drawing_parts: Vec<String> = self
            .relationships(&sheet_part)?
            .into_iter()
            .filter(|r| !r.external && r.rel_type.ends_with(DRAWING_REL_SUFFIX))
            .map(|r| resolve_target(&sheet_part, &r.target))
            .collect();

        if drawing_parts.is_empty() {
            log::info!("Worksheet '{}' has no drawing, no pictures to extract", sheet_name);
            return Ok(Vec::new());
        }

        let mut pictures = Vec::new();
        for drawing_part in drawing_parts {
            let xml = self.read_part_string(&drawing_part)?;
            let refs = parse_drawing(&xml)
                .with_context(|| format!("Failed to parse drawing: {}", drawing_part))?;
            let rels: HashMap<String, Relationship> = self
                .relationships(&drawing_part)?
                .into_iter()
                .map(|r| (r.id.clone(), r))
                .collect();

            for picture in refs {
                let rel = rels.get(&picture.embed_id).with_context(|| {
                    format!(
                        "Picture in {} references unknown relationship {}",
                        drawing_part, picture.embed_id
                    )
                })?;
                if rel.external {
                    log::warn!(
                        "Skipping linked (external) picture {} in {}",
                        rel.target,
                        drawing_part
                    );
                    continue;
                }

                let media_path = resolve_target(&drawing_part, &rel.target);
                let data = self.read_part(&media_path)?;
                pictures.push(SheetPicture {
                    anchor: picture.anchor,
                    media_path,
                    data,
                });
            }
        }

        Ok(pictures)
    }
}

/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target relative to the part that declares it
pub fn resolve_target(source_part: &str, target: &str) -> String {
    let joined = if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_string()
    } else {
        match source_part.rsplit_once('/') {
            Some((dir, _)) => format!("{}/{}", dir, target),
            None => target.to_string(),
        }
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn attr_value(e: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == local {
            return Ok(Some(attr.decode_and_unescape_value(e.decoder())?.into_owned()));
        }
    }
    Ok(None)
}

/// Parse `<sheet name=".." r:id=".."/>` entries from workbook.xml
pub fn parse_workbook_sheets(xml: &str) -> Result<Vec<SheetEntry>> {
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut sheets = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr_value(&e, b"name")?.context("<sheet> without name")?;
                let rel_id = attr_value(&e, b"id")?
                    .with_context(|| format!("<sheet name=\"{}\"> without r:id", name))?;
                sheets.push(SheetEntry { name, rel_id });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(sheets)
}

/// Parse a `.rels` part
pub fn parse_relationships(xml: &str) -> Result<Vec<Relationship>> {
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut rels = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let id = attr_value(&e, b"Id")?.context("<Relationship> without Id")?;
                let target = attr_value(&e, b"Target")?
                    .with_context(|| format!("Relationship {} without Target", id))?;
                let rel_type = attr_value(&e, b"Type")?.unwrap_or_default();
                let external = attr_value(&e, b"TargetMode")?.as_deref() == Some("External");
                rels.push(Relationship {
                    id,
                    rel_type,
                    target,
                    external,
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(rels)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkerField {
    Col,
    Row,
}

/// Parse the pictures of a drawing part.
///
/// Only the `from` marker of two-cell and one-cell anchors is used; pictures
/// in an `absoluteAnchor` get no anchor. Every picture inside an anchor,
/// including those nested in group shapes, shares that anchor. Inside
/// `mc:AlternateContent` only the `mc:Choice` branch is read; the
/// `mc:Fallback` copy of the same content is skipped.
pub fn parse_drawing(xml: &str) -> Result<Vec<DrawingPicture>> {
    let mut reader = XmlReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pictures = Vec::new();

    let mut in_anchor = false;
    let mut cell_anchored = false;
    let mut in_from = false;
    let mut in_pic = false;
    let mut field: Option<MarkerField> = None;
    let mut from_col: Option<u32> = None;
    let mut from_row: Option<u32> = None;
    let mut embeds: Vec<String> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"twoCellAnchor" | b"oneCellAnchor" => {
                    in_anchor = true;
                    cell_anchored = true;
                }
                b"absoluteAnchor" => {
                    in_anchor = true;
                    cell_anchored = false;
                }
                b"Fallback" => {
                    reader.read_to_end(e.name())?;
                }
                b"from" if in_anchor => in_from = true,
                b"col" if in_from => field = Some(MarkerField::Col),
                b"row" if in_from => field = Some(MarkerField::Row),
                b"pic" if in_anchor => in_pic = true,
                b"blip" if in_pic => {
                    if let Some(id) = attr_value(&e, b"embed")? {
                        embeds.push(id);
                    }
                }
                _ => {}
            },
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"blip" && in_pic {
                    if let Some(id) = attr_value(&e, b"embed")? {
                        embeds.push(id);
                    }
                }
            }
            Event::Text(t) => {
                if let Some(f) = field {
                    let text = std::str::from_utf8(&t)
                        .context("Anchor marker is not valid UTF-8")?
                        .trim();
                    let value: u32 = text
                        .parse()
                        .with_context(|| format!("Invalid anchor marker value '{}'", text))?;
                    match f {
                        MarkerField::Col => from_col = Some(value),
                        MarkerField::Row => from_row = Some(value),
                    }
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"col" | b"row" => field = None,
                b"from" => in_from = false,
                b"pic" => in_pic = false,
                b"twoCellAnchor" | b"oneCellAnchor" | b"absoluteAnchor" => {
                    let anchor = if cell_anchored {
                        match (from_row, from_col) {
                            (Some(row), Some(col)) => Some(Anchor { row, col }),
                            _ => bail!("Cell anchor without a complete <from> marker"),
                        }
                    } else {
                        None
                    };
                    for embed_id in embeds.drain(..) {
                        pictures.push(DrawingPicture { anchor, embed_id });
                    }
                    in_anchor = false;
                    from_col = None;
                    from_row = None;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(pictures)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DRAWING: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <xdr:twoCellAnchor editAs="oneCell">
    <xdr:from><xdr:col>6</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>4</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>
    <xdr:to><xdr:col>7</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>9</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:to>
    <xdr:pic>
      <xdr:nvPicPr><xdr:cNvPr id="2" name="Picture 1"/><xdr:cNvPicPr/></xdr:nvPicPr>
      <xdr:blipFill><a:blip r:embed="rId1"/><a:stretch><a:fillRect/></a:stretch></xdr:blipFill>
    </xdr:pic>
    <xdr:clientData/>
  </xdr:twoCellAnchor>
  <xdr:oneCellAnchor>
    <xdr:from><xdr:col>2</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>11</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>
    <xdr:ext cx="100" cy="100"/>
    <xdr:pic>
      <xdr:blipFill><a:blip r:embed="rId2"></a:blip></xdr:blipFill>
    </xdr:pic>
    <xdr:clientData/>
  </xdr:oneCellAnchor>
  <xdr:absoluteAnchor>
    <xdr:pos x="0" y="0"/>
    <xdr:ext cx="100" cy="100"/>
    <xdr:pic><xdr:blipFill><a:blip r:embed="rId3"/></xdr:blipFill></xdr:pic>
    <xdr:clientData/>
  </xdr:absoluteAnchor>
  <xdr:twoCellAnchor>
    <xdr:from><xdr:col>6</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>20</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>
    <xdr:to><xdr:col>8</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>22</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:to>
    <xdr:sp><xdr:nvSpPr><xdr:cNvPr id="5" name="Rectangle"/></xdr:nvSpPr></xdr:sp>
    <xdr:clientData/>
  </xdr:twoCellAnchor>
</xdr:wsDr>"#;

    #[test]
    fn test_parse_drawing_anchors() {
        let pictures = parse_drawing(DRAWING).unwrap();

        assert_eq!(
            pictures,
            vec![
                DrawingPicture {
                    anchor: Some(Anchor { row: 4, col: 6 }),
                    embed_id: "rId1".to_string(),
                },
                DrawingPicture {
                    anchor: Some(Anchor { row: 11, col: 2 }),
                    embed_id: "rId2".to_string(),
                },
                DrawingPicture {
                    anchor: None,
                    embed_id: "rId3".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_drawing_uses_from_not_to() {
        let pictures = parse_drawing(DRAWING).unwrap();
        assert_eq!(pictures[0].anchor.map(|a| a.col), Some(6));
    }

    #[test]
    fn test_parse_drawing_reads_choice_not_fallback() {
        let xml = r#"<xdr:wsDr xmlns:xdr="http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006" xmlns:a14="http://schemas.microsoft.com/office/drawing/2010/main">
  <mc:AlternateContent>
    <mc:Choice Requires="a14">
      <xdr:twoCellAnchor>
        <xdr:from><xdr:col>6</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>3</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>
        <xdr:to><xdr:col>7</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>4</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:to>
        <xdr:pic><xdr:blipFill><a:blip r:embed="rId1"/></xdr:blipFill></xdr:pic>
        <xdr:clientData/>
      </xdr:twoCellAnchor>
    </mc:Choice>
    <mc:Fallback>
      <xdr:twoCellAnchor>
        <xdr:from><xdr:col>6</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>3</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:from>
        <xdr:to><xdr:col>7</xdr:col><xdr:colOff>0</xdr:colOff><xdr:row>4</xdr:row><xdr:rowOff>0</xdr:rowOff></xdr:to>
        <xdr:pic><xdr:blipFill><a:blip r:embed="rId1"/></xdr:blipFill></xdr:pic>
        <xdr:clientData/>
      </xdr:twoCellAnchor>
    </mc:Fallback>
  </mc:AlternateContent>
</xdr:wsDr>"#;

        let pictures = parse_drawing(xml).unwrap();

        assert_eq!(
            pictures,
            vec![DrawingPicture {
                anchor: Some(Anchor { row: 3, col: 6 }),
                embed_id: "rId1".to_string(),
            }]
        );
    }

    #[test]
    fn test_attribute_entities_are_unescaped() {
        let xml = r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Boxes &amp; Bags" sheetId="1" r:id="rId1"/></sheets></workbook>"#;
        let sheets = parse_workbook_sheets(xml).unwrap();
        assert_eq!(sheets[0].name, "Boxes & Bags");
    }

    #[test]
    fn test_parse_workbook_sheets() {
        let xml = r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Summary" sheetId="1" r:id="rId1"/>
    <sheet name="Package &amp; Box" sheetId="2" r:id="rId2"/>
  </sheets>
</workbook>"#;

        let sheets = parse_workbook_sheets(xml).unwrap();
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].name, "Summary");
        assert_eq!(sheets[0].rel_id, "rId1");
        assert_eq!(sheets[1].name, "Package & Box");
        assert_eq!(sheets[1].rel_id, "rId2");
    }

    #[test]
    fn test_parse_relationships() {
        let xml = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing" Target="../drawings/drawing1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
</Relationships>"#;

        let rels = parse_relationships(xml).unwrap();
        assert_eq!(rels.len(), 2);
        assert_eq!(rels[0].target, "../drawings/drawing1.xml");
        assert!(rels[0].rel_type.ends_with(DRAWING_REL_SUFFIX));
        assert!(!rels[0].external);
        assert!(rels[1].external);
    }

    #[test]
    fn test_rels_path_for() {
        assert_eq!(rels_path_for("xl/workbook.xml"), "xl/_rels/workbook.xml.rels");
        assert_eq!(
            rels_path_for("xl/worksheets/sheet3.xml"),
            "xl/worksheets/_rels/sheet3.xml.rels"
        );
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(
            resolve_target("xl/workbook.xml", "worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("xl/workbook.xml", "/xl/worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("xl/worksheets/sheet1.xml", "../drawings/drawing1.xml"),
            "xl/drawings/drawing1.xml"
        );
        assert_eq!(
            resolve_target("xl/drawings/drawing1.xml", "./../media/image1.png"),
            "xl/media/image1.png"
        );
    }

    #[test]
    fn test_from_reader_rejects_non_zip() {
        let result = XlsxPackage::from_reader(std::io::Cursor::new(b"not a zip".to_vec()));
        assert!(result.is_err());
    }
}
