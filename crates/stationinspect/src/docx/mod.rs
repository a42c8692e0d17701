//! Minimal WordprocessingML writer.
//!
//! Builds the body of a `.docx` from paragraphs, tables and inline images
//! and packages it with [`package`]. Only the features reports use are
//! supported: bold/italic/underlined runs, alignment, bordered tables, page
//! breaks and pictures scaled to a fraction of the text width.

pub mod image;
mod package;

use chrono::{DateTime, Utc};
use htmlescape::encode_minimal;

use crate::error::{Error, Result};
pub use image::{sniff, ImageFormat, ImageInfo};

/// EMUs per inch.
pub const EMU_PER_INCH: f64 = 914_400.0;

/// Usable text width of an A4 page with 1 inch margins, in inches.
pub const TEXT_WIDTH_INCHES: f64 = 6.5;

/// Escape text for XML, dropping characters XML 1.0 does not allow.
pub(crate) fn xml_text(text: &str) -> String {
    let allowed: String = text
        .chars()
        .filter(|&c| match c {
            '\t' | '\n' | '\r' => true,
            '\u{FFFE}' | '\u{FFFF}' => false,
            c => c >= ' ',
        })
        .collect();
    encode_minimal(&allowed)
}

/// Paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    /// Left aligned.
    #[default]
    Left,
    /// Centered.
    Center,
    /// Right aligned.
    Right,
    /// Justified.
    Justify,
}

impl Align {
    fn as_xml(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Justify => "both",
        }
    }
}

/// A run of text sharing one format.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    text: String,
    bold: bool,
    italic: bool,
    underline: bool,
    size_pt: Option<u32>,
}

impl Run {
    /// Plain text.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Bold.
    #[must_use]
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Italic.
    #[must_use]
    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    /// Single underline.
    #[must_use]
    pub fn underline(mut self) -> Self {
        self.underline = true;
        self
    }

    /// Font size in points.
    #[must_use]
    pub fn size(mut self, points: u32) -> Self {
        self.size_pt = Some(points);
        self
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("<w:r>");
        if self.bold || self.italic || self.underline || self.size_pt.is_some() {
            out.push_str("<w:rPr>");
            if self.bold {
                out.push_str("<w:b/>");
            }
            if self.italic {
                out.push_str("<w:i/>");
            }
            if self.underline {
                out.push_str(r#"<w:u w:val="single"/>"#);
            }
            if let Some(points) = self.size_pt {
                let half_points = points * 2;
                out.push_str(&format!(
                    r#"<w:sz w:val="{half_points}"/><w:szCs w:val="{half_points}"/>"#
                ));
            }
            out.push_str("</w:rPr>");
        }
        for (index, line) in self.text.split('\n').enumerate() {
            if index > 0 {
                out.push_str("<w:br/>");
            }
            out.push_str(r#"<w:t xml:space="preserve">"#);
            out.push_str(&xml_text(line));
            out.push_str("</w:t>");
        }
        out.push_str("</w:r>");
    }
}

/// A paragraph of runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paragraph {
    runs: Vec<Run>,
    align: Align,
    keep_with_next: bool,
    space_after_pt: Option<u32>,
    indent_left_pt: Option<u32>,
}

impl Paragraph {
    /// Empty paragraph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Paragraph with one plain run.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new().run(Run::new(text))
    }

    /// Append a run.
    #[must_use]
    pub fn run(mut self, run: Run) -> Self {
        self.runs.push(run);
        self
    }

    /// Set the alignment.
    #[must_use]
    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    /// Keep on the same page as the next paragraph.
    #[must_use]
    pub fn keep_with_next(mut self) -> Self {
        self.keep_with_next = true;
        self
    }

    /// Spacing after the paragraph in points.
    #[must_use]
    pub fn space_after(mut self, points: u32) -> Self {
        self.space_after_pt = Some(points);
        self
    }

    /// Left indent in points.
    #[must_use]
    pub fn indent(mut self, points: u32) -> Self {
        self.indent_left_pt = Some(points);
        self
    }

    fn write_properties(&self, out: &mut String) {
        out.push_str("<w:pPr>");
        if self.keep_with_next {
            out.push_str("<w:keepNext/>");
        }
        if let Some(points) = self.space_after_pt {
            out.push_str(&format!(r#"<w:spacing w:after="{}"/>"#, points * 20));
        }
        if let Some(points) = self.indent_left_pt {
            out.push_str(&format!(r#"<w:ind w:left="{}"/>"#, points * 20));
        }
        out.push_str(&format!(r#"<w:jc w:val="{}"/>"#, self.align.as_xml()));
        out.push_str("</w:pPr>");
    }

    fn write_xml(&self, out: &mut String) {
        out.push_str("<w:p>");
        self.write_properties(out);
        for run in &self.runs {
            run.write_xml(out);
        }
        out.push_str("</w:p>");
    }
}

/// A bordered table of text cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: Vec<(Vec<String>, bool)>,
}

impl Table {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bold header row.
    #[must_use]
    pub fn header<S: Into<String>>(mut self, cells: impl IntoIterator<Item = S>) -> Self {
        self.rows
            .push((cells.into_iter().map(Into::into).collect(), true));
        self
    }

    /// Append a row; the first cell is the label.
    #[must_use]
    pub fn row<S: Into<String>>(mut self, cells: impl IntoIterator<Item = S>) -> Self {
        self.rows
            .push((cells.into_iter().map(Into::into).collect(), false));
        self
    }

    /// Append a label/value row.
    #[must_use]
    pub fn field(self, label: &str, value: impl Into<String>) -> Self {
        self.row([label.to_string(), value.into()])
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn columns(&self) -> usize {
        self.rows
            .iter()
            .map(|(cells, _)| cells.len())
            .max()
            .unwrap_or(0)
    }

    fn write_xml(&self, out: &mut String) {
        let columns = self.columns().max(1);
        let total_twips = 9360;
        let column_twips = total_twips / columns;

        out.push_str("<w:tbl><w:tblPr>");
        out.push_str(r#"<w:tblStyle w:val="TableGrid"/>"#);
        out.push_str(&format!(r#"<w:tblW w:w="{total_twips}" w:type="dxa"/>"#));
        out.push_str("</w:tblPr><w:tblGrid>");
        for _ in 0..columns {
            out.push_str(&format!(r#"<w:gridCol w:w="{column_twips}"/>"#));
        }
        out.push_str("</w:tblGrid>");

        for (cells, is_header) in &self.rows {
            out.push_str("<w:tr>");
            for index in 0..columns {
                let text = cells.get(index).map_or("", String::as_str);
                out.push_str(&format!(
                    r#"<w:tc><w:tcPr><w:tcW w:w="{column_twips}" w:type="dxa"/></w:tcPr>"#
                ));
                let mut run = Run::new(text);
                if *is_header || (index == 0 && columns > 1) {
                    run = run.bold();
                }
                Paragraph::new().run(run).write_xml(out);
                out.push_str("</w:tc>");
            }
            out.push_str("</w:tr>");
        }
        out.push_str("</w:tbl>");
    }
}

/// An image stored in the package under `word/media/`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MediaPart {
    name: String,
    relationship_id: String,
    format: ImageFormat,
    bytes: Vec<u8>,
}

/// Accumulates a document body and its media.
#[derive(Debug, Clone)]
pub struct DocxBuilder {
    title: String,
    author: String,
    created: DateTime<Utc>,
    body: String,
    media: Vec<MediaPart>,
}

impl DocxBuilder {
    /// Start a document with core properties.
    #[must_use]
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            created: Utc::now(),
            body: String::new(),
            media: Vec::new(),
        }
    }

    /// Override the creation time recorded in the package.
    #[must_use]
    pub fn created_at(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    /// Append a paragraph.
    pub fn paragraph(&mut self, paragraph: Paragraph) -> &mut Self {
        paragraph.write_xml(&mut self.body);
        self
    }

    /// Append a bold, underlined section heading.
    pub fn heading(&mut self, text: impl Into<String>) -> &mut Self {
        self.paragraph(
            Paragraph::new()
                .run(Run::new(text).bold().underline())
                .keep_with_next()
                .space_after(6),
        )
    }

    /// Append a bullet item.
    pub fn bullet(&mut self, text: impl Into<String>) -> &mut Self {
        self.paragraph(
            Paragraph::new()
                .run(Run::new(format!("• {}", text.into())))
                .indent(18)
                .align(Align::Justify),
        )
    }

    /// Append an empty paragraph.
    pub fn blank_line(&mut self) -> &mut Self {
        self.paragraph(Paragraph::new())
    }

    /// Append a table followed by a blank line.
    pub fn table(&mut self, table: &Table) -> &mut Self {
        table.write_xml(&mut self.body);
        self.blank_line()
    }

    /// Start a new page.
    pub fn page_break(&mut self) -> &mut Self {
        self.body
            .push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#);
        self
    }

    /// Append an inline picture in its own paragraph.
    ///
    /// `width_percentage` is relative to the text width; the aspect ratio of
    /// the image is kept.
    ///
    /// # Errors
    ///
    /// Returns a document error if the bytes are not a PNG, JPEG or GIF image.
    pub fn image(
        &mut self,
        bytes: Vec<u8>,
        width_percentage: u32,
        align: Align,
    ) -> Result<&mut Self> {
        let info = sniff(&bytes)
            .ok_or_else(|| Error::document("image data is not a supported PNG, JPEG or GIF"))?;

        let number = self.media.len() + 1;
        let relationship_id = format!("rIdImage{number}");
        let name = format!("image{number}.{}", info.format.extension());
        let (cx, cy) = image_extent(&info, width_percentage);

        self.body.push_str("<w:p>");
        Paragraph::new().align(align).write_properties(&mut self.body);
        self.body.push_str("<w:r>");
        self.body.push_str(&drawing_xml(number, &name, &relationship_id, cx, cy));
        self.body.push_str("</w:r></w:p>");

        self.media.push(MediaPart {
            name,
            relationship_id,
            format: info.format,
            bytes,
        });
        Ok(self)
    }

    /// Number of images added.
    #[must_use]
    pub fn image_count(&self) -> usize {
        self.media.len()
    }

    /// Package the document.
    ///
    /// # Errors
    ///
    /// Returns an error if writing the archive fails.
    pub fn finish(self) -> Result<Vec<u8>> {
        package::write(&self)
    }
}

/// Picture size in EMUs for a width percentage of the text width.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn image_extent(info: &ImageInfo, width_percentage: u32) -> (u64, u64) {
    let percentage = f64::from(width_percentage.clamp(1, 100));
    let width = TEXT_WIDTH_INCHES * percentage / 100.0 * EMU_PER_INCH;
    let height = width * info.aspect_ratio();
    (width.round() as u64, height.round() as u64)
}

fn drawing_xml(number: usize, name: &str, relationship_id: &str, cx: u64, cy: u64) -> String {
    format!(
        concat!(
            r#"<w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0">"#,
            r#"<wp:extent cx="{cx}" cy="{cy}"/>"#,
            r#"<wp:docPr id="{number}" name="Picture {number}"/>"#,
            r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
            r#"<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:pic><pic:nvPicPr><pic:cNvPr id="{number}" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            r#"<pic:blipFill><a:blip r:embed="{rid}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic>"#,
            r#"</a:graphicData></a:graphic></wp:inline></w:drawing>"#,
        ),
        cx = cx,
        cy = cy,
        number = number,
        name = name,
        rid = relationship_id,
    )
}

#[cfg(test)]
mod tests {
    use super::image::fixtures::png;
    use super::*;

    #[test]
    fn test_xml_text_drops_control_characters() {
        assert_eq!(xml_text("Limuru\u{1}Hill"), "LimuruHill");
        assert_eq!(xml_text("a\u{b}\u{c}\u{1f}b\u{FFFF}"), "ab");
        assert_eq!(xml_text("tab\there <&>"), "tab\there &lt;&amp;&gt;");
    }

    #[test]
    fn test_run_formatting() {
        let mut out = String::new();
        Run::new("A & B").bold().italic().size(14).write_xml(&mut out);
        assert!(out.contains("<w:b/>"));
        assert!(out.contains("<w:i/>"));
        assert!(out.contains(r#"<w:sz w:val="28"/>"#));
        assert!(out.contains("A &amp; B"));
    }

    #[test]
    fn test_run_line_breaks() {
        let mut out = String::new();
        Run::new("one\ntwo").write_xml(&mut out);
        assert_eq!(out.matches("<w:br/>").count(), 1);
        assert_eq!(out.matches("<w:t ").count(), 2);
    }

    #[test]
    fn test_paragraph_alignment() {
        let mut out = String::new();
        Paragraph::text("RE: TITLE").align(Align::Center).write_xml(&mut out);
        assert!(out.contains(r#"<w:jc w:val="center"/>"#));
    }

    #[test]
    fn test_table_pads_short_rows() {
        let table = Table::new()
            .header(["Parameter", "CH.1", "CH.2"])
            .field("Frequency", "98.4");
        let mut out = String::new();
        table.write_xml(&mut out);
        assert_eq!(table.len(), 2);
        assert_eq!(out.matches("<w:gridCol ").count(), 3);
        assert_eq!(out.matches("<w:tc>").count(), 6);
    }

    #[test]
    fn test_image_extent_scales_width() {
        let info = sniff(&png(800, 400)).unwrap();
        let (cx, cy) = image_extent(&info, 80);
        assert_eq!(cx, 4_754_880);
        assert_eq!(cy, 2_377_440);
        let (full, _) = image_extent(&info, 250);
        assert_eq!(full, 5_943_600);
    }

    #[test]
    fn test_image_rejects_non_image() {
        let mut builder = DocxBuilder::new("Title", "Author");
        assert!(builder.image(b"plain text".to_vec(), 80, Align::Center).is_err());
        assert_eq!(builder.image_count(), 0);
    }

    #[test]
    fn test_image_adds_media() {
        let mut builder = DocxBuilder::new("Title", "Author");
        builder.image(png(100, 50), 50, Align::Center).unwrap();
        assert_eq!(builder.image_count(), 1);
        assert!(builder.body.contains(r#"r:embed="rIdImage1""#));
        assert!(builder.body.contains("image1.png"));
    }
}
