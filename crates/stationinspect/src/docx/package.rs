//! OOXML package parts and the zip container.

use std::collections::BTreeSet;
use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{xml_text, DocxBuilder};
use crate::error::Result;

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const DRAWING_NS: &str =
    "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const MAIN_DRAWING_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const PICTURE_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Write every part of the document into a zip archive.
pub(super) fn write(builder: &DocxBuilder) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(&mut buffer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", content_types(builder)),
        ("_rels/.rels", package_relationships()),
        ("docProps/core.xml", core_properties(builder)),
        ("docProps/app.xml", app_properties()),
        ("word/document.xml", document(builder)),
        ("word/styles.xml", styles()),
        ("word/_rels/document.xml.rels", document_relationships(builder)),
    ];
    for (name, xml) in parts {
        zip.start_file(name, options)?;
        zip.write_all(xml.as_bytes())?;
    }

    for media in &builder.media {
        zip.start_file(format!("word/media/{}", media.name), options)?;
        zip.write_all(&media.bytes)?;
    }

    zip.finish()?;
    Ok(buffer.into_inner())
}

fn content_types(builder: &DocxBuilder) -> String {
    let formats: BTreeSet<_> = builder
        .media
        .iter()
        .map(|m| (m.format.extension(), m.format.content_type()))
        .collect();

    let mut xml = format!(
        r#"{XML_DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#
    );
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    for (extension, content_type) in formats {
        xml.push_str(&format!(
            r#"<Default Extension="{extension}" ContentType="{content_type}"/>"#
        ));
    }
    xml.push_str(r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#);
    xml.push_str(r#"<Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>"#);
    xml.push_str(r#"<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#);
    xml.push_str(r#"<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#);
    xml.push_str("</Types>");
    xml
}

fn package_relationships() -> String {
    format!(
        concat!(
            "{decl}",
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"<Relationship Id="rId1" Type="{rel}/officeDocument" Target="word/document.xml"/>"#,
            r#"<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>"#,
            r#"<Relationship Id="rId3" Type="{rel}/extended-properties" Target="docProps/app.xml"/>"#,
            "</Relationships>"
        ),
        decl = XML_DECL,
        rel = REL_NS,
    )
}

fn core_properties(builder: &DocxBuilder) -> String {
    let created = builder.created.format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        concat!(
            "{decl}",
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
            r#"xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" "#,
            r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
            "<dc:title>{title}</dc:title><dc:creator>{author}</dc:creator>",
            r#"<dcterms:created xsi:type="dcterms:W3CDTF">{created}</dcterms:created>"#,
            r#"<dcterms:modified xsi:type="dcterms:W3CDTF">{created}</dcterms:modified>"#,
            "</cp:coreProperties>"
        ),
        decl = XML_DECL,
        title = xml_text(&builder.title),
        author = xml_text(&builder.author),
        created = created,
    )
}

fn app_properties() -> String {
    format!(
        concat!(
            "{decl}",
            r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">"#,
            "<Application>{app}</Application></Properties>"
        ),
        decl = XML_DECL,
        app = env!("CARGO_PKG_NAME"),
    )
}

fn document(builder: &DocxBuilder) -> String {
    format!(
        concat!(
            "{decl}",
            r#"<w:document xmlns:w="{w}" xmlns:r="{r}" xmlns:wp="{wp}" xmlns:a="{a}" xmlns:pic="{pic}">"#,
            "<w:body>{body}",
            r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/>"#,
            r#"<w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="708" w:footer="708" w:gutter="0"/>"#,
            "</w:sectPr></w:body></w:document>"
        ),
        decl = XML_DECL,
        w = WORD_NS,
        r = REL_NS,
        wp = DRAWING_NS,
        a = MAIN_DRAWING_NS,
        pic = PICTURE_NS,
        body = builder.body,
    )
}

fn styles() -> String {
    format!(
        concat!(
            "{decl}",
            r#"<w:styles xmlns:w="{w}">"#,
            "<w:docDefaults><w:rPrDefault><w:rPr>",
            r#"<w:rFonts w:ascii="Times New Roman" w:hAnsi="Times New Roman" w:cs="Times New Roman"/>"#,
            r#"<w:sz w:val="24"/><w:szCs w:val="24"/>"#,
            "</w:rPr></w:rPrDefault>",
            r#"<w:pPrDefault><w:pPr><w:spacing w:after="120" w:line="240" w:lineRule="auto"/></w:pPr></w:pPrDefault>"#,
            "</w:docDefaults>",
            r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>"#,
            r#"<w:style w:type="table" w:styleId="TableGrid"><w:name w:val="Table Grid"/><w:tblPr><w:tblBorders>"#,
            r#"<w:top w:val="single" w:sz="4" w:space="0" w:color="000000"/>"#,
            r#"<w:left w:val="single" w:sz="4" w:space="0" w:color="000000"/>"#,
            r#"<w:bottom w:val="single" w:sz="4" w:space="0" w:color="000000"/>"#,
            r#"<w:right w:val="single" w:sz="4" w:space="0" w:color="000000"/>"#,
            r#"<w:insideH w:val="single" w:sz="4" w:space="0" w:color="000000"/>"#,
            r#"<w:insideV w:val="single" w:sz="4" w:space="0" w:color="000000"/>"#,
            "</w:tblBorders></w:tblPr></w:style>",
            "</w:styles>"
        ),
        decl = XML_DECL,
        w = WORD_NS,
    )
}

fn document_relationships(builder: &DocxBuilder) -> String {
    let mut xml = format!(
        r#"{XML_DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#
    );
    xml.push_str(&format!(
        r#"<Relationship Id="rIdStyles" Type="{REL_NS}/styles" Target="styles.xml"/>"#
    ));
    for media in &builder.media {
        xml.push_str(&format!(
            r#"<Relationship Id="{}" Type="{REL_NS}/image" Target="media/{}"/>"#,
            media.relationship_id, media.name
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::super::image::fixtures::{gif, png};
    use super::super::{Align, Paragraph, Table};
    use super::*;

    fn read_part(archive: &mut zip::ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
        let mut text = String::new();
        archive
            .by_name(name)
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        text
    }

    #[test]
    fn test_package_contains_required_parts() {
        let mut builder = DocxBuilder::new("Report <1>", "Inspector");
        builder
            .paragraph(Paragraph::text("Hello"))
            .table(&Table::new().field("Name", "Site"));
        let bytes = builder.finish().unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        for name in [
            "[Content_Types].xml",
            "_rels/.rels",
            "docProps/core.xml",
            "docProps/app.xml",
            "word/document.xml",
            "word/styles.xml",
            "word/_rels/document.xml.rels",
        ] {
            assert!(archive.by_name(name).is_ok(), "missing {name}");
        }

        let document = read_part(&mut archive, "word/document.xml");
        assert!(document.contains("Hello"));
        assert!(document.contains(r#"w:w="11906""#));
        let core = read_part(&mut archive, "docProps/core.xml");
        assert!(core.contains("Report &lt;1&gt;"));
    }

    #[test]
    fn test_package_strips_control_characters() {
        let mut builder = DocxBuilder::new("Limuru\u{1}Hill", "Jane\u{8}");
        builder.paragraph(Paragraph::text("Site: Limuru\u{1}Hill"));
        let bytes = builder.finish().unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let document = read_part(&mut archive, "word/document.xml");
        assert!(!document.contains('\u{1}'));
        assert!(document.contains("Site: LimuruHill"));
        let core = read_part(&mut archive, "docProps/core.xml");
        assert!(!core.contains('\u{1}'));
        assert!(!core.contains('\u{8}'));
        assert!(core.contains("<dc:title>LimuruHill</dc:title>"));
    }

    #[test]
    fn test_package_media_and_content_types() {
        let mut builder = DocxBuilder::new("Report", "Inspector");
        builder.image(png(40, 20), 80, Align::Center).unwrap();
        builder.image(gif(40, 20), 80, Align::Center).unwrap();
        builder.image(png(10, 10), 50, Align::Left).unwrap();
        let bytes = builder.finish().unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert!(archive.by_name("word/media/image1.png").is_ok());
        assert!(archive.by_name("word/media/image2.gif").is_ok());
        assert!(archive.by_name("word/media/image3.png").is_ok());

        let types = read_part(&mut archive, "[Content_Types].xml");
        assert_eq!(types.matches(r#"Extension="png""#).count(), 1);
        assert!(types.contains(r#"Extension="gif""#));

        let rels = read_part(&mut archive, "word/_rels/document.xml.rels");
        assert!(rels.contains(r#"Id="rIdImage3""#));
    }
}
