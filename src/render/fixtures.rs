//! Artifact builders shared by render and orchestrator tests.

use chrono::{TimeZone, Utc};
use flate2::Compression;
use flate2::write::{DeflateEncoder, ZlibEncoder};
use lopdf::{Document, Object, dictionary};
use std::io::Write;
use uuid::Uuid;

use super::epub::build_package;
use super::tests::sample_job;

pub(crate) struct ZipFile<'a> {
    name: &'a str,
    data: &'a [u8],
    deflate: bool,
}

impl<'a> ZipFile<'a> {
    pub(crate) fn stored(name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            data,
            deflate: false,
        }
    }

    pub(crate) fn deflated(name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            data,
            deflate: true,
        }
    }
}

/// Minimal single-disk ZIP writer
pub(crate) fn write_zip(files: &[ZipFile<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut directory = Vec::new();
    for file in files {
        let mut crc = flate2::Crc::new();
        crc.update(file.data);
        let (method, payload) = if file.deflate {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
            encoder.write_all(file.data).unwrap();
            (8u16, encoder.finish().unwrap())
        } else {
            (0u16, file.data.to_vec())
        };
        let offset = out.len() as u32;
        let name = file.name.as_bytes();

        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&method.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&crc.sum().to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&(file.data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name);
        out.extend_from_slice(&payload);

        directory.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        directory.extend_from_slice(&20u16.to_le_bytes());
        directory.extend_from_slice(&20u16.to_le_bytes());
        directory.extend_from_slice(&0u16.to_le_bytes());
        directory.extend_from_slice(&method.to_le_bytes());
        directory.extend_from_slice(&[0; 4]);
        directory.extend_from_slice(&crc.sum().to_le_bytes());
        directory.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        directory.extend_from_slice(&(file.data.len() as u32).to_le_bytes());
        directory.extend_from_slice(&(name.len() as u16).to_le_bytes());
        directory.extend_from_slice(&[0; 12]);
        directory.extend_from_slice(&offset.to_le_bytes());
        directory.extend_from_slice(name);
    }

    let directory_offset = out.len() as u32;
    out.extend_from_slice(&directory);
    out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&(files.len() as u16).to_le_bytes());
    out.extend_from_slice(&(files.len() as u16).to_le_bytes());
    out.extend_from_slice(&(directory.len() as u32).to_le_bytes());
    out.extend_from_slice(&directory_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}

/// Files of a real package built from a small manuscript
pub(crate) fn epub_files() -> Vec<(String, Vec<u8>)> {
    let job = sample_job(
        "# One\n\nFirst chapter.\n\n# Two\n\nSecond chapter.\n",
        std::path::PathBuf::from("book.epub"),
    );
    let date = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    build_package(&job, Uuid::nil(), date).files
}

/// Zip `files` the way the packager does: `mimetype` stored, the rest deflated
pub(crate) fn zip_epub(files: &[(String, Vec<u8>)]) -> Vec<u8> {
    let entries: Vec<ZipFile<'_>> = files
        .iter()
        .map(|(name, data)| {
            if name == "mimetype" {
                ZipFile::stored(name, data)
            } else {
                ZipFile::deflated(name, data)
            }
        })
        .collect();
    write_zip(&entries)
}

pub(crate) fn epub_archive() -> Vec<u8> {
    zip_epub(&epub_files())
}

/// PDF with `pages` blank A4 pages
pub(crate) fn pdf_with_pages(pages: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let media_box: Vec<Object> = [0, 0, 595, 842].into_iter().map(Object::Integer).collect();
    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => media_box.clone(),
            })
            .into()
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => i64::from(pages),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

/// Two-page PDF 1.5 whose page objects live in a compressed object stream,
/// indexed by a cross-reference stream
pub(crate) fn object_stream_pdf() -> Vec<u8> {
    let page = "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 595 842] >>";
    let header = format!("3 0 4 {} ", page.len() + 1);
    let packed = format!("{}{} {}", header, page, page);
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(packed.as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();

    let mut out = b"%PDF-1.5\n".to_vec();
    let mut offsets = [0usize; 7];
    offsets[1] = out.len();
    out.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    offsets[2] = out.len();
    out.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>\nendobj\n");
    offsets[5] = out.len();
    out.extend_from_slice(
        format!(
            "5 0 obj\n<< /Type /ObjStm /N 2 /First {} /Filter /FlateDecode /Length {} >>\nstream\n",
            header.len(),
            compressed.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(&compressed);
    out.extend_from_slice(b"\nendstream\nendobj\n");
    offsets[6] = out.len();

    // W [1 4 2]: type, offset or stream number, generation or index
    let mut rows = Vec::new();
    let mut row = |kind: u8, field: u32, extra: u16| {
        rows.push(kind);
        rows.extend_from_slice(&field.to_be_bytes());
        rows.extend_from_slice(&extra.to_be_bytes());
    };
    row(0, 0, 0xffff);
    row(1, offsets[1] as u32, 0);
    row(1, offsets[2] as u32, 0);
    row(2, 5, 0);
    row(2, 5, 1);
    row(1, offsets[5] as u32, 0);
    row(1, offsets[6] as u32, 0);
    out.extend_from_slice(
        format!(
            "6 0 obj\n<< /Type /XRef /Size 7 /W [1 4 2] /Root 1 0 R /Length {} >>\nstream\n",
            rows.len()
        )
        .as_bytes(),
    );
    out.extend_from_slice(&rows);
    out.extend_from_slice(b"\nendstream\nendobj\n");
    out.extend_from_slice(format!("startxref\n{}\n%%EOF\n", offsets[6]).as_bytes());
    out
}
