#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use uuid::Uuid;
use zip::write::SimpleFileOptions;

/// One generated document, kept so tests can assert on its rows
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub id: String,
    pub level: u32,
    pub objects: Vec<String>,
}

impl GeneratedDocument {
    pub fn random(index: usize) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            level: (index % 100) as u32 + 1,
            objects: (0..3).map(|_| Uuid::new_v4().to_string()).collect(),
        }
    }

    pub fn to_xml(&self) -> String {
        document_xml(&self.id, &self.level.to_string(), &self.objects)
    }

    pub fn level_row(&self) -> String {
        format!("{};{}", self.id, self.level)
    }

    pub fn object_rows(&self) -> Vec<String> {
        self.objects
            .iter()
            .map(|object| format!("{};{}", self.id, object))
            .collect()
    }
}

/// XML in the layout the extractor expects
pub fn document_xml(id: &str, level: &str, objects: &[String]) -> String {
    let mut xml = format!(
        "<root><var name=\"id\" value=\"{}\"/><var name=\"level\" value=\"{}\"/>\n<objects>\n",
        id, level
    );
    for object in objects {
        xml.push_str(&format!("<object name=\"{}\"/>\n", object));
    }
    xml.push_str("</objects></root>");
    xml
}

/// Write a zip archive with the given `(entry name, payload)` pairs
pub fn write_archive(path: &Path, entries: &[(String, Vec<u8>)]) {
    let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
    for (name, data) in entries {
        writer
            .start_file(name.as_str(), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
}

/// Scratch input directory plus a separate directory for outputs
pub struct Workspace {
    pub input: TempDir,
    pub output: TempDir,
    pub documents: Vec<GeneratedDocument>,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            input: TempDir::new().unwrap(),
            output: TempDir::new().unwrap(),
            documents: Vec::new(),
        }
    }

    pub fn levels_path(&self) -> PathBuf {
        self.output.path().join("levels.csv")
    }

    pub fn objects_path(&self) -> PathBuf {
        self.output.path().join("objects.csv")
    }

    /// Archive of `count` valid documents
    pub fn add_valid_archive(&mut self, name: &str, count: usize) -> PathBuf {
        let documents: Vec<GeneratedDocument> =
            (0..count).map(GeneratedDocument::random).collect();
        let entries = documents
            .iter()
            .enumerate()
            .map(|(i, doc)| (format!("xml_{}.xml", i), doc.to_xml().into_bytes()))
            .collect::<Vec<_>>();

        let path = self.input.path().join(name);
        write_archive(&path, &entries);
        self.documents.extend(documents);
        path
    }

    /// Archive with valid documents around one malformed entry
    pub fn add_archive_with_bad_xml(&mut self, name: &str) -> PathBuf {
        let first = GeneratedDocument::random(0);
        let second = GeneratedDocument::random(1);
        let entries = vec![
            ("xml_0.xml".to_string(), first.to_xml().into_bytes()),
            (
                "xml_1.xml".to_string(),
                b"<root><var name=\"id\" value=\"broken\"".to_vec(),
            ),
            ("xml_2.xml".to_string(), second.to_xml().into_bytes()),
        ];

        let path = self.input.path().join(name);
        write_archive(&path, &entries);
        self.documents.push(first);
        self.documents.push(second);
        path
    }

    /// Zero-byte file with an archive name
    pub fn add_empty_file(&self, name: &str) -> PathBuf {
        let path = self.input.path().join(name);
        File::create(&path).unwrap();
        path
    }

    pub fn expected_level_rows(&self) -> Vec<String> {
        let mut rows: Vec<String> = self.documents.iter().map(|d| d.level_row()).collect();
        rows.sort();
        rows
    }

    pub fn expected_object_rows(&self) -> Vec<String> {
        let mut rows: Vec<String> = self
            .documents
            .iter()
            .flat_map(|d| d.object_rows())
            .collect();
        rows.sort();
        rows
    }
}

/// Lines of a table, sorted so completion order does not matter
pub fn sorted_rows(path: &Path) -> Vec<String> {
    let content = std::fs::read_to_string(path).unwrap();
    let mut rows: Vec<String> = content.lines().map(str::to_string).collect();
    rows.sort();
    rows
}
