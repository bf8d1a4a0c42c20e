//! Upload rules for shared notes and question papers
//!
//! Validation and object naming only; storing and recording happen in the
//! gateway through [`crate::storage::ObjectStore`] and the repository.

use crate::errors::{AppError, Result};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static UNSAFE_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9.-]").expect("file name regex"));

/// Archive MIME types accepted for note files
pub const NOTE_MIME_TYPES: [&str; 4] = [
    "application/zip",
    "application/x-zip-compressed",
    "application/x-rar-compressed",
    "application/x-7z-compressed",
];

/// Extensions accepted for question papers
pub const QUESTION_EXTENSIONS: [&str; 4] = ["pdf", "jpg", "jpeg", "png"];

/// Map every character outside `[A-Za-z0-9.-]` to `_`
pub fn sanitize_file_name(name: &str) -> String {
    UNSAFE_NAME_CHARS.replace_all(name, "_").into_owned()
}

fn extension(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Course codes become path segments, so they must be plain alphanumerics
pub fn validate_course_code(course_code: &str) -> Result<String> {
    let code = course_code.trim();
    if code.is_empty() {
        return Err(AppError::MissingField {
            field: "course_code".to_string(),
        });
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AppError::validation("course_code", "Invalid course code"));
    }
    Ok(code.to_string())
}

fn check_size(size: u64, limit: u64) -> Result<()> {
    if size == 0 {
        return Err(AppError::validation("file", "File is empty"));
    }
    if size > limit {
        return Err(AppError::PayloadTooLarge {
            size: size as usize,
            limit: limit as usize,
        });
    }
    Ok(())
}

/// Notes must be archives: a known archive MIME type or a `.zip`/`.rar` name
pub fn validate_note_file(file_name: &str, content_type: &str, size: u64, limit: u64) -> Result<()> {
    check_size(size, limit)?;

    let by_type = NOTE_MIME_TYPES.contains(&content_type);
    let by_name = file_name.ends_with(".zip") || file_name.ends_with(".rar");
    if !by_type && !by_name {
        return Err(AppError::validation("file", "Please upload ZIP or RAR files only"));
    }
    Ok(())
}

/// `<course>/<millis>_<sanitized name>`
pub fn note_object_path(course_code: &str, file_name: &str, millis: i64) -> String {
    format!("{}/{}_{}", course_code, millis, sanitize_file_name(file_name))
}

/// Where a shared link points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    GoogleDrive,
    Onedrive,
    Dropbox,
    Other,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::GoogleDrive => "google_drive",
            LinkType::Onedrive => "onedrive",
            LinkType::Dropbox => "dropbox",
            LinkType::Other => "other",
        }
    }
}

impl FromStr for LinkType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "google_drive" => Ok(LinkType::GoogleDrive),
            "onedrive" => Ok(LinkType::Onedrive),
            "dropbox" => Ok(LinkType::Dropbox),
            "other" => Ok(LinkType::Other),
            _ => Err(AppError::validation("link_type", "Unknown link type")),
        }
    }
}

/// Link notes must be absolute http(s) URLs
pub fn validate_link_url(url: &str) -> Result<String> {
    let url = url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !url.contains(char::is_whitespace) => Ok(url.to_string()),
        _ => Err(AppError::InvalidFormat {
            message: "Link must be an http or https URL".to_string(),
        }),
    }
}

/// Exam a question paper belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExamType {
    Midterm,
    Final,
    Quiz,
    Assignment,
}

impl ExamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamType::Midterm => "midterm",
            ExamType::Final => "final",
            ExamType::Quiz => "quiz",
            ExamType::Assignment => "assignment",
        }
    }
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExamType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "midterm" => Ok(ExamType::Midterm),
            "final" => Ok(ExamType::Final),
            "quiz" => Ok(ExamType::Quiz),
            "assignment" => Ok(ExamType::Assignment),
            _ => Err(AppError::validation("exam_type", "Unknown exam type")),
        }
    }
}

/// Describes a question paper before it is stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionMeta {
    pub course_code: String,
    pub semester: String,
    pub year: i32,
    pub exam_type: ExamType,
}

impl QuestionMeta {
    pub fn new(course_code: &str, semester: &str, year: i32, exam_type: ExamType) -> Result<Self> {
        let course_code = validate_course_code(course_code)?;
        let semester = semester.trim();
        if semester.is_empty() || !semester.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::validation("semester", "Invalid semester"));
        }
        if !(1990..=2100).contains(&year) {
            return Err(AppError::validation("year", "Invalid year"));
        }
        Ok(Self {
            course_code,
            semester: semester.to_string(),
            year,
            exam_type,
        })
    }
}

/// Question papers are PDFs or images; returns the lowercase extension
pub fn validate_question_file(file_name: &str, size: u64, limit: u64) -> Result<String> {
    check_size(size, limit)?;

    match extension(file_name) {
        Some(ext) if QUESTION_EXTENSIONS.contains(&ext.as_str()) => Ok(ext),
        _ => Err(AppError::validation(
            "file",
            "Only PDF, JPG and PNG files are allowed",
        )),
    }
}

/// `<course>/<year>/<semester>/<course>_<exam>_<year>_<semester>_<millis>_<name>`
pub fn question_object_path(meta: &QuestionMeta, file_name: &str, millis: i64) -> String {
    format!(
        "{course}/{year}/{semester}/{course}_{exam}_{year}_{semester}_{millis}_{name}",
        course = meta.course_code,
        year = meta.year,
        semester = meta.semester,
        exam = meta.exam_type,
        millis = millis,
        name = sanitize_file_name(file_name),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("CSE 110 notes (final).zip"), "CSE_110_notes__final_.zip");
        assert_eq!(sanitize_file_name("../../etc"), ".._.._etc");
        assert_eq!(sanitize_file_name("নোট.zip"), "___.zip");
    }

    #[test]
    fn test_note_accepts_archive_by_type_or_name() {
        assert!(validate_note_file("a.bin", "application/zip", MIB, 18 * MIB).is_ok());
        assert!(validate_note_file("a.7z", "application/x-7z-compressed", MIB, 18 * MIB).is_ok());
        assert!(validate_note_file("a.rar", "application/octet-stream", MIB, 18 * MIB).is_ok());
        assert!(validate_note_file("a.pdf", "application/pdf", MIB, 18 * MIB).is_err());
    }

    #[test]
    fn test_note_size_limit() {
        let err = validate_note_file("a.zip", "application/zip", 18 * MIB + 1, 18 * MIB).unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge { .. }));
        assert!(validate_note_file("a.zip", "application/zip", 18 * MIB, 18 * MIB).is_ok());
        assert!(validate_note_file("a.zip", "application/zip", 0, 18 * MIB).is_err());
    }

    #[test]
    fn test_note_object_path() {
        assert_eq!(
            note_object_path("CSE110", "my notes.zip", 1700000000000),
            "CSE110/1700000000000_my_notes.zip"
        );
    }

    #[test]
    fn test_course_code_must_be_plain() {
        assert_eq!(validate_course_code(" CSE110 ").unwrap(), "CSE110");
        assert!(validate_course_code("CSE/110").is_err());
        assert!(matches!(
            validate_course_code("  ").unwrap_err(),
            AppError::MissingField { .. }
        ));
    }

    #[test]
    fn test_link_url() {
        assert!(validate_link_url("https://drive.google.com/x").is_ok());
        assert!(validate_link_url("ftp://example.com").is_err());
        assert!(validate_link_url("https://").is_err());
        assert_eq!("onedrive".parse::<LinkType>().unwrap(), LinkType::Onedrive);
        assert!("box".parse::<LinkType>().is_err());
    }

    #[test]
    fn test_question_file_rules() {
        assert_eq!(validate_question_file("Mid.PDF", MIB, 10 * MIB).unwrap(), "pdf");
        assert_eq!(validate_question_file("scan.jpeg", MIB, 10 * MIB).unwrap(), "jpeg");
        assert!(validate_question_file("doc.docx", MIB, 10 * MIB).is_err());
        assert!(validate_question_file("noext", MIB, 10 * MIB).is_err());
        assert!(validate_question_file("big.pdf", 11 * MIB, 10 * MIB).is_err());
    }

    #[test]
    fn test_question_object_path() {
        let meta = QuestionMeta::new("CSE110", "Spring", 2024, ExamType::Midterm).unwrap();
        assert_eq!(
            question_object_path(&meta, "mid term.pdf", 42),
            "CSE110/2024/Spring/CSE110_midterm_2024_Spring_42_mid_term.pdf"
        );
    }

    #[test]
    fn test_question_meta_validation() {
        assert!(QuestionMeta::new("CSE110", "", 2024, ExamType::Final).is_err());
        assert!(QuestionMeta::new("CSE110", "Spring", 1800, ExamType::Final).is_err());
        assert!("exam".parse::<ExamType>().is_err());
        assert_eq!("quiz".parse::<ExamType>().unwrap(), ExamType::Quiz);
    }
}
