// src/pipeline/export.rs

//! Script export: the full record list as one constant assignment, ready to
//! be included as data by a front end.

use std::path::Path;

use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::models::CourseRecord;

/// Render `const <name> = [...];` with two-space indented JSON.
///
/// Non-ASCII text is written as is, not escaped.
pub fn serialize(records: &[CourseRecord], variable_name: &str) -> Result<String> {
    let json = serde_json::to_string_pretty(records)?;
    Ok(format!("const {variable_name} = {json};"))
}

/// Write the export atomically (temp file, then rename).
pub async fn write_export(
    path: &Path,
    records: &[CourseRecord],
    variable_name: &str,
) -> Result<()> {
    let content = serialize(records, variable_name)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await?;
    drop(file);
    tokio::fs::rename(&tmp, path).await?;

    log::info!("Exported {} records to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeSpan;
    use tempfile::TempDir;

    fn sample() -> CourseRecord {
        CourseRecord {
            crn: "123".into(),
            code: "CS101".into(),
            name: "Intro".into(),
            teaching_method: "Örgün".into(),
            instructor: "Doe".into(),
            building: "BBB".into(),
            day: "Çarşamba".into(),
            time: TimeSpan::new("11:00", "12:51"),
            classroom: "A2".into(),
            capacity: 30,
            enrolled: 25,
        }
    }

    #[test]
    fn test_serialize_shape() {
        let text = serialize(&[sample()], "courseData").unwrap();
        assert!(text.starts_with("const courseData = [\n  {\n    \"crn\": \"123\","));
        assert!(text.ends_with("];"));
        assert!(text.contains("\"day\": \"Çarşamba\""));
        assert!(text.contains("\"teachingMethod\": \"Örgün\""));
        assert!(text.contains("\"time\": {\n      \"start\": \"11:00\",\n      \"end\": \"12:51\"\n    }"));
    }

    #[test]
    fn test_serialize_field_order() {
        let text = serialize(&[sample()], "x").unwrap();
        let order = [
            "crn", "code", "name", "teachingMethod", "instructor", "building", "day", "time",
            "classroom", "capacity", "enrolled",
        ];
        let positions: Vec<usize> = order
            .iter()
            .map(|k| text.find(&format!("\"{k}\":")).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_serialize_empty() {
        assert_eq!(serialize(&[], "courseData").unwrap(), "const courseData = [];");
    }

    #[tokio::test]
    async fn test_write_export_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out/course_data.js");
        write_export(&path, &[sample()], "courseData").await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let json = text
            .strip_prefix("const courseData = ")
            .and_then(|t| t.strip_suffix(';'))
            .unwrap();
        let back: Vec<CourseRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(back, vec![sample()]);
        assert!(!tmp.path().join("out/course_data.tmp").exists());
    }
}
