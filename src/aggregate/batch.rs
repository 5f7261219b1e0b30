use crate::error::{ArchiveError, FetchError};
use crate::parsers::ExtractedDocument;
use crate::results::FetchResult;
use serde::Serialize;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Characters that cannot appear in an artifact name
const UNSAFE_NAME_CHARS: [char; 9] = ['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// One named file of a batch result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchArtifact {
    pub name: String,
    pub body: String,
}

impl BatchArtifact {
    fn new(name: String, body: String) -> Self {
        Self { name, body }
    }
}

/// Page title turned into something usable as a file name, `None` if nothing is left
pub fn sanitize_title(title: &str) -> Option<String> {
    let cleaned: String = title.chars().filter(|c| !UNSAFE_NAME_CHARS.contains(c)).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Build one artifact per URL from the fan-out results, which must be in URL order
pub fn assemble_batch(
    urls: &[String],
    results: Vec<Result<FetchResult, FetchError>>,
    include_images: bool,
) -> Vec<BatchArtifact> {
    let mut used_names: HashSet<String> = HashSet::new();
    let mut artifacts = Vec::with_capacity(urls.len());

    for (i, (url, result)) in urls.iter().zip(results).enumerate() {
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                ::log::error!("Failed to scrape {}: {}", url, e);
                let name = unique_name(&mut used_names, format!("error_{}", i), "txt", i);
                artifacts.push(BatchArtifact::new(
                    name,
                    format!("Failed to scrape {}\nError: {}", url, e),
                ));
                continue;
            }
        };

        let title = page
            .title
            .clone()
            .unwrap_or_else(|| format!("page_{}", i));
        let safe_title = sanitize_title(&title).unwrap_or_else(|| format!("page_{}", i));

        match page.non_empty_content() {
            Some(raw_html) => {
                let document = ExtractedDocument::from_html(raw_html, None, include_images);
                let name = unique_name(&mut used_names, safe_title, "md", i);
                artifacts.push(BatchArtifact::new(
                    name,
                    format!(
                        "---\nurl: {}\ntitle: {}\n---\n\n{}",
                        url, title, document.markdown
                    ),
                ));
            }
            None => {
                let name =
                    unique_name(&mut used_names, format!("{}_empty", safe_title), "txt", i);
                artifacts.push(BatchArtifact::new(
                    name,
                    format!("No content found for {}", url),
                ));
            }
        }
    }

    artifacts
}

/// `{stem}.{extension}`, falling back to `{stem}_{index}` and then `{stem}_{index}_{n}` until unused
fn unique_name(used: &mut HashSet<String>, stem: String, extension: &str, index: usize) -> String {
    let mut name = format!("{}.{}", stem, extension);
    let mut attempt = 0;
    while used.contains(&name) {
        name = match attempt {
            0 => format!("{}_{}.{}", stem, index, extension),
            n => format!("{}_{}_{}.{}", stem, index, n, extension),
        };
        attempt += 1;
    }
    used.insert(name.clone());
    name
}

/// Pack artifacts into a deflate-compressed zip archive
pub fn write_archive(artifacts: &[BatchArtifact]) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for artifact in artifacts {
        writer.start_file(artifact.name.as_str(), options)?;
        writer.write_all(artifact.body.as_bytes())?;
    }

    let cursor = writer.finish()?;
    ::log::info!("Packed {} artifacts into archive", artifacts.len());
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use std::io::Read;

    fn page(title: Option<&str>, content: &str) -> Result<FetchResult, FetchError> {
        Ok(FetchResult {
            title: title.map(str::to_string),
            content: Some(content.to_string()),
            ..Default::default()
        })
    }

    fn failure(message: &str) -> Result<FetchResult, FetchError> {
        Err(FetchError::Render(RenderError::Command(message.to_string())))
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("A/B: \"C\"?").as_deref(), Some("AB C"));
        assert_eq!(sanitize_title("  Docs | Home  ").as_deref(), Some("Docs  Home"));
        assert_eq!(sanitize_title("<>|"), None);
        assert_eq!(sanitize_title("   "), None);
    }

    #[test]
    fn test_single_failure_yields_only_its_error_artifact() {
        let urls = urls(&["https://a.test/1", "https://a.test/2", "https://a.test/3"]);
        let results = vec![
            page(Some("First"), "<html><body><p>one</p></body></html>"),
            failure("connection reset"),
            page(Some("Third"), "<html><body><p>three</p></body></html>"),
        ];

        let artifacts = assemble_batch(&urls, results, false);
        let names: Vec<_> = artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["First.md", "error_1.txt", "Third.md"]);

        assert_eq!(
            artifacts[1].body,
            "Failed to scrape https://a.test/2\nError: browser command failed: connection reset"
        );
        assert!(
            artifacts[0]
                .body
                .starts_with("---\nurl: https://a.test/1\ntitle: First\n---\n\n")
        );
        assert!(artifacts[0].body.ends_with("one"));
    }

    #[test]
    fn test_missing_title_falls_back_to_index() {
        let urls = urls(&["https://a.test/x", "https://a.test/y"]);
        let results = vec![
            page(None, "<p>x</p>"),
            page(Some("???"), "<p>y</p>"),
        ];

        let artifacts = assemble_batch(&urls, results, false);
        assert_eq!(artifacts[0].name, "page_0.md");
        assert!(artifacts[0].body.contains("title: page_0"));
        assert_eq!(artifacts[1].name, "page_1.md");
        assert!(artifacts[1].body.contains("title: ???"));
    }

    #[test]
    fn test_empty_content_artifact() {
        let urls = urls(&["https://a.test/blank"]);
        let artifacts = assemble_batch(&urls, vec![page(Some("Blank"), "")], false);

        assert_eq!(artifacts[0].name, "Blank_empty.txt");
        assert_eq!(artifacts[0].body, "No content found for https://a.test/blank");
    }

    #[test]
    fn test_colliding_titles_get_index_suffix() {
        let urls = urls(&["https://a.test/1", "https://a.test/2", "https://a.test/3"]);
        let results = vec![
            page(Some("Home"), "<p>a</p>"),
            page(Some("Home"), "<p>b</p>"),
            page(Some("Home"), "<p>c</p>"),
        ];

        let names: Vec<_> = assemble_batch(&urls, results, false)
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Home.md", "Home_1.md", "Home_2.md"]);
    }

    #[test]
    fn test_suffix_never_reuses_an_earlier_title() {
        let urls = urls(&["https://a.test/1", "https://a.test/2", "https://a.test/3"]);
        let results = vec![
            page(Some("Home_2"), "<p>a</p>"),
            page(Some("Home"), "<p>b</p>"),
            page(Some("Home"), "<p>c</p>"),
        ];

        let artifacts = assemble_batch(&urls, results, false);
        let names: Vec<_> = artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Home_2.md", "Home.md", "Home_2_1.md"]);

        let bytes = write_archive(&artifacts).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 3);
    }

    #[test]
    fn test_archive_contains_every_artifact() {
        let artifacts = vec![
            BatchArtifact::new("Page.md".to_string(), "# Page".to_string()),
            BatchArtifact::new("error_1.txt".to_string(), "Failed".to_string()),
        ];

        let bytes = write_archive(&artifacts).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut body = String::new();
        archive
            .by_name("Page.md")
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        assert_eq!(body, "# Page");
    }

    #[test]
    fn test_empty_archive_is_valid() {
        let bytes = write_archive(&[]).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 0);
    }
}
