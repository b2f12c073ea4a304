use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use regex::Regex;

pub const OCR_RENDER_DPI: u32 = 300;

pub trait PageSource {
    fn page_count(&self) -> usize;
    fn page_text(&self, page_index: usize) -> Result<String>;
    fn page_tables(&self, page_index: usize) -> Result<Vec<Vec<Vec<String>>>>;
    fn render_page(&self, page_index: usize, dpi: u32) -> Result<Vec<u8>>;
}

pub trait OcrEngine {
    fn recognize(&self, image_png: &[u8]) -> Result<String>;
}

#[derive(Debug)]
pub struct PdfPages {
    pdf_path: PathBuf,
    pages: Vec<String>,
    cell_split: Regex,
}

impl PdfPages {
    pub fn open(pdf_path: &Path, max_pages: Option<usize>) -> Result<Self> {
        let pages = extract_pages_with_pdftotext(pdf_path, max_pages)?;
        let cell_split =
            Regex::new(r"[\t]|\s{2,}").context("failed to compile table cell split regex")?;

        Ok(Self {
            pdf_path: pdf_path.to_path_buf(),
            pages,
            cell_split,
        })
    }
}

impl PageSource for PdfPages {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text(&self, page_index: usize) -> Result<String> {
        self.pages.get(page_index).cloned().with_context(|| {
            format!(
                "page index {} out of range for {}",
                page_index,
                self.pdf_path.display()
            )
        })
    }

    fn page_tables(&self, page_index: usize) -> Result<Vec<Vec<Vec<String>>>> {
        let text = self.page_text(page_index)?;
        Ok(detect_table_grids(&text, &self.cell_split))
    }

    fn render_page(&self, page_index: usize, dpi: u32) -> Result<Vec<u8>> {
        render_page_with_pdftoppm(&self.pdf_path, page_index + 1, dpi)
    }
}

#[derive(Debug)]
pub struct TesseractOcr {
    lang: String,
}

impl TesseractOcr {
    pub fn new(lang: &str) -> Self {
        Self {
            lang: lang.to_string(),
        }
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, image_png: &[u8]) -> Result<String> {
        let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let png_path = std::env::temp_dir().join(format!(
            "toccheck_ocr_{}_{}.png",
            std::process::id(),
            stamp
        ));

        fs::write(&png_path, image_png)
            .with_context(|| format!("failed to stage OCR image: {}", png_path.display()))?;

        let output = Command::new("tesseract")
            .arg(&png_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.lang)
            .output()
            .with_context(|| format!("failed to execute tesseract for {}", png_path.display()));

        let _ = fs::remove_file(&png_path);
        let output = output?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "tesseract returned non-zero exit status for {}: {}",
                png_path.display(),
                stderr.trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .replace('\u{0000}', "")
            .trim()
            .to_string())
    }
}

pub fn ocr_tools_available() -> bool {
    command_available("pdftoppm") && command_available("tesseract")
}

fn command_available(program: &str) -> bool {
    Command::new(program).arg("--version").output().is_ok()
}

fn extract_pages_with_pdftotext(pdf_path: &Path, max_pages: Option<usize>) -> Result<Vec<String>> {
    let mut command = Command::new("pdftotext");
    command
        .arg("-layout")
        .arg("-enc")
        .arg("UTF-8")
        .arg("-f")
        .arg("1");
    if let Some(max_pages) = max_pages {
        command.arg("-l").arg(max_pages.to_string());
    }
    command.arg(pdf_path).arg("-");

    let output = command
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    let raw = String::from_utf8_lossy(&output.stdout);
    let mut pages: Vec<String> = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();

    while let Some(last_page) = pages.last() {
        if last_page.trim().is_empty() {
            pages.pop();
            continue;
        }
        break;
    }

    Ok(pages)
}

fn render_page_with_pdftoppm(pdf_path: &Path, page_number: usize, dpi: u32) -> Result<Vec<u8>> {
    let pdf_stem = pdf_path
        .file_stem()
        .and_then(|value| value.to_str())
        .unwrap_or("pdf");
    let safe_stem = pdf_stem
        .chars()
        .map(|character| {
            if character.is_ascii_alphanumeric() {
                character
            } else {
                '_'
            }
        })
        .collect::<String>();

    let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let output_root = std::env::temp_dir().join(format!(
        "toccheck_render_{}_{}_{}_{}",
        safe_stem,
        std::process::id(),
        page_number,
        stamp
    ));
    let png_path = PathBuf::from(format!("{}.png", output_root.display()));

    let output = Command::new("pdftoppm")
        .arg("-f")
        .arg(page_number.to_string())
        .arg("-l")
        .arg(page_number.to_string())
        .arg("-r")
        .arg(dpi.to_string())
        .arg("-singlefile")
        .arg("-png")
        .arg(pdf_path)
        .arg(&output_root)
        .output()
        .with_context(|| format!("failed to execute pdftoppm for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftoppm returned non-zero exit status for {} page {}: {}",
            pdf_path.display(),
            page_number,
            stderr.trim()
        );
    }

    if !png_path.exists() {
        bail!(
            "pdftoppm did not produce expected image for {} page {}",
            pdf_path.display(),
            page_number
        );
    }

    let bytes = fs::read(&png_path)
        .with_context(|| format!("failed to read rendered page image: {}", png_path.display()))?;
    let _ = fs::remove_file(&png_path);

    Ok(bytes)
}

fn detect_table_grids(page_text: &str, cell_split: &Regex) -> Vec<Vec<Vec<String>>> {
    let mut grids = Vec::new();
    let mut current: Vec<Vec<String>> = Vec::new();

    for line in page_text.lines() {
        let trimmed = line.trim();
        if let Some(cells) = split_grid_row(trimmed, cell_split) {
            current.push(cells);
            continue;
        }

        if current.len() >= 2 {
            grids.push(std::mem::take(&mut current));
        } else {
            current.clear();
        }
    }

    if current.len() >= 2 {
        grids.push(current);
    }

    grids
}

fn split_grid_row(line: &str, cell_split: &Regex) -> Option<Vec<String>> {
    if line.len() < 5 {
        return None;
    }

    let cells = cell_split
        .split(line)
        .filter(|cell| !cell.trim().is_empty())
        .map(|cell| cell.trim().to_string())
        .collect::<Vec<String>>();

    if cells.len() >= 2 { Some(cells) } else { None }
}

#[cfg(test)]
pub mod testing {
    use std::cell::RefCell;

    use anyhow::{Result, bail};

    use super::{OcrEngine, PageSource};

    pub struct StaticPages {
        texts: Vec<String>,
        tables: Vec<Vec<Vec<Vec<String>>>>,
    }

    impl StaticPages {
        pub fn from_texts(texts: &[&str]) -> Self {
            Self::from_strings(texts.iter().map(|text| text.to_string()).collect())
        }

        pub fn from_strings(texts: Vec<String>) -> Self {
            let tables = vec![Vec::new(); texts.len()];
            Self { texts, tables }
        }

        pub fn with_tables(mut self, page_index: usize, grids: Vec<Vec<Vec<String>>>) -> Self {
            self.tables[page_index] = grids;
            self
        }
    }

    impl PageSource for StaticPages {
        fn page_count(&self) -> usize {
            self.texts.len()
        }

        fn page_text(&self, page_index: usize) -> Result<String> {
            Ok(self.texts[page_index].clone())
        }

        fn page_tables(&self, page_index: usize) -> Result<Vec<Vec<Vec<String>>>> {
            Ok(self.tables[page_index].clone())
        }

        fn render_page(&self, page_index: usize, _dpi: u32) -> Result<Vec<u8>> {
            Ok(format!("png:{page_index}").into_bytes())
        }
    }

    pub struct CountingOcr {
        text: String,
        calls: RefCell<usize>,
    }

    impl CountingOcr {
        pub fn returning(text: &str) -> Self {
            Self {
                text: text.to_string(),
                calls: RefCell::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            *self.calls.borrow()
        }
    }

    impl OcrEngine for CountingOcr {
        fn recognize(&self, _image_png: &[u8]) -> Result<String> {
            *self.calls.borrow_mut() += 1;
            Ok(self.text.clone())
        }
    }

    pub struct FailingOcr;

    impl OcrEngine for FailingOcr {
        fn recognize(&self, _image_png: &[u8]) -> Result<String> {
            bail!("ocr backend unavailable")
        }
    }
}
