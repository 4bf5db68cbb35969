//! Summary image rendering and on-disk cache
//!
//! The summary (total count, last refresh, top 5 by estimated GDP) is drawn as
//! an 800x400 PNG with a built-in 5x7 bitmap font and stored next to the
//! database so the image endpoint can serve it without re-rendering.

use crate::database::{get_status, top_countries_by_gdp, DbResult};
use crate::error::Result;
use chrono::{DateTime, Utc};
use image::{ImageFormat, Rgb, RgbImage};
use rusqlite::Connection;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// How many countries the summary lists
pub const TOP_COUNT: usize = 5;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 400;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([20, 20, 20]);
const GREY: Rgb<u8> = Rgb([110, 110, 110]);
const BAR: Rgb<u8> = Rgb([66, 133, 244]);

/// One line of the top-by-GDP list
#[derive(Debug, Clone, PartialEq)]
pub struct TopCountry {
    pub name: String,
    pub estimated_gdp: f64,
}

/// Everything the summary image shows
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub total_countries: i64,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub top: Vec<TopCountry>,
}

impl SummaryStats {
    /// Gather summary statistics from the store
    pub fn collect(conn: &Connection) -> DbResult<Self> {
        let status = get_status(conn)?;
        let top = top_countries_by_gdp(conn, TOP_COUNT)?
            .into_iter()
            .filter_map(|c| {
                c.estimated_gdp.map(|gdp| TopCountry {
                    name: c.name,
                    estimated_gdp: gdp,
                })
            })
            .collect();

        Ok(Self {
            total_countries: status.total_countries,
            last_refreshed_at: status.last_refreshed_at,
            top,
        })
    }
}

/// Render the summary as PNG bytes
pub fn render_summary(stats: &SummaryStats) -> Result<Vec<u8>> {
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, WHITE);

    draw_text(&mut img, 20, 20, "Countries Summary", 3, BLACK);
    draw_text(
        &mut img,
        20,
        60,
        &format!("Total Countries: {}", stats.total_countries),
        2,
        BLACK,
    );
    let refreshed = stats
        .last_refreshed_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "Never".to_string());
    draw_text(&mut img, 20, 90, &format!("Last Refreshed: {}", refreshed), 2, BLACK);
    draw_text(&mut img, 20, 130, "Top 5 Countries by Estimated GDP:", 2, BLACK);

    if stats.top.is_empty() {
        draw_text(&mut img, 30, 165, "No GDP data available", 2, GREY);
    } else {
        let max_gdp = stats
            .top
            .iter()
            .map(|c| c.estimated_gdp)
            .fold(0.0_f64, f64::max);

        for (i, country) in stats.top.iter().take(TOP_COUNT).enumerate() {
            let y = 165 + i as u32 * 42;
            let label = format!(
                "{}. {}: ${}",
                i + 1,
                country.name,
                format_thousands(country.estimated_gdp)
            );
            draw_text(&mut img, 30, y, &label, 2, BLACK);

            let fraction = if max_gdp > 0.0 {
                (country.estimated_gdp / max_gdp).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let bar_width = (fraction * (WIDTH - 60) as f64) as u32;
            fill_rect(&mut img, 30, y + 18, bar_width, 10, BAR);
        }
    }

    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(img).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}

/// Format a value with two decimals and comma thousands separators
pub fn format_thousands(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

fn fill_rect(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    for py in y..(y + h).min(img.height()) {
        for px in x..(x + w).min(img.width()) {
            img.put_pixel(px, py, color);
        }
    }
}

/// Reduce text to characters the glyph table can draw
///
/// Accents are stripped via canonical decomposition ("Côte" becomes "Cote");
/// a few letters with no decomposition get an ASCII spelling.
fn fold_for_glyphs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.nfd().filter(|c| !is_combining_mark(*c)) {
        match ch {
            'Ø' | 'ø' => out.push('O'),
            'Æ' | 'æ' => out.push_str("AE"),
            'Œ' | 'œ' => out.push_str("OE"),
            'ß' => out.push_str("SS"),
            'Đ' | 'đ' => out.push('D'),
            'Ł' | 'ł' => out.push('L'),
            'ı' => out.push('I'),
            other => out.push(other),
        }
    }
    out
}

fn draw_text(img: &mut RgbImage, x: u32, y: u32, text: &str, scale: u32, color: Rgb<u8>) {
    let mut cursor = x;
    for ch in fold_for_glyphs(text).chars() {
        let rows = glyph(ch);
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..5u32 {
                if bits & (0x10 >> col) != 0 {
                    fill_rect(
                        img,
                        cursor + col * scale,
                        y + row as u32 * scale,
                        scale,
                        scale,
                        color,
                    );
                }
            }
        }
        cursor += 6 * scale;
        if cursor >= img.width() {
            break;
        }
    }
}

/// Drawn for anything the table lacks (a question mark)
const UNKNOWN_GLYPH: [u8; 7] = [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04];

/// 5x7 glyph rows, most significant of the low five bits is the left column
fn glyph(ch: char) -> [u8; 7] {
    match ch.to_ascii_uppercase() {
        ' ' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '$' => [0x04, 0x0F, 0x14, 0x0E, 0x05, 0x1E, 0x04],
        '(' => [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02],
        ')' => [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08],
        '/' => [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00],
        '\'' => [0x04, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00],
        _ => UNKNOWN_GLYPH,
    }
}

/// Persistent location of the rendered summary image
pub struct SummaryCache {
    cache_dir: PathBuf,
}

impl SummaryCache {
    /// Create the cache, creating its directory if needed
    pub fn new(cache_dir: &Path) -> Self {
        if let Err(e) = std::fs::create_dir_all(cache_dir) {
            log::warn!("Failed to create summary cache directory: {}", e);
        } else {
            log::info!("Summary cache directory: {:?}", cache_dir);
        }

        Self {
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    /// Full path of the cached summary image
    pub fn image_path(&self) -> PathBuf {
        self.cache_dir.join("summary.png")
    }

    /// Read the cached image, `None` if no refresh has produced one yet
    pub fn load(&self) -> Result<Option<Vec<u8>>> {
        match std::fs::read(self.image_path()) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Render and store a fresh summary image
    pub fn regenerate(&self, stats: &SummaryStats) -> Result<PathBuf> {
        let bytes = render_summary(stats)?;
        std::fs::create_dir_all(&self.cache_dir)?;
        let path = self.image_path();
        std::fs::write(&path, bytes)?;
        log::info!("Summary image written to {}", path.display());
        Ok(path)
    }
}
