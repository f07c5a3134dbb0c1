use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::record::Value;

const IMAGE_EXTENSIONS: [&str; 6] = [".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp"];
const MAX_FRACTION_DIGITS: usize = 3;

/// What a body cell shows.
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Image(String),
    Number(String),
    Text(String),
    Empty,
}

impl CellContent {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None => CellContent::Empty,
            Some(Value::Number(n)) => CellContent::Number(format_number(*n)),
            Some(Value::Text(s)) if is_image(s) => CellContent::Image(s.clone()),
            Some(Value::Text(s)) => CellContent::Text(s.clone()),
        }
    }

    /// Text drawn in the terminal cell.
    pub fn display(&self) -> String {
        match self {
            CellContent::Image(path) => {
                let name = path.rsplit('/').next().unwrap_or(path);
                format!("🖼 {name}")
            }
            CellContent::Number(s) | CellContent::Text(s) => s.clone(),
            CellContent::Empty => String::new(),
        }
    }
}

/// Cuts `name` down to `width` display columns, marking the cut with `...`.
pub fn visible_name(name: &str, width: usize) -> String {
    if name.width() <= width {
        return name.to_string();
    }
    if width < 3 {
        return String::new();
    }
    let budget = width - 3;
    let mut used = 0;
    let mut reduced_name = String::new();
    for c in name.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        reduced_name.push(c);
    }
    reduced_name.push_str("...");
    reduced_name
}

pub fn is_image(s: &str) -> bool {
    let lower = s.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Formats like an en-US locale: `,` thousands separators, up to three fraction digits.
pub fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return if n.is_nan() {
            "NaN".to_string()
        } else if n > 0.0 {
            "∞".to_string()
        } else {
            "-∞".to_string()
        };
    }

    let fixed = format!("{:.*}", MAX_FRACTION_DIGITS, n.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let digits: Vec<char> = int_part.chars().collect();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3 + 5);
    if n < 0.0 && (int_part != "0" || !frac_part.is_empty()) {
        result.push('-');
    }
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    if !frac_part.is_empty() {
        result.push('.');
        result.push_str(frac_part);
    }
    result
}
